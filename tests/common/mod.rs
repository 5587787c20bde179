#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use cmk_tipping::api::{ApiError, ApiResult, TippingApi};
use cmk_tipping::model::{
    AuthResponse, CreatedGroup, Fixture, FixtureStatus, Group, LeaderboardRow, PriorTip,
    Registration, Round, RoundStatus, Team, TeamRef, TipSubmission, User,
};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn user(id: u32, name: &str) -> User {
    User {
        id,
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        is_admin: false,
    }
}

pub fn team(id: u32, name: &str, short: &str) -> Team {
    Team {
        id,
        name: name.to_string(),
        short_name: short.to_string(),
        color: "#004b8d".to_string(),
    }
}

pub fn round(id: u32, number: u32, status: RoundStatus) -> Round {
    Round {
        id,
        round_number: number,
        name: format!("Round {number}"),
        deadline: Some("2025-04-12T14:30:00".to_string()),
        status,
    }
}

fn team_ref(id: u32) -> TeamRef {
    TeamRef {
        id,
        name: format!("Team {id}"),
        short_name: format!("T{id}"),
        color: "#1a1a2e".to_string(),
    }
}

pub fn fixture(id: u32, round_id: u32, home: u32, away: u32) -> Fixture {
    Fixture {
        id,
        round_id,
        home: team_ref(home),
        away: team_ref(away),
        venue: Some("Lloyd Park".to_string()),
        kickoff: Some("2025-04-12T15:00:00".to_string()),
        status: FixtureStatus::Scheduled,
        home_score: None,
        away_score: None,
    }
}

pub fn completed(mut f: Fixture, home_score: u32, away_score: u32) -> Fixture {
    f.status = FixtureStatus::Completed;
    f.home_score = Some(home_score);
    f.away_score = Some(away_score);
    f
}

pub fn board_row(id: u32, name: &str, points: i64, correct: u32, total: u32) -> LeaderboardRow {
    LeaderboardRow {
        id,
        display_name: name.to_string(),
        total_points: points,
        correct_tips: correct,
        total_tips: total,
    }
}

pub fn server_error(message: &str) -> ApiError {
    ApiError::Server {
        status: 500,
        message: message.to_string(),
    }
}

/// Scripted `TippingApi`. Every call is recorded by name.
pub struct MockApi {
    pub token: Option<String>,
    pub login: ApiResult<AuthResponse>,
    pub register: ApiResult<AuthResponse>,
    pub me: ApiResult<User>,
    pub teams: ApiResult<Vec<Team>>,
    pub rounds: ApiResult<Vec<Round>>,
    pub fixtures: HashMap<u32, Vec<Fixture>>,
    pub round_tips: ApiResult<Vec<PriorTip>>,
    pub submit: ApiResult<()>,
    pub leaderboard: ApiResult<Vec<LeaderboardRow>>,
    pub groups: ApiResult<Vec<Group>>,
    pub create_group: ApiResult<CreatedGroup>,
    pub join_group: ApiResult<()>,
    pub group_leaderboard: ApiResult<Vec<LeaderboardRow>>,
    pub calls: Mutex<Vec<String>>,
    pub submitted: Mutex<Vec<Vec<TipSubmission>>>,
}

impl Default for MockApi {
    fn default() -> Self {
        let alice = user(1, "Alice");
        let mut fixtures = HashMap::new();
        fixtures.insert(2, vec![fixture(20, 2, 10, 11), fixture(21, 2, 12, 13)]);
        Self {
            token: None,
            login: Ok(AuthResponse {
                token: "tok-login".to_string(),
                user: alice.clone(),
            }),
            register: Ok(AuthResponse {
                token: "tok-register".to_string(),
                user: alice.clone(),
            }),
            me: Ok(alice),
            teams: Ok(vec![
                team(10, "Mowbray", "MOW"),
                team(11, "Kingsway", "KNG"),
            ]),
            rounds: Ok(vec![
                round(1, 1, RoundStatus::Completed),
                round(2, 2, RoundStatus::Open),
            ]),
            fixtures,
            round_tips: Ok(Vec::new()),
            submit: Ok(()),
            leaderboard: Ok(vec![board_row(1, "Alice", 12, 4, 6)]),
            groups: Ok(Vec::new()),
            create_group: Ok(CreatedGroup {
                id: 5,
                name: "Office".to_string(),
                code: "ABC123".to_string(),
            }),
            join_group: Ok(()),
            group_leaderboard: Ok(Vec::new()),
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl MockApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls().iter().any(|c| c == name)
    }

    fn record(&self, name: impl Into<String>) {
        self.calls.lock().unwrap().push(name.into());
    }
}

impl TippingApi for MockApi {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn login(&self, email: &str, _password: &str) -> ApiResult<AuthResponse> {
        self.record(format!("login:{email}"));
        self.login.clone()
    }

    fn register(&self, form: &Registration) -> ApiResult<AuthResponse> {
        self.record(format!("register:{}", form.email));
        self.register.clone()
    }

    fn me(&self) -> ApiResult<User> {
        self.record(format!("me:{}", self.token.as_deref().unwrap_or("-")));
        self.me.clone()
    }

    fn teams(&self) -> ApiResult<Vec<Team>> {
        self.record("teams");
        self.teams.clone()
    }

    fn rounds(&self) -> ApiResult<Vec<Round>> {
        self.record("rounds");
        self.rounds.clone()
    }

    fn fixtures(&self, round_id: u32) -> ApiResult<Vec<Fixture>> {
        self.record(format!("fixtures:{round_id}"));
        self.fixtures.get(&round_id).cloned().ok_or(ApiError::Server {
            status: 404,
            message: "Round not found".to_string(),
        })
    }

    fn round_tips(&self, round_id: u32) -> ApiResult<Vec<PriorTip>> {
        self.record(format!("round_tips:{round_id}"));
        self.round_tips.clone()
    }

    fn submit_tips(&self, tips: &[TipSubmission]) -> ApiResult<()> {
        self.record("submit_tips");
        self.submitted.lock().unwrap().push(tips.to_vec());
        self.submit.clone()
    }

    fn leaderboard(&self) -> ApiResult<Vec<LeaderboardRow>> {
        self.record("leaderboard");
        self.leaderboard.clone()
    }

    fn groups(&self) -> ApiResult<Vec<Group>> {
        self.record("groups");
        self.groups.clone()
    }

    fn create_group(&self, name: &str) -> ApiResult<CreatedGroup> {
        self.record(format!("create_group:{name}"));
        self.create_group.clone()
    }

    fn join_group(&self, code: &str) -> ApiResult<()> {
        self.record(format!("join_group:{code}"));
        self.join_group.clone()
    }

    fn group_leaderboard(&self, group_id: u32) -> ApiResult<Vec<LeaderboardRow>> {
        self.record(format!("group_leaderboard:{group_id}"));
        self.group_leaderboard.clone()
    }
}
