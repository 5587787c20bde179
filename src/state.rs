use std::collections::VecDeque;
use std::time::Instant;

use crate::leaderboard::{
    GroupCard, LeaderboardLine, PersonalSummary, group_cards, leaderboard_lines, personal_summary,
};
use crate::model::{
    CreatedGroup, Fixture, Group, LeaderboardRow, PriorTip, Registration, Round, Team,
    TipSubmission, User,
};
use crate::round_view::{RoundChip, RoundView, build_round_view, default_round, round_chips};
use crate::session::{AuthState, validate_registration};
use crate::tips::{Margin, MarginMode, TipSheet};

pub const DEFAULT_BRANDING: &str = "CMK Tipping";
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Tips,
    Leaderboard,
    Groups,
    GroupBoard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    DisplayName,
    Email,
    Password,
    FavoriteTeam,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub focus: AuthField,
    pub display_name: String,
    pub email: String,
    pub password: String,
    /// Index into `AppState::teams`.
    pub favorite: Option<usize>,
    pub error: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            mode: AuthMode::SignIn,
            focus: AuthField::Email,
            display_name: String::new(),
            email: String::new(),
            password: String::new(),
            favorite: None,
            error: None,
        }
    }
}

impl AuthForm {
    pub fn fields(&self, require_favorite_team: bool) -> Vec<AuthField> {
        match self.mode {
            AuthMode::SignIn => vec![AuthField::Email, AuthField::Password],
            AuthMode::SignUp => {
                let mut fields = vec![AuthField::DisplayName, AuthField::Email, AuthField::Password];
                if require_favorite_team {
                    fields.push(AuthField::FavoriteTeam);
                }
                fields
            }
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.focus = match self.mode {
            AuthMode::SignIn => AuthField::Email,
            AuthMode::SignUp => AuthField::DisplayName,
        };
        self.error = None;
    }

    pub fn focus_next(&mut self, require_favorite_team: bool) {
        let fields = self.fields(require_favorite_team);
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + 1) % fields.len()];
    }

    pub fn focus_prev(&mut self, require_favorite_team: bool) {
        let fields = self.fields(require_favorite_team);
        let idx = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(idx + fields.len() - 1) % fields.len()];
    }

    pub fn input_char(&mut self, c: char) {
        match self.focus {
            AuthField::DisplayName => self.display_name.push(c),
            AuthField::Email => self.email.push(c),
            AuthField::Password => self.password.push(c),
            AuthField::FavoriteTeam => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            AuthField::DisplayName => {
                self.display_name.pop();
            }
            AuthField::Email => {
                self.email.pop();
            }
            AuthField::Password => {
                self.password.pop();
            }
            AuthField::FavoriteTeam => self.favorite = None,
        }
    }

    pub fn cycle_favorite(&mut self, team_count: usize, forward: bool) {
        if team_count == 0 {
            self.favorite = None;
            return;
        }
        self.favorite = Some(match (self.favorite, forward) {
            (None, true) => 0,
            (None, false) => team_count - 1,
            (Some(i), true) => (i + 1) % team_count,
            (Some(i), false) => (i + team_count - 1) % team_count,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GroupName,
    GroupCode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBoard {
    pub group_id: u32,
    pub name: String,
    pub code: String,
    pub rows: Vec<LeaderboardRow>,
    pub loading: bool,
}

#[derive(Debug, Clone)]
pub enum Delta {
    SessionRestored(Option<User>),
    SignedIn(User),
    AuthFailed(String),
    SignedOut,
    /// The server rejected the token of a signed-in session.
    SessionExpired(String),
    SetTeams(Vec<Team>),
    RoundsAndTeams {
        rounds: Vec<Round>,
        teams: Vec<Team>,
    },
    RoundsFailed(String),
    RoundLoaded {
        ticket: u64,
        round_id: u32,
        fixtures: Vec<Fixture>,
        prior_tips: Vec<PriorTip>,
    },
    RoundLoadFailed {
        ticket: u64,
        round_id: u32,
        message: String,
    },
    TipsSubmitted {
        count: usize,
    },
    TipsSubmitFailed(String),
    SetLeaderboard(Vec<LeaderboardRow>),
    SetGroups(Vec<Group>),
    SetGroupLeaderboard {
        group_id: u32,
        rows: Vec<LeaderboardRow>,
    },
    GroupCreated(CreatedGroup),
    GroupJoined,
    GroupLeaderboardFailed {
        group_id: u32,
        message: String,
    },
    RequestFailed(String),
    SetBranding(String),
    Log(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCommand {
    RestoreSession,
    Login { email: String, password: String },
    Register(Registration),
    Logout,
    FetchTeams,
    LoadRoundsAndTeams,
    LoadRound { ticket: u64, round_id: u32 },
    SubmitTips(Vec<TipSubmission>),
    FetchLeaderboard,
    FetchGroups,
    FetchGroupLeaderboard { group_id: u32 },
    CreateGroup { name: String },
    JoinGroup { code: String },
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub auth: AuthState,
    pub auth_form: AuthForm,
    pub margin_mode: MarginMode,
    pub require_favorite_team: bool,
    pub branding: String,
    pub teams: Vec<Team>,
    pub rounds: Vec<Round>,
    pub rounds_loading: bool,
    pub selected_round: Option<u32>,
    /// Bumped on every round switch; loads carrying an older ticket are stale.
    pub round_ticket: u64,
    pub round_loading: bool,
    pub fixtures: Vec<Fixture>,
    pub tips: TipSheet,
    pub fixture_cursor: usize,
    pub submitting: bool,
    pub leaderboard: Vec<LeaderboardRow>,
    pub groups: Vec<Group>,
    pub group_cursor: usize,
    pub group_board: Option<GroupBoard>,
    pub prompt: Option<Prompt>,
    pub toast: Option<Toast>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(MarginMode::Exact, false)
    }
}

impl AppState {
    pub fn new(margin_mode: MarginMode, require_favorite_team: bool) -> Self {
        Self {
            screen: Screen::Auth,
            auth: AuthState::Anonymous,
            auth_form: AuthForm::default(),
            margin_mode,
            require_favorite_team,
            branding: DEFAULT_BRANDING.to_string(),
            teams: Vec::new(),
            rounds: Vec::new(),
            rounds_loading: false,
            selected_round: None,
            round_ticket: 0,
            round_loading: false,
            fixtures: Vec::new(),
            tips: TipSheet::new(margin_mode),
            fixture_cursor: 0,
            submitting: false,
            leaderboard: Vec::new(),
            groups: Vec::new(),
            group_cursor: 0,
            group_board: None,
            prompt: None,
            toast: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            help_overlay: false,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.auth.user()
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn show_toast(&mut self, msg: impl Into<String>) {
        let message = msg.into();
        self.push_log(format!("[INFO] {message}"));
        self.toast = Some(Toast {
            message,
            shown_at: Instant::now(),
        });
    }

    pub fn expire_toast(&mut self, now: Instant, keep_secs: u64) {
        let Some(toast) = self.toast.as_ref() else {
            return;
        };
        if now.duration_since(toast.shown_at).as_secs() >= keep_secs {
            self.toast = None;
        }
    }

    // ── Auth ────────────────────────────────────────────────────────────

    pub fn submit_auth(&mut self) -> Option<ProviderCommand> {
        if self.auth != AuthState::Anonymous {
            return None;
        }
        let form = &self.auth_form;
        let cmd = match form.mode {
            AuthMode::SignIn => ProviderCommand::Login {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            },
            AuthMode::SignUp => {
                let registration = Registration {
                    display_name: form.display_name.trim().to_string(),
                    email: form.email.trim().to_string(),
                    password: form.password.clone(),
                    favorite_team_id: form
                        .favorite
                        .and_then(|idx| self.teams.get(idx))
                        .map(|t| t.id),
                };
                if let Err(err) = validate_registration(&registration, self.require_favorite_team)
                {
                    self.auth_form.error = Some(err.to_string());
                    return None;
                }
                ProviderCommand::Register(registration)
            }
        };
        self.auth_form.error = None;
        self.auth = AuthState::Authenticating;
        Some(cmd)
    }

    /// Drops every piece of signed-in state and returns to the auth screen.
    pub fn logout(&mut self) -> ProviderCommand {
        let margin_mode = self.margin_mode;
        let require_favorite_team = self.require_favorite_team;
        let branding = std::mem::take(&mut self.branding);
        let logs = std::mem::take(&mut self.logs);
        let ticket = self.round_ticket;
        let teams = if require_favorite_team {
            std::mem::take(&mut self.teams)
        } else {
            Vec::new()
        };

        *self = AppState::new(margin_mode, require_favorite_team);
        self.branding = branding;
        self.logs = logs;
        self.teams = teams;
        self.round_ticket = ticket.wrapping_add(1);
        self.push_log("[INFO] Signed out");
        ProviderCommand::Logout
    }

    // ── Rounds & tips ───────────────────────────────────────────────────

    pub fn selected_round_ref(&self) -> Option<&Round> {
        let id = self.selected_round?;
        self.rounds.iter().find(|r| r.id == id)
    }

    pub fn can_tip(&self) -> bool {
        self.selected_round_ref()
            .is_some_and(|r| r.status.is_tippable())
    }

    /// Replaces the draft and asks for the round's fixtures and prior tips.
    pub fn select_round(&mut self, round_id: u32) -> Option<ProviderCommand> {
        if !self.rounds.iter().any(|r| r.id == round_id) {
            return None;
        }
        self.selected_round = Some(round_id);
        self.tips = TipSheet::new(self.margin_mode);
        self.fixtures.clear();
        self.fixture_cursor = 0;
        self.round_loading = true;
        self.round_ticket = self.round_ticket.wrapping_add(1);
        Some(ProviderCommand::LoadRound {
            ticket: self.round_ticket,
            round_id,
        })
    }

    pub fn select_default_round(&mut self) -> Option<ProviderCommand> {
        let id = default_round(&self.rounds)?.id;
        self.select_round(id)
    }

    pub fn cycle_round(&mut self, forward: bool) -> Option<ProviderCommand> {
        if self.rounds.is_empty() {
            return None;
        }
        let len = self.rounds.len();
        let current = self
            .selected_round
            .and_then(|id| self.rounds.iter().position(|r| r.id == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1).min(len - 1),
            (Some(i), false) => i.saturating_sub(1),
        };
        if current == Some(next) {
            return None;
        }
        let id = self.rounds[next].id;
        self.select_round(id)
    }

    pub fn round_chips(&self) -> Vec<RoundChip> {
        round_chips(&self.rounds, self.selected_round)
    }

    pub fn round_view(&self) -> Option<RoundView> {
        let round = self.selected_round_ref()?;
        Some(build_round_view(round, &self.fixtures, &self.tips))
    }

    pub fn selected_fixture(&self) -> Option<&Fixture> {
        self.fixtures.get(self.fixture_cursor)
    }

    pub fn select_fixture_next(&mut self) {
        if self.fixtures.is_empty() {
            self.fixture_cursor = 0;
            return;
        }
        self.fixture_cursor = (self.fixture_cursor + 1).min(self.fixtures.len() - 1);
    }

    pub fn select_fixture_prev(&mut self) {
        self.fixture_cursor = self.fixture_cursor.saturating_sub(1);
    }

    /// Records a winner pick. Ignored outside tippable rounds or for teams
    /// not playing in the fixture.
    pub fn pick_team(&mut self, fixture_id: u32, team_id: u32) -> bool {
        if !self.can_tip() {
            return false;
        }
        let Some(fixture) = self.fixtures.iter().find(|f| f.id == fixture_id) else {
            return false;
        };
        if !fixture.involves(team_id) {
            return false;
        }
        self.tips.pick(fixture_id, team_id);
        true
    }

    pub fn pick_side(&mut self, home: bool) -> bool {
        let Some(fixture) = self.selected_fixture() else {
            return false;
        };
        let (fixture_id, team_id) = if home {
            (fixture.id, fixture.home.id)
        } else {
            (fixture.id, fixture.away.id)
        };
        self.pick_team(fixture_id, team_id)
    }

    pub fn set_margin(&mut self, fixture_id: u32, margin: Margin) -> bool {
        if !self.can_tip() {
            return false;
        }
        self.tips.set_margin(fixture_id, margin)
    }

    pub fn step_margin(&mut self, up: bool) -> bool {
        if !self.can_tip() {
            return false;
        }
        let Some(fixture_id) = self.selected_fixture().map(|f| f.id) else {
            return false;
        };
        self.tips.step_margin(fixture_id, up)
    }

    /// `None` when there is nothing to send.
    pub fn submit_tips(&mut self) -> Option<ProviderCommand> {
        if self.tips.is_empty() || !self.can_tip() || self.submitting {
            return None;
        }
        self.submitting = true;
        Some(ProviderCommand::SubmitTips(self.tips.submission()))
    }

    // ── Leaderboards & groups ───────────────────────────────────────────

    pub fn personal_summary(&self) -> PersonalSummary {
        match self.current_user() {
            Some(user) => personal_summary(&self.leaderboard, user.id),
            None => PersonalSummary::default(),
        }
    }

    pub fn leaderboard_lines(&self) -> Vec<LeaderboardLine> {
        leaderboard_lines(&self.leaderboard, self.current_user().map(|u| u.id))
    }

    pub fn group_cards(&self) -> Vec<GroupCard> {
        group_cards(&self.groups)
    }

    /// Navigation refreshes the target view; other screens need no fetch.
    pub fn open_screen(&mut self, screen: Screen) -> Option<ProviderCommand> {
        if self.current_user().is_none() {
            return None;
        }
        self.screen = screen;
        match screen {
            Screen::Leaderboard => Some(ProviderCommand::FetchLeaderboard),
            Screen::Groups => {
                self.group_board = None;
                Some(ProviderCommand::FetchGroups)
            }
            _ => None,
        }
    }

    pub fn select_group_next(&mut self) {
        if self.groups.is_empty() {
            self.group_cursor = 0;
            return;
        }
        self.group_cursor = (self.group_cursor + 1).min(self.groups.len() - 1);
    }

    pub fn select_group_prev(&mut self) {
        self.group_cursor = self.group_cursor.saturating_sub(1);
    }

    pub fn open_selected_group(&mut self) -> Option<ProviderCommand> {
        let group = self.groups.get(self.group_cursor)?;
        self.group_board = Some(GroupBoard {
            group_id: group.id,
            name: group.name.clone(),
            code: group.code.clone(),
            rows: Vec::new(),
            loading: true,
        });
        let group_id = group.id;
        self.screen = Screen::GroupBoard;
        Some(ProviderCommand::FetchGroupLeaderboard { group_id })
    }

    pub fn close_group_board(&mut self) -> Option<ProviderCommand> {
        self.open_screen(Screen::Groups)
    }

    pub fn begin_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            input: String::new(),
        });
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    /// Blank input closes the prompt without a request.
    pub fn submit_prompt(&mut self) -> Option<ProviderCommand> {
        let prompt = self.prompt.take()?;
        let value = prompt.input.trim().to_string();
        if value.is_empty() {
            return None;
        }
        Some(match prompt.kind {
            PromptKind::GroupName => ProviderCommand::CreateGroup { name: value },
            PromptKind::GroupCode => ProviderCommand::JoinGroup { code: value },
        })
    }

    fn is_signed_in(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }
}

/// Applies a provider result and returns any follow-up commands.
pub fn apply_delta(state: &mut AppState, delta: Delta) -> Vec<ProviderCommand> {
    match delta {
        Delta::SessionRestored(Some(user)) | Delta::SignedIn(user) => {
            state.push_log(format!("[INFO] Signed in as {}", user.display_name));
            state.auth = AuthState::Authenticated(user);
            state.auth_form = AuthForm::default();
            state.screen = Screen::Tips;
            state.rounds_loading = true;
            vec![
                ProviderCommand::LoadRoundsAndTeams,
                ProviderCommand::FetchLeaderboard,
                ProviderCommand::FetchGroups,
            ]
        }
        Delta::SessionRestored(None) => {
            state.auth = AuthState::Anonymous;
            state.screen = Screen::Auth;
            if state.require_favorite_team && state.teams.is_empty() {
                vec![ProviderCommand::FetchTeams]
            } else {
                Vec::new()
            }
        }
        Delta::AuthFailed(message) => {
            state.auth = AuthState::Anonymous;
            state.push_log(format!("[WARN] Sign-in failed: {message}"));
            state.auth_form.error = Some(message);
            Vec::new()
        }
        Delta::SignedOut => Vec::new(),
        Delta::SetTeams(teams) => {
            state.teams = teams;
            if state
                .auth_form
                .favorite
                .is_some_and(|idx| idx >= state.teams.len())
            {
                state.auth_form.favorite = None;
            }
            Vec::new()
        }
        Delta::Log(msg) => {
            state.push_log(msg);
            Vec::new()
        }
        Delta::SetBranding(name) => {
            if !name.trim().is_empty() {
                state.branding = name;
            }
            Vec::new()
        }
        // Everything below belongs to a signed-in session; late arrivals
        // after logout are dropped.
        _ if !state.is_signed_in() => Vec::new(),
        Delta::SessionExpired(message) => {
            // The provider has already dropped the token.
            state.logout();
            state.push_log(format!("[WARN] Session expired: {message}"));
            state.auth_form.error = Some(message);
            Vec::new()
        }
        Delta::RoundsAndTeams { rounds, teams } => {
            state.teams = teams;
            state.rounds = rounds;
            state.rounds_loading = false;
            let still_listed = state
                .selected_round
                .is_some_and(|id| state.rounds.iter().any(|r| r.id == id));
            if still_listed {
                return Vec::new();
            }
            state.selected_round = None;
            state.select_default_round().into_iter().collect()
        }
        Delta::RoundsFailed(message) => {
            state.rounds_loading = false;
            state.show_toast(format!("Error: {message}"));
            Vec::new()
        }
        Delta::RoundLoaded {
            ticket,
            round_id,
            fixtures,
            prior_tips,
        } => {
            if ticket != state.round_ticket || state.selected_round != Some(round_id) {
                state.push_log(format!("[INFO] Dropped stale load for round {round_id}"));
                return Vec::new();
            }
            state.fixtures = fixtures;
            state.tips.merge_prior(&prior_tips);
            state.round_loading = false;
            state.fixture_cursor = 0;
            Vec::new()
        }
        Delta::RoundLoadFailed {
            ticket,
            round_id,
            message,
        } => {
            if ticket != state.round_ticket || state.selected_round != Some(round_id) {
                return Vec::new();
            }
            state.round_loading = false;
            state.show_toast(format!("Error: {message}"));
            Vec::new()
        }
        Delta::TipsSubmitted { count } => {
            state.submitting = false;
            state.push_log(format!("[INFO] Submitted {count} tips"));
            state.show_toast("Tips locked in!");
            Vec::new()
        }
        Delta::TipsSubmitFailed(message) => {
            state.submitting = false;
            state.show_toast(format!("Error: {message}"));
            Vec::new()
        }
        Delta::SetLeaderboard(rows) => {
            state.leaderboard = rows;
            Vec::new()
        }
        Delta::SetGroups(groups) => {
            state.groups = groups;
            if state.group_cursor >= state.groups.len() {
                state.group_cursor = state.groups.len().saturating_sub(1);
            }
            Vec::new()
        }
        Delta::SetGroupLeaderboard { group_id, rows } => {
            if let Some(board) = state.group_board.as_mut() {
                if board.group_id == group_id {
                    board.rows = rows;
                    board.loading = false;
                }
            }
            Vec::new()
        }
        Delta::GroupCreated(group) => {
            state.show_toast(format!("Group created! Code: {}", group.code));
            vec![ProviderCommand::FetchGroups]
        }
        Delta::GroupJoined => {
            state.show_toast("Joined group!");
            vec![ProviderCommand::FetchGroups]
        }
        Delta::GroupLeaderboardFailed { group_id, message } => {
            if let Some(board) = state.group_board.as_mut() {
                if board.group_id == group_id {
                    board.loading = false;
                }
            }
            state.show_toast(format!("Error: {message}"));
            Vec::new()
        }
        Delta::RequestFailed(message) => {
            state.show_toast(format!("Error: {message}"));
            Vec::new()
        }
    }
}
