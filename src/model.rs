use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_TEAM_COLOR: &str = "#1a1a2e";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Upcoming,
    Open,
    Completed,
    Closed,
}

impl RoundStatus {
    /// Rounds accept picks until the server closes or completes them.
    pub fn is_tippable(self) -> bool {
        matches!(self, RoundStatus::Upcoming | RoundStatus::Open)
    }

    pub fn label(self) -> &'static str {
        match self {
            RoundStatus::Upcoming => "upcoming",
            RoundStatus::Open => "open",
            RoundStatus::Completed => "completed",
            RoundStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: u32,
    pub round_number: u32,
    pub name: String,
    #[serde(default)]
    pub deadline: Option<String>,
    pub status: RoundStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    #[serde(default = "default_color", deserialize_with = "null_as_default_color")]
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    #[serde(alias = "upcoming")]
    Scheduled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "FixtureWire")]
pub struct Fixture {
    pub id: u32,
    pub round_id: u32,
    pub home: TeamRef,
    pub away: TeamRef,
    pub venue: Option<String>,
    pub kickoff: Option<String>,
    pub status: FixtureStatus,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl Fixture {
    pub fn involves(&self, team_id: u32) -> bool {
        self.home.id == team_id || self.away.id == team_id
    }

    pub fn is_completed(&self) -> bool {
        self.status == FixtureStatus::Completed
    }

    /// Winning team id when a result is in; `None` for draws and open fixtures.
    pub fn winner_id(&self) -> Option<u32> {
        let (Some(home), Some(away)) = (self.home_score, self.away_score) else {
            return None;
        };
        if home > away {
            Some(self.home.id)
        } else if away > home {
            Some(self.away.id)
        } else {
            None
        }
    }
}

// The API flattens both team references into the fixture row.
#[derive(Debug, Deserialize)]
struct FixtureWire {
    id: u32,
    round_id: u32,
    home_team_id: u32,
    away_team_id: u32,
    #[serde(default)]
    home_team: String,
    #[serde(default)]
    home_short: String,
    #[serde(default)]
    home_color: Option<String>,
    #[serde(default)]
    away_team: String,
    #[serde(default)]
    away_short: String,
    #[serde(default)]
    away_color: Option<String>,
    #[serde(default)]
    home_score: Option<u32>,
    #[serde(default)]
    away_score: Option<u32>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    kickoff: Option<String>,
    status: FixtureStatus,
}

impl From<FixtureWire> for Fixture {
    fn from(w: FixtureWire) -> Self {
        let completed = w.status == FixtureStatus::Completed;
        Fixture {
            id: w.id,
            round_id: w.round_id,
            home: TeamRef {
                id: w.home_team_id,
                name: w.home_team,
                short_name: w.home_short,
                color: w.home_color.unwrap_or_else(default_color),
            },
            away: TeamRef {
                id: w.away_team_id,
                name: w.away_team,
                short_name: w.away_short,
                color: w.away_color.unwrap_or_else(default_color),
            },
            venue: w.venue.filter(|v| !v.trim().is_empty()),
            kickoff: w.kickoff.filter(|k| !k.trim().is_empty()),
            status: w.status,
            home_score: if completed { w.home_score } else { None },
            away_score: if completed { w.away_score } else { None },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    // `/api/me` returns the raw sqlite column (0/1), login returns a bool.
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub display_name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "fav_team_id", skip_serializing_if = "Option::is_none")]
    pub favorite_team_id: Option<u32>,
}

/// A tip the server already holds for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriorTip {
    pub fixture_id: u32,
    pub predicted_winner_id: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub predicted_margin: u32,
    #[serde(default)]
    pub points_earned: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TipSubmission {
    pub fixture_id: u32,
    pub predicted_winner_id: u32,
    pub predicted_margin: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardRow {
    pub id: u32,
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_points: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correct_tips: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tips: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    pub id: u32,
    pub name: String,
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub member_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedGroup {
    pub id: u32,
    pub name: String,
    pub code: String,
}

fn default_color() -> String {
    DEFAULT_TEAM_COLOR.to_string()
}

fn null_as_default_color<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_else(default_color))
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

fn bool_or_int<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
