use chrono::{DateTime, NaiveDateTime};

use crate::model::{Fixture, Round, RoundStatus, TeamRef};
use crate::tips::{Margin, TipSheet, submit_label};

pub const NO_ROUNDS_MESSAGE: &str = "No rounds yet - check back soon!";
pub const NO_FIXTURES_MESSAGE: &str = "No fixtures for this round yet.";

/// First open round, else the last round in list order.
pub fn default_round(rounds: &[Round]) -> Option<&Round> {
    rounds
        .iter()
        .find(|r| r.status == RoundStatus::Open)
        .or_else(|| rounds.last())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundChip {
    pub id: u32,
    pub label: String,
    pub active: bool,
}

pub fn round_chips(rounds: &[Round], selected: Option<u32>) -> Vec<RoundChip> {
    rounds
        .iter()
        .map(|r| RoundChip {
            id: r.id,
            label: format!("R{}", r.round_number),
            active: selected == Some(r.id),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideView {
    pub team_id: u32,
    pub name: String,
    pub short_name: String,
    pub color: String,
    pub score: Option<u32>,
    pub picked: bool,
    pub won: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureView {
    pub id: u32,
    pub home: SideView,
    pub away: SideView,
    pub separator: &'static str,
    /// A draft entry exists for this fixture.
    pub selected: bool,
    pub pickable: bool,
    /// Margin control, present only while picking is allowed and a winner is chosen.
    pub margin: Option<Margin>,
    pub venue: String,
    pub kickoff_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitControl {
    pub visible: bool,
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundView {
    pub round_id: u32,
    pub title: String,
    pub status_label: &'static str,
    pub deadline_label: String,
    pub can_tip: bool,
    pub fixtures: Vec<FixtureView>,
    pub submit: SubmitControl,
    pub empty_message: Option<&'static str>,
}

pub fn build_round_view(round: &Round, fixtures: &[Fixture], sheet: &TipSheet) -> RoundView {
    let can_tip = round.status.is_tippable();
    let deadline_label = round
        .deadline
        .as_deref()
        .map(format_deadline)
        .unwrap_or_default();

    if fixtures.is_empty() {
        return RoundView {
            round_id: round.id,
            title: round.name.clone(),
            status_label: round.status.label(),
            deadline_label,
            can_tip,
            fixtures: Vec::new(),
            submit: SubmitControl {
                visible: false,
                enabled: false,
                label: submit_label(0),
            },
            empty_message: Some(NO_FIXTURES_MESSAGE),
        };
    }

    let rows = fixtures
        .iter()
        .map(|f| fixture_view(f, sheet, can_tip))
        .collect();

    RoundView {
        round_id: round.id,
        title: round.name.clone(),
        status_label: round.status.label(),
        deadline_label,
        can_tip,
        fixtures: rows,
        submit: SubmitControl {
            visible: can_tip,
            enabled: can_tip && !sheet.is_empty(),
            label: submit_label(sheet.len()),
        },
        empty_message: None,
    }
}

fn fixture_view(f: &Fixture, sheet: &TipSheet, can_tip: bool) -> FixtureView {
    let tip = sheet.get(f.id);
    let picked = tip.map(|t| t.winner_id);
    let winner = f.winner_id();
    let completed = f.is_completed();

    FixtureView {
        id: f.id,
        home: side_view(&f.home, f.home_score, picked, winner),
        away: side_view(&f.away, f.away_score, picked, winner),
        separator: if completed { "-" } else { "vs" },
        selected: tip.is_some(),
        pickable: can_tip,
        margin: if can_tip { tip.map(|t| t.margin) } else { None },
        venue: f.venue.clone().unwrap_or_default(),
        kickoff_label: f.kickoff.as_deref().map(format_kickoff).unwrap_or_default(),
    }
}

fn side_view(team: &TeamRef, score: Option<u32>, picked: Option<u32>, winner: Option<u32>) -> SideView {
    SideView {
        team_id: team.id,
        name: team.name.clone(),
        short_name: team.short_name.clone(),
        color: team.color.clone(),
        score,
        picked: picked == Some(team.id),
        won: winner == Some(team.id),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    const FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// "Sat 12 Apr 2:30 pm"; unparseable input is shown as-is.
pub fn format_deadline(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%a %-d %b %-I:%M %P").to_string(),
        None => raw.to_string(),
    }
}

pub fn format_kickoff(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format("%-I:%M %P").to_string(),
        None => raw.to_string(),
    }
}

/// `#rrggbb` or `#rgb` to an RGB triple.
pub fn hex_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some((expand(0)?, expand(1)?, expand(2)?))
        }
        _ => None,
    }
}
