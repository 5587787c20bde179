use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::model::{PriorTip, TipSubmission};

pub const MAX_EXACT_MARGIN: u32 = 100;

/// How a predicted margin is entered and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarginMode {
    #[default]
    Exact,
    Bucketed,
}

impl MarginMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "exact" | "number" | "raw" => Some(MarginMode::Exact),
            "bucketed" | "bucket" | "category" => Some(MarginMode::Bucketed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginBucket {
    Draw,
    Narrow,
    Blowout,
}

impl MarginBucket {
    pub const ALL: [MarginBucket; 3] = [MarginBucket::Draw, MarginBucket::Narrow, MarginBucket::Blowout];

    pub fn label(self) -> &'static str {
        match self {
            MarginBucket::Draw => "draw",
            MarginBucket::Narrow => "1-12",
            MarginBucket::Blowout => "13+",
        }
    }

    pub fn next(self) -> Self {
        match self {
            MarginBucket::Draw => MarginBucket::Narrow,
            MarginBucket::Narrow => MarginBucket::Blowout,
            MarginBucket::Blowout => MarginBucket::Draw,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            MarginBucket::Draw => MarginBucket::Blowout,
            MarginBucket::Narrow => MarginBucket::Draw,
            MarginBucket::Blowout => MarginBucket::Narrow,
        }
    }
}

impl fmt::Display for MarginBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MarginBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "draw" => Ok(MarginBucket::Draw),
            "1-12" => Ok(MarginBucket::Narrow),
            "13+" => Ok(MarginBucket::Blowout),
            other => Err(format!("unknown margin category: {other}")),
        }
    }
}

/// Representative point estimate sent to the server for a bucket.
pub fn margin_category_to_num(bucket: MarginBucket) -> u32 {
    match bucket {
        MarginBucket::Draw => 0,
        MarginBucket::Narrow => 7,
        MarginBucket::Blowout => 20,
    }
}

pub fn margin_num_to_category(points: u32) -> MarginBucket {
    match points {
        0 => MarginBucket::Draw,
        1..=12 => MarginBucket::Narrow,
        _ => MarginBucket::Blowout,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Margin {
    Exact(u32),
    Bucket(MarginBucket),
}

impl Margin {
    pub fn default_for(mode: MarginMode) -> Self {
        match mode {
            MarginMode::Exact => Margin::Exact(0),
            MarginMode::Bucketed => Margin::Bucket(MarginBucket::Narrow),
        }
    }

    pub fn from_points(mode: MarginMode, points: u32) -> Self {
        match mode {
            MarginMode::Exact => Margin::Exact(points.min(MAX_EXACT_MARGIN)),
            MarginMode::Bucketed => Margin::Bucket(margin_num_to_category(points)),
        }
    }

    pub fn points(self) -> u32 {
        match self {
            Margin::Exact(points) => points.min(MAX_EXACT_MARGIN),
            Margin::Bucket(bucket) => margin_category_to_num(bucket),
        }
    }

    /// Re-expresses the margin in `mode`; bucketing an exact value is lossy.
    pub fn in_mode(self, mode: MarginMode) -> Self {
        match (self, mode) {
            (Margin::Exact(_), MarginMode::Exact) | (Margin::Bucket(_), MarginMode::Bucketed) => {
                self
            }
            _ => Margin::from_points(mode, self.points()),
        }
    }

    pub fn step_up(self) -> Self {
        match self {
            Margin::Exact(points) => Margin::Exact(points.saturating_add(1).min(MAX_EXACT_MARGIN)),
            Margin::Bucket(bucket) => Margin::Bucket(bucket.next()),
        }
    }

    pub fn step_down(self) -> Self {
        match self {
            Margin::Exact(points) => Margin::Exact(points.saturating_sub(1)),
            Margin::Bucket(bucket) => Margin::Bucket(bucket.prev()),
        }
    }

    pub fn label(self) -> String {
        match self {
            Margin::Exact(points) => points.min(MAX_EXACT_MARGIN).to_string(),
            Margin::Bucket(bucket) => bucket.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipDraft {
    pub winner_id: u32,
    pub margin: Margin,
}

/// Draft picks for the selected round, keyed by fixture id.
///
/// An entry exists only once a winner has been picked or a prior tip was
/// merged in. Switching rounds replaces the whole sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipSheet {
    mode: MarginMode,
    entries: BTreeMap<u32, TipDraft>,
}

impl TipSheet {
    pub fn new(mode: MarginMode) -> Self {
        Self {
            mode,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, fixture_id: u32) -> Option<&TipDraft> {
        self.entries.get(&fixture_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sets the winner, keeping any margin already chosen for the fixture.
    pub fn pick(&mut self, fixture_id: u32, team_id: u32) -> &TipDraft {
        let mode = self.mode;
        let entry = self.entries.entry(fixture_id).or_insert(TipDraft {
            winner_id: team_id,
            margin: Margin::default_for(mode),
        });
        entry.winner_id = team_id;
        entry
    }

    pub fn set_margin(&mut self, fixture_id: u32, margin: Margin) -> bool {
        let mode = self.mode;
        let Some(entry) = self.entries.get_mut(&fixture_id) else {
            return false;
        };
        entry.margin = margin.in_mode(mode);
        true
    }

    pub fn step_margin(&mut self, fixture_id: u32, up: bool) -> bool {
        let Some(entry) = self.entries.get_mut(&fixture_id) else {
            return false;
        };
        entry.margin = if up {
            entry.margin.step_up()
        } else {
            entry.margin.step_down()
        };
        true
    }

    pub fn merge_prior(&mut self, tips: &[PriorTip]) {
        for tip in tips {
            self.entries.insert(
                tip.fixture_id,
                TipDraft {
                    winner_id: tip.predicted_winner_id,
                    margin: Margin::from_points(self.mode, tip.predicted_margin),
                },
            );
        }
    }

    /// Batch payload ordered by fixture id.
    pub fn submission(&self) -> Vec<TipSubmission> {
        self.entries
            .iter()
            .map(|(fixture_id, draft)| TipSubmission {
                fixture_id: *fixture_id,
                predicted_winner_id: draft.winner_id,
                predicted_margin: draft.margin.points(),
            })
            .collect()
    }
}

pub fn submit_label(count: usize) -> String {
    match count {
        0 => "Lock In Tips".to_string(),
        1 => "Lock In 1 Tip".to_string(),
        n => format!("Lock In {n} Tips"),
    }
}
