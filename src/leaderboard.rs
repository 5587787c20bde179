use crate::model::{Group, LeaderboardRow};

pub const EMPTY_LEADERBOARD_MESSAGE: &str = "No tips submitted yet. Be the first!";
pub const EMPTY_GROUPS_MESSAGE: &str =
    "No groups yet. Create one and share the code with your mates!";
pub const EMPTY_GROUP_MEMBERS_MESSAGE: &str = "No members yet.";

const MEDALS: [&str; 3] = ["🥇", "🥈", "🥉"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersonalSummary {
    /// 1-based position in the server's order; `None` before the first tip.
    pub rank: Option<usize>,
    pub points: i64,
    pub correct: u32,
    pub total: u32,
}

impl PersonalSummary {
    pub fn rank_label(&self) -> String {
        self.rank.map(|r| format!("#{r}")).unwrap_or_else(|| "-".to_string())
    }
}

pub fn personal_summary(rows: &[LeaderboardRow], user_id: u32) -> PersonalSummary {
    rows.iter()
        .enumerate()
        .find(|(_, row)| row.id == user_id)
        .map(|(idx, row)| PersonalSummary {
            rank: Some(idx + 1),
            points: row.total_points,
            correct: row.correct_tips,
            total: row.total_tips,
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardLine {
    pub rank_label: String,
    pub name: String,
    pub is_me: bool,
    pub top_three: bool,
    pub points_label: String,
    pub detail_label: String,
}

/// Rows in the order the server ranked them.
pub fn leaderboard_lines(rows: &[LeaderboardRow], me: Option<u32>) -> Vec<LeaderboardLine> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| LeaderboardLine {
            rank_label: MEDALS
                .get(idx)
                .map(|m| (*m).to_string())
                .unwrap_or_else(|| (idx + 1).to_string()),
            name: row.display_name.clone(),
            is_me: me == Some(row.id),
            top_three: idx < MEDALS.len(),
            points_label: format!("{} pts", row.total_points),
            detail_label: format!("{}/{} correct", row.correct_tips, row.total_tips),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCard {
    pub id: u32,
    pub name: String,
    pub code: String,
    pub members_label: String,
}

pub fn group_cards(groups: &[Group]) -> Vec<GroupCard> {
    groups
        .iter()
        .map(|g| GroupCard {
            id: g.id,
            name: g.name.clone(),
            code: g.code.clone(),
            members_label: if g.member_count == 1 {
                "1 member".to_string()
            } else {
                format!("{} members", g.member_count)
            },
        })
        .collect()
}
