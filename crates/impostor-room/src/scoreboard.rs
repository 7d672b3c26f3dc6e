//! Per-room cumulative scores.

use std::cmp::Reverse;
use std::collections::HashMap;

use impostor_protocol::LeaderboardEntry;
use impostor_session::DurableIdentity;

/// One participant's wins across all rounds of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreRow {
    /// Latest display name the participant joined with.
    pub display_name: String,
    pub accuser_wins: u32,
    pub impostor_wins: u32,
}

impl ScoreRow {
    pub fn total(&self) -> u32 {
        self.accuser_wins + self.impostor_wins
    }
}

/// Scores keyed by durable identity.
///
/// Rows outlive the players they belong to: leaving and rejoining
/// under the same identity picks the old row back up.
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    rows: HashMap<DurableIdentity, ScoreRow>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the row if missing and refreshes its display name.
    pub fn register(&mut self, identity: &DurableIdentity, display_name: &str) {
        self.rows.entry(identity.clone()).or_default().display_name =
            display_name.to_string();
    }

    pub fn award_accuser(&mut self, identity: &DurableIdentity) {
        self.rows.entry(identity.clone()).or_default().accuser_wins += 1;
    }

    pub fn award_impostor(&mut self, identity: &DurableIdentity) {
        self.rows.entry(identity.clone()).or_default().impostor_wins += 1;
    }

    pub fn get(&self, identity: &DurableIdentity) -> Option<&ScoreRow> {
        self.rows.get(identity)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every row, best first.
    ///
    /// Ordered by total wins, then accuser wins (both descending), then
    /// display name. The identity key breaks any remaining tie so the
    /// order is stable between broadcasts.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut rows: Vec<(&DurableIdentity, &ScoreRow)> = self.rows.iter().collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            (Reverse(a.total()), Reverse(a.accuser_wins), &a.display_name, *a_id).cmp(&(
                Reverse(b.total()),
                Reverse(b.accuser_wins),
                &b.display_name,
                *b_id,
            ))
        });
        rows.into_iter()
            .map(|(_, row)| LeaderboardEntry {
                name: row.display_name.clone(),
                accuser_wins: row.accuser_wins,
                impostor_wins: row.impostor_wins,
                total_wins: row.total(),
            })
            .collect()
    }
}
