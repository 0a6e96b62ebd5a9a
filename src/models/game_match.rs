//! Matches, scoreboards, and the per-player rollup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of a match scoreboard. Placement rank is implied by the
/// position in [`MatchResult::scoreboard`] (index 0 = winner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreboardEntry {
    pub name: String,
    pub frags: i64,
    pub kills: i64,
    pub deaths: i64,
}

/// Result of a finished match as reported by a game server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub map: String,
    pub game_mode: String,
    pub frag_limit: i64,
    pub time_limit: i64,
    pub time_elapsed: f64,
    pub scoreboard: Vec<ScoreboardEntry>,
}

impl MatchResult {
    /// Number of players on the scoreboard.
    pub fn population(&self) -> usize {
        self.scoreboard.len()
    }
}

/// A match keyed by `(server endpoint, timestamp)`, as returned by the
/// recent-matches report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMatch {
    pub server: String,
    pub timestamp: DateTime<Utc>,
    pub results: MatchResult,
}

/// Cumulative per-player aggregate backing the leaderboard, keyed by the
/// case-folded name. Updated incrementally on every match insert, never
/// recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRollup {
    pub name: String,
    pub frags: i64,
    pub kills: i64,
    pub deaths: i64,
    pub match_count: i64,
}
