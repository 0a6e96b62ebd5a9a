//! Report rows for the prefix-list endpoints.

use serde::{Deserialize, Serialize};

/// A leaderboard row: player display name and overall kill/death ratio
/// taken from the incremental rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestPlayer {
    pub name: String,
    pub kill_to_death_ratio: f64,
}

/// A popularity row: matches per day since the server's first match,
/// anchored at the globally latest match timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularServer {
    pub endpoint: String,
    pub name: String,
    pub average_matches_per_day: f64,
}
