//! Derived server and player statistics.
//!
//! These are recomputed on demand from match and scoreboard rows; they are
//! never persisted and live only as long as the stat cache TTL allows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::CacheKeyed;

/// Aggregate statistics for one server endpoint.
///
/// The endpoint itself is the cache key and is not part of the wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStat {
    #[serde(skip)]
    pub endpoint: String,
    pub total_matches_played: i64,
    pub maximum_matches_per_day: i64,
    pub average_matches_per_day: f64,
    pub maximum_population: i64,
    pub average_population: f64,
    pub top5_game_modes: Vec<String>,
    pub top5_maps: Vec<String>,
}

impl ServerStat {
    /// Zero-value stat for a server with no recorded matches. A valid,
    /// non-error outcome.
    pub fn empty(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            total_matches_played: 0,
            maximum_matches_per_day: 0,
            average_matches_per_day: 0.0,
            maximum_population: 0,
            average_population: 0.0,
            top5_game_modes: Vec::new(),
            top5_maps: Vec::new(),
        }
    }
}

impl CacheKeyed for ServerStat {
    fn cache_key(&self) -> &str {
        &self.endpoint
    }
}

/// Aggregate statistics for one player, identified by case-folded name.
///
/// Computed from the player's own match history; the incremental rollup
/// only backs the best-players leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    #[serde(skip)]
    pub name: String,
    pub total_matches_played: i64,
    pub total_matches_won: i64,
    pub favorite_server: String,
    pub unique_servers: i64,
    pub favorite_game_mode: String,
    pub average_scoreboard_percent: f64,
    pub maximum_matches_per_day: i64,
    pub average_matches_per_day: f64,
    pub last_match_played: Option<DateTime<Utc>>,
    pub kill_to_death_ratio: f64,
}

impl PlayerStat {
    /// Zero-value stat for a player with no recorded matches.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            total_matches_played: 0,
            total_matches_won: 0,
            favorite_server: String::new(),
            unique_servers: 0,
            favorite_game_mode: String::new(),
            average_scoreboard_percent: 0.0,
            maximum_matches_per_day: 0,
            average_matches_per_day: 0.0,
            last_match_played: None,
            kill_to_death_ratio: 0.0,
        }
    }
}

impl CacheKeyed for PlayerStat {
    fn cache_key(&self) -> &str {
        &self.name
    }
}
