//! Core data structures.
//!
//! Wire-contract types for the stats API. Every serialized field name is
//! camelCase and must round-trip exactly for existing consumers.

pub mod game_match;
pub mod reports;
pub mod server;
pub mod stats;

pub use game_match::{GameMatch, MatchResult, PlayerRollup, ScoreboardEntry};
pub use reports::{BestPlayer, PopularServer};
pub use server::{ServerEntry, ServerInfo};
pub use stats::{PlayerStat, ServerStat};

/// Case-folded player identity used as the lookup key for scoreboard
/// rows and rollups. Display casing is preserved separately.
pub fn search_name(name: &str) -> String {
    name.to_lowercase()
}
