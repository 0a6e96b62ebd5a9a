//! Statistics calculation engine.
//!
//! Pure functions turning raw match/scoreboard rows into derived
//! aggregates:
//! - Per-server statistics (match rates, populations, top maps/modes)
//! - Per-player statistics (wins, scoreboard percentiles, K/D ratio)
//! - Popular-server and best-player report rankings
//!
//! No I/O happens here; the storage gateway fetches the rows and the
//! service layer feeds them in.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{BestPlayer, PlayerRollup, PlayerStat, PopularServer, ServerStat};

/// One match of a server, as fetched for server-stat computation.
#[derive(Debug, Clone)]
pub struct MatchStatRow {
    pub timestamp: DateTime<Utc>,
    pub population: i64,
    pub game_mode: String,
    pub map: String,
}

/// One match of a player: their scoreboard line joined with the match.
#[derive(Debug, Clone)]
pub struct PlayerMatchRow {
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
    pub game_mode: String,
    /// 1-based placement rank; 1 is the winner.
    pub place: i64,
    pub population: i64,
    pub kills: i64,
    pub deaths: i64,
}

/// Per-server match totals used by the popular-servers ranking.
#[derive(Debug, Clone)]
pub struct ServerMatchSummary {
    pub endpoint: String,
    pub name: String,
    pub total_matches: i64,
    pub first_match: DateTime<Utc>,
}

/// Day span between two timestamps, inclusive of both endpoint dates
/// (UTC). Always >= 1 when `first <= last`.
fn inclusive_day_span(first: DateTime<Utc>, last: DateTime<Utc>) -> i64 {
    (last.date_naive() - first.date_naive()).num_days() + 1
}

/// Scoreboard percentile for one match. A solo match scores 100;
/// otherwise the winner scores 100 and the last place scores 0.
fn scoreboard_percent(population: i64, place: i64) -> f64 {
    if population == 1 {
        100.0
    } else {
        (population - place) as f64 / (population - 1) as f64 * 100.0
    }
}

/// Largest number of entries falling on a single UTC date.
fn max_per_day<'a>(timestamps: impl Iterator<Item = &'a DateTime<Utc>>) -> i64 {
    let mut per_day: HashMap<chrono::NaiveDate, i64> = HashMap::new();
    for ts in timestamps {
        *per_day.entry(ts.date_naive()).or_default() += 1;
    }
    per_day.values().copied().max().unwrap_or(0)
}

/// Keys ranked by frequency descending, ties broken by ascending key,
/// truncated to `limit`.
fn top_by_count<'a>(keys: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<(&str, i64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);
    ranked.into_iter().map(|(key, _)| key.to_string()).collect()
}

/// Compute a server's statistics from its matches. Returns the
/// zero-value stat when the server has no matches.
///
/// The day span runs from the server's first match to its own latest
/// match, both dates inclusive.
pub fn server_stat(endpoint: &str, rows: &[MatchStatRow]) -> ServerStat {
    if rows.is_empty() {
        return ServerStat::empty(endpoint);
    }

    let first = rows.iter().map(|r| r.timestamp).min().unwrap_or_default();
    let last = rows.iter().map(|r| r.timestamp).max().unwrap_or_default();
    let day_span = inclusive_day_span(first, last);
    let total = rows.len() as i64;

    ServerStat {
        endpoint: endpoint.to_string(),
        total_matches_played: total,
        maximum_matches_per_day: max_per_day(rows.iter().map(|r| &r.timestamp)),
        average_matches_per_day: total as f64 / day_span as f64,
        maximum_population: rows.iter().map(|r| r.population).max().unwrap_or(0),
        average_population: rows.iter().map(|r| r.population).sum::<i64>() as f64 / total as f64,
        top5_game_modes: top_by_count(rows.iter().map(|r| r.game_mode.as_str()), 5),
        top5_maps: top_by_count(rows.iter().map(|r| r.map.as_str()), 5),
    }
}

/// Compute a player's statistics from their own match history. Returns
/// the zero-value stat when the player has no matches.
pub fn player_stat(name: &str, rows: &[PlayerMatchRow]) -> PlayerStat {
    if rows.is_empty() {
        return PlayerStat::empty(name);
    }

    let first = rows.iter().map(|r| r.timestamp).min().unwrap_or_default();
    let last = rows.iter().map(|r| r.timestamp).max().unwrap_or_default();
    let day_span = inclusive_day_span(first, last);
    let total = rows.len() as i64;

    let favorite_server = top_by_count(rows.iter().map(|r| r.endpoint.as_str()), 1)
        .into_iter()
        .next()
        .unwrap_or_default();
    let favorite_game_mode = top_by_count(rows.iter().map(|r| r.game_mode.as_str()), 1)
        .into_iter()
        .next()
        .unwrap_or_default();
    let unique_servers = {
        let mut endpoints: Vec<&str> = rows.iter().map(|r| r.endpoint.as_str()).collect();
        endpoints.sort_unstable();
        endpoints.dedup();
        endpoints.len() as i64
    };

    let percent_sum: f64 = rows
        .iter()
        .map(|r| scoreboard_percent(r.population, r.place))
        .sum();

    let total_kills: i64 = rows.iter().map(|r| r.kills).sum();
    let total_deaths: i64 = rows.iter().map(|r| r.deaths).sum();
    let kill_to_death_ratio = if total_deaths > 0 {
        total_kills as f64 / total_deaths as f64
    } else {
        0.0
    };

    PlayerStat {
        name: name.to_string(),
        total_matches_played: total,
        total_matches_won: rows.iter().filter(|r| r.place == 1).count() as i64,
        favorite_server,
        unique_servers,
        favorite_game_mode,
        average_scoreboard_percent: percent_sum / total as f64,
        maximum_matches_per_day: max_per_day(rows.iter().map(|r| &r.timestamp)),
        average_matches_per_day: total as f64 / day_span as f64,
        last_match_played: Some(last),
        kill_to_death_ratio,
    }
}

/// Rank servers by matches per day, descending.
///
/// Every server's day span is anchored at the single globally latest
/// match timestamp, not its own latest match, so recently quiet servers
/// see their rate decay. Servers with zero matches never appear in
/// `summaries` and are therefore excluded.
pub fn rank_popular_servers(
    summaries: Vec<ServerMatchSummary>,
    last_match: DateTime<Utc>,
) -> Vec<PopularServer> {
    let mut ranked: Vec<PopularServer> = summaries
        .into_iter()
        .map(|s| {
            let day_span = inclusive_day_span(s.first_match, last_match);
            PopularServer {
                endpoint: s.endpoint,
                name: s.name,
                average_matches_per_day: s.total_matches as f64 / day_span as f64,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.average_matches_per_day
            .partial_cmp(&a.average_matches_per_day)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.endpoint.cmp(&b.endpoint))
    });
    ranked
}

/// Rank leaderboard-eligible players by kill/death ratio, descending.
///
/// Eligibility: at least one death and at least 10 matches played.
pub fn rank_best_players(rollups: &[PlayerRollup]) -> Vec<BestPlayer> {
    let mut ranked: Vec<BestPlayer> = rollups
        .iter()
        .filter(|r| r.deaths > 0 && r.match_count >= 10)
        .map(|r| BestPlayer {
            name: r.name.clone(),
            kill_to_death_ratio: r.kills as f64 / r.deaths as f64,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.kill_to_death_ratio
            .partial_cmp(&a.kill_to_death_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}
