//! List report endpoints.
//!
//! Each report accepts an optional trailing count segment. A missing or
//! unparsable count falls back to the configured default; a zero or
//! negative count yields an empty list without touching the service.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{BestPlayer, GameMatch, PopularServer};

/// Requested item count, after parsing the raw URL segment.
fn requested_count(raw: &str, default: usize) -> Option<usize> {
    match raw.parse::<i64>() {
        Ok(n) if n <= 0 => None,
        Ok(n) => Some(n as usize),
        Err(_) => Some(default),
    }
}

/// GET /reports/recent-matches/:count
pub async fn recent_matches(
    State(state): State<AppState>,
    Path(count): Path<String>,
) -> Result<Json<Vec<GameMatch>>, ApiError> {
    match requested_count(&count, state.default_report_items) {
        Some(count) => Ok(Json(state.service.get_recent_matches(count).await?)),
        None => Ok(Json(Vec::new())),
    }
}

/// GET /reports/recent-matches
pub async fn recent_matches_default(
    State(state): State<AppState>,
) -> Result<Json<Vec<GameMatch>>, ApiError> {
    let count = state.default_report_items;
    Ok(Json(state.service.get_recent_matches(count).await?))
}

/// GET /reports/best-players/:count
pub async fn best_players(
    State(state): State<AppState>,
    Path(count): Path<String>,
) -> Result<Json<Vec<BestPlayer>>, ApiError> {
    match requested_count(&count, state.default_report_items) {
        Some(count) => Ok(Json(state.service.get_best_players(count).await?)),
        None => Ok(Json(Vec::new())),
    }
}

/// GET /reports/best-players
pub async fn best_players_default(
    State(state): State<AppState>,
) -> Result<Json<Vec<BestPlayer>>, ApiError> {
    let count = state.default_report_items;
    Ok(Json(state.service.get_best_players(count).await?))
}

/// GET /reports/popular-servers/:count
pub async fn popular_servers(
    State(state): State<AppState>,
    Path(count): Path<String>,
) -> Result<Json<Vec<PopularServer>>, ApiError> {
    match requested_count(&count, state.default_report_items) {
        Some(count) => Ok(Json(state.service.get_popular_servers(count).await?)),
        None => Ok(Json(Vec::new())),
    }
}

/// GET /reports/popular-servers
pub async fn popular_servers_default(
    State(state): State<AppState>,
) -> Result<Json<Vec<PopularServer>>, ApiError> {
    let count = state.default_report_items;
    Ok(Json(state.service.get_popular_servers(count).await?))
}
