//! Server advertisement, match submission, and server-scoped reads.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{MatchResult, ServerEntry, ServerInfo, ServerStat};

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp: {raw}")))
}

/// GET /servers/info
pub async fn all_servers(State(state): State<AppState>) -> Result<Json<Vec<ServerEntry>>, ApiError> {
    let servers = state.service.get_all_servers().await?;
    Ok(Json(servers))
}

/// PUT /servers/:endpoint/info
pub async fn advertise_server(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Json(info): Json<ServerInfo>,
) -> Result<StatusCode, ApiError> {
    state.service.upsert_server(&endpoint, &info).await?;
    Ok(StatusCode::OK)
}

/// GET /servers/:endpoint/info
pub async fn server_info(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> Result<Json<ServerInfo>, ApiError> {
    match state.service.get_server_info(&endpoint).await? {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::NotFound(format!("server {endpoint} not found"))),
    }
}

/// PUT /servers/:endpoint/matches/:timestamp
pub async fn submit_match(
    State(state): State<AppState>,
    Path((endpoint, timestamp)): Path<(String, String)>,
    Json(results): Json<MatchResult>,
) -> Result<StatusCode, ApiError> {
    let timestamp = parse_timestamp(&timestamp)?;
    if state.service.insert_match(&endpoint, timestamp, &results).await? {
        Ok(StatusCode::OK)
    } else {
        Err(ApiError::BadRequest(format!(
            "server {endpoint} has not advertised itself"
        )))
    }
}

/// GET /servers/:endpoint/matches/:timestamp
pub async fn match_result(
    State(state): State<AppState>,
    Path((endpoint, timestamp)): Path<(String, String)>,
) -> Result<Json<MatchResult>, ApiError> {
    let timestamp = parse_timestamp(&timestamp)?;
    match state.service.get_match_result(&endpoint, timestamp).await? {
        Some(results) => Ok(Json(results)),
        None => Err(ApiError::NotFound(format!(
            "no match at {timestamp} on {endpoint}"
        ))),
    }
}

/// GET /servers/:endpoint/stats
pub async fn server_stat(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> Result<Json<ServerStat>, ApiError> {
    let stat = state.service.get_server_stat(&endpoint).await?;
    Ok(Json(stat))
}
