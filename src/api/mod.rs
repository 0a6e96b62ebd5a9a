//! REST API endpoints.
//!
//! Axum-based HTTP API mirroring the original URL scheme: server
//! advertisement and match submission via PUT, stats and reports via
//! GET. The routing layer stays thin; all semantics live in
//! [`crate::service::StatsService`].

pub mod routes;
pub mod state;
#[cfg(test)]
pub mod test_util;

use axum::routing::get;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::StorageError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if matches!(self, ApiError::Internal(_)) {
            tracing::error!("request failed: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/servers/info", get(routes::servers::all_servers))
        .route(
            "/servers/:endpoint/info",
            get(routes::servers::server_info).put(routes::servers::advertise_server),
        )
        .route(
            "/servers/:endpoint/matches/:timestamp",
            get(routes::servers::match_result).put(routes::servers::submit_match),
        )
        .route("/servers/:endpoint/stats", get(routes::servers::server_stat))
        .route("/players/:name/stats", get(routes::players::player_stat))
        .route(
            "/reports/recent-matches",
            get(routes::reports::recent_matches_default),
        )
        .route(
            "/reports/recent-matches/:count",
            get(routes::reports::recent_matches),
        )
        .route(
            "/reports/best-players",
            get(routes::reports::best_players_default),
        )
        .route("/reports/best-players/:count", get(routes::reports::best_players))
        .route(
            "/reports/popular-servers",
            get(routes::reports::popular_servers_default),
        )
        .route(
            "/reports/popular-servers/:count",
            get(routes::reports::popular_servers),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
