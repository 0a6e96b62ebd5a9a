//! Player-scoped reads.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::PlayerStat;

/// GET /players/:name/stats
pub async fn player_stat(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<PlayerStat>, ApiError> {
    let stat = state.service.get_player_stat(&name).await?;
    Ok(Json(stat))
}
