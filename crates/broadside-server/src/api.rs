use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::{
    LogEntry, MEASUREMENT_PARTITION, PLAYER_PARTITION, TournamentMeasurement,
};
use crate::tournament::TournamentMessage;

/// Response for an accepted tournament request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentAccepted {
    pub player_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub lease_end: OffsetDateTime,
}

fn require_id(player_id: &str) -> Result<&str, AppError> {
    let id = player_id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("player id must not be blank".to_string()));
    }
    Ok(id)
}

/// POST /api/v1/players/{player_id}/tournaments — lease the player and queue a tournament.
pub async fn start_tournament(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<(StatusCode, Json<TournamentAccepted>), AppError> {
    let player_id = require_id(&player_id)?;
    let player = state
        .stores
        .players
        .get_single(PLAYER_PARTITION, player_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("player {player_id} not found")))?;

    let lease = state
        .leases
        .acquire(&player.id, state.config.tournament.lease_duration())
        .await?;

    let message = TournamentMessage {
        player_id: player.id.clone(),
        player_name: player.name.clone(),
        web_api_url: player.web_api_url.clone(),
        api_key: player.api_key.clone(),
        lease_token: lease.token.clone(),
        lease_end: lease.expires_at,
    };
    if let Err(e) = state.queue.send(message).await {
        if let Err(release) = state.leases.release(&player.id, &lease.token).await {
            tracing::warn!(player_id = %player.id, error = %release, "Failed to release lease");
        }
        tracing::error!(player_id = %player.id, error = %e, "Failed to queue tournament");
        return Err(e.into());
    }

    tracing::info!(player_id = %player.id, "Tournament queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(TournamentAccepted {
            player_id: player.id,
            lease_end: lease.expires_at,
        }),
    ))
}

/// GET /api/v1/players/{player_id}/measurement
pub async fn get_measurement(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<TournamentMeasurement>, AppError> {
    let player_id = require_id(&player_id)?;
    state
        .stores
        .measurements
        .get_single(MEASUREMENT_PARTITION, player_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no measurement for player {player_id}")))
}

/// GET /api/v1/players/{player_id}/log — oldest entry first.
pub async fn get_log(
    State(state): State<AppState>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<LogEntry>>, AppError> {
    let player_id = require_id(&player_id)?;
    Ok(Json(state.stores.logs.get(player_id).await?))
}
