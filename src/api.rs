//! HTTP API endpoints.
//!
//! The REST rendering of the engine boundary: create/join/setup calls plus
//! `apply_event` as `POST /api/rooms/{code}/events`. Handlers only translate;
//! the engine never sees HTTP.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::{EngineError, Event};
use crate::protocol::RoomSnapshot;
use crate::state::AppState;
use crate::types::{GameConfig, Player, PlayerId, TeamId};

/// Engine errors rendered as HTTP responses.
pub struct ApiError(EngineError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::NotYourTurn(_) => StatusCode::FORBIDDEN,
            EngineError::InvalidState(_) => StatusCode::CONFLICT,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::PreconditionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let body = Json(ErrorBody {
            code: self.0.code().to_string(),
            msg: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    msg: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub config: Option<GameConfig>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub display_name: String,
    #[serde(default)]
    pub team: Option<TeamId>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub room: RoomSnapshot,
    pub player: Player,
}

#[derive(Debug, Deserialize)]
pub struct CharactersRequest {
    pub player_id: PlayerId,
    pub characters: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct PoolRequest {
    pub characters: Vec<String>,
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomRequest>,
) -> (StatusCode, Json<RoomSnapshot>) {
    let room = state.create_room(req.config.unwrap_or_default()).await;
    (StatusCode::CREATED, Json(RoomSnapshot::from(&room)))
}

/// GET /api/rooms/{code}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = state.get_state(&code).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// POST /api/rooms/{code}/join
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, ApiError> {
    let (room, player) = state.join_room(&code, &req.display_name, req.team).await?;
    Ok(Json(JoinResponse {
        room: RoomSnapshot::from(&room),
        player,
    }))
}

/// POST /api/rooms/{code}/characters
pub async fn submit_characters(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<CharactersRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = state
        .submit_characters(&code, &req.player_id, &req.characters)
        .await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// POST /api/rooms/{code}/pool
pub async fn seed_pool(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<PoolRequest>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let room = state.seed_pool(&code, &req.characters).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// POST /api/rooms/{code}/events
///
/// Body is the tagged event, e.g. `{"event":"hit","player_id":"..."}`.
pub async fn apply_event(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(event): Json<Event>,
) -> Result<Json<RoomSnapshot>, ApiError> {
    let (room, _outcome) = state.apply_event(&code, &event).await?;
    Ok(Json(RoomSnapshot::from(&room)))
}
