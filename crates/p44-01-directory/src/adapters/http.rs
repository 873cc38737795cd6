//! HTTP surface of the room directory.
//!
//! | Method | Path              | Result                               |
//! |--------|-------------------|--------------------------------------|
//! | POST   | `/rooms/announce` | 200, 400 invalid, 401 bad signature  |
//! | GET    | `/rooms`          | `{ "rooms": [...] }`                 |
//! | GET    | `/healthz`        | liveness                             |

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared_types::RoomAnnouncement;
use std::sync::Arc;

use crate::domain::AnnounceOutcome;
use crate::ports::DirectoryApi;

/// Shared handler state.
pub type DirectoryState = Arc<dyn DirectoryApi>;

/// Body of a successful announce.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnounceReply {
    pub ok: bool,
    pub outcome: AnnounceOutcome,
}

/// Body of `GET /rooms`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomsReply {
    pub rooms: Vec<RoomAnnouncement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
    pub kind: String,
}

pub fn router(api: DirectoryState) -> Router {
    Router::new()
        .route("/rooms/announce", post(announce))
        .route("/rooms", get(list_rooms))
        .route("/healthz", get(healthz))
        .with_state(api)
}

async fn announce(
    State(api): State<DirectoryState>,
    Json(announcement): Json<RoomAnnouncement>,
) -> Response {
    match api.announce(announcement).await {
        Ok(outcome) => Json(AnnounceReply { ok: true, outcome }).into_response(),
        Err(err) => {
            let status = if err.is_auth_failure() {
                StatusCode::UNAUTHORIZED
            } else {
                StatusCode::BAD_REQUEST
            };
            let body = ErrorReply {
                error: err.to_string(),
                kind: err.kind().to_string(),
            };
            (status, Json(body)).into_response()
        }
    }
}

async fn list_rooms(State(api): State<DirectoryState>) -> Json<RoomsReply> {
    Json(RoomsReply {
        rooms: api.list_rooms().await,
    })
}

async fn healthz(State(api): State<DirectoryState>) -> impl IntoResponse {
    Json(api.health_check().await)
}
