//! HTTP read API of the attestation indexer.
//!
//! | Method | Path                             | Result                           |
//! |--------|----------------------------------|----------------------------------|
//! | GET    | `/attestation/bundle`            | signed bundle, 404 when disabled |
//! | GET    | `/attestation/votes?epoch=`      | this node's votes                |
//! | GET    | `/attestation/status/:node_id`   | this node's view of one subject  |
//! | GET    | `/directory/state`               | quorum-backed room listing       |
//! | GET    | `/healthz`                       | liveness and current epoch       |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::sync::Arc;
use tracing::error;

use crate::error::IndexerError;
use crate::ports::IndexerApi;

pub type IndexerState = Arc<dyn IndexerApi>;

#[derive(Debug, Default, Deserialize)]
pub struct VotesQuery {
    pub epoch: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthReply {
    pub status: String,
    pub epoch: u64,
}

pub fn router(api: IndexerState) -> Router {
    Router::new()
        .route("/attestation/bundle", get(bundle))
        .route("/attestation/votes", get(votes))
        .route("/attestation/status/:node_id", get(status))
        .route("/directory/state", get(directory_state))
        .route("/healthz", get(healthz))
        .with_state(api)
}

async fn bundle(State(api): State<IndexerState>) -> Response {
    match api.current_bundle().await {
        Ok(bundle) => Json(bundle).into_response(),
        Err(IndexerError::BundleDisabled) => {
            (StatusCode::NOT_FOUND, "bundle publishing disabled").into_response()
        }
        Err(err) => {
            error!(error = %err, "Failed to produce attestation bundle");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn votes(State(api): State<IndexerState>, Query(query): Query<VotesQuery>) -> Response {
    Json(api.votes(query.epoch).await).into_response()
}

async fn status(State(api): State<IndexerState>, Path(node_id): Path<String>) -> Response {
    Json(api.attestation_status(&NodeId::new(node_id)).await).into_response()
}

async fn directory_state(State(api): State<IndexerState>) -> Response {
    Json(api.directory_state().await).into_response()
}

async fn healthz(State(api): State<IndexerState>) -> impl IntoResponse {
    Json(HealthReply {
        status: "ok".to_string(),
        epoch: api.current_epoch(),
    })
}
