//! HTTP listeners.
//!
//! | Listener  | Routes                                        | Present when        |
//! |-----------|-----------------------------------------------|---------------------|
//! | directory | `/rooms/announce`, `/rooms`, `/healthz`       | `directory.host`    |
//! | indexer   | `/attestation/*`, `/directory/state`, `/healthz` | `indexer.enabled` |
//! | service   | `/ledger/*`, `/internal/eval/*`               | gate or local buffer |
//! | status    | `/healthz`, `/metrics`, `/weights/latest`     | always              |
//!
//! A port of zero binds any free port; the bound address is reported back.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use shared_types::RewardVector;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::adapters::RecordingSink;
use crate::container::NodeContainer;

/// A listener that is accepting connections.
pub struct BoundServer {
    pub name: &'static str,
    pub addr: SocketAddr,
    pub task: JoinHandle<()>,
}

/// Bind `host:port` and serve `router` until shutdown.
pub async fn serve(
    name: &'static str,
    router: Router,
    host: &str,
    port: u16,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<BoundServer> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!(server = name, %addr, "Listening");

    let app = router.layer(TraceLayer::new_for_http());
    let task = tokio::spawn(async move {
        let stop = async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        };
        if let Err(err) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
            error!(server = name, error = %err, "Server failed");
        }
        info!(server = name, "Server stopped");
    });
    Ok(BoundServer { name, addr, task })
}

/// Component routers grouped by listener. `None` when nothing is served.
pub struct Routers {
    pub directory: Option<Router>,
    pub indexer: Option<Router>,
    pub service: Option<Router>,
    pub status: Router,
}

impl Routers {
    pub fn for_container(container: &NodeContainer) -> Self {
        let directory = container.directory.as_ref().map(|directory| {
            let api: p44_01_directory::adapters::http::DirectoryState = directory.clone();
            p44_01_directory::adapters::router(api)
        });

        let indexer = container.indexer.as_ref().map(|indexer| {
            let api: p44_02_indexer::adapters::http::IndexerState = indexer.clone();
            p44_02_indexer::adapters::router(api)
        });

        let ledger = container.gate.as_ref().map(|gate| {
            let api: p44_03_ledger_gate::adapters::http::GateState = gate.clone();
            p44_03_ledger_gate::adapters::router(api)
        });
        let eval = container.eval_buffer.as_ref().map(|buffer| {
            p44_04_eval_buffer::adapters::router(
                buffer.clone(),
                container.config.security.eval_secret(),
            )
        });
        let service = match (ledger, eval) {
            (Some(ledger), Some(eval)) => Some(ledger.merge(eval)),
            (ledger, eval) => ledger.or(eval),
        };

        let status = status_router(StatusState {
            node_id: container.config.identity.node_id.clone(),
            version: container.config.identity.version_hash.clone(),
            started: Instant::now(),
            weights: Arc::clone(&container.weights),
        });

        Self {
            directory,
            indexer,
            service,
            status,
        }
    }
}

#[derive(Clone)]
struct StatusState {
    node_id: String,
    version: String,
    started: Instant,
    weights: Arc<RecordingSink>,
}

#[derive(Debug, Serialize)]
struct HealthReply {
    status: &'static str,
    node_id: String,
    version: String,
    uptime_secs: u64,
}

#[derive(Debug, Serialize)]
struct WeightsReply {
    submitted: u64,
    latest: Option<RewardVector>,
}

fn status_router(state: StatusState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/weights/latest", get(latest_weights))
        .with_state(state)
}

async fn healthz(State(state): State<StatusState>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok",
        node_id: state.node_id,
        version: state.version,
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

async fn metrics() -> Response {
    match p44_telemetry::encode_metrics() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn latest_weights(State(state): State<StatusState>) -> Json<WeightsReply> {
    Json(WeightsReply {
        submitted: state.weights.submitted(),
        latest: state.weights.latest(),
    })
}
