//! Internal evaluation API, guarded by the `x-eval-secret` header.
//!
//! | Method | Path                            | Body / query                  |
//! |--------|---------------------------------|-------------------------------|
//! | GET    | `/internal/eval/next`           | `?limit=&require_mixed=`      |
//! | POST   | `/internal/eval/mark-evaluated` | `{ "sample_ids": [...] }`     |
//! | POST   | `/internal/eval/ingest`         | `{ "samples": [...] }`        |
//! | GET    | `/internal/eval/stats`          |                               |
//! | GET    | `/internal/eval/health`         | no secret required            |
//!
//! Status codes: 401 bad secret, 400 invalid sample, 409 integrity failure,
//! 503 buffer closed.

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared_types::{secrets_match, EvalSample, SharedSecret};
use std::sync::Arc;
use tracing::warn;

use crate::actor::EvalBufferHandle;
use crate::domain::Reservation;
use crate::error::EvalBufferError;
use crate::ports::SampleSource;

pub const EVAL_SECRET_HEADER: &str = "x-eval-secret";

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NextQuery {
    pub limit: Option<usize>,
    pub require_mixed: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkRequest {
    pub sample_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReply {
    pub marked: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestRequest {
    pub samples: Vec<EvalSample>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestReply {
    pub accepted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

#[derive(Clone)]
struct EvalState {
    buffer: EvalBufferHandle,
}

pub fn router(buffer: EvalBufferHandle, secret: SharedSecret) -> Router {
    let secret = Arc::new(secret);
    let guarded = Router::new()
        .route("/internal/eval/next", get(next))
        .route("/internal/eval/mark-evaluated", post(mark_evaluated))
        .route("/internal/eval/ingest", post(ingest))
        .route("/internal/eval/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(secret, require_secret));

    Router::new()
        .merge(guarded)
        .route("/internal/eval/health", get(health))
        .with_state(EvalState { buffer })
}

async fn require_secret(
    State(secret): State<Arc<SharedSecret>>,
    headers: HeaderMap,
    req: Request,
    next: Next,
) -> Response {
    let provided = headers
        .get(EVAL_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if secret.is_empty() || !secrets_match(provided, &secret) {
        warn!(path = %req.uri().path(), "Rejected internal eval request: bad secret");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorReply {
                error: "invalid eval secret".into(),
            }),
        )
            .into_response();
    }
    next.run(req).await
}

fn error_response(err: EvalBufferError) -> Response {
    let status = match &err {
        EvalBufferError::Validation(_) => StatusCode::BAD_REQUEST,
        EvalBufferError::DataIntegrity(_) => StatusCode::CONFLICT,
        EvalBufferError::Closed | EvalBufferError::Source(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorReply {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn next(State(state): State<EvalState>, Query(query): Query<NextQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let require_mixed = query.require_mixed.unwrap_or(true);
    match state.buffer.reserve_batch(limit, require_mixed).await {
        Ok(reservation) => Json::<Reservation>(reservation).into_response(),
        Err(err) => error_response(err),
    }
}

async fn mark_evaluated(State(state): State<EvalState>, Json(req): Json<MarkRequest>) -> Response {
    match state.buffer.mark_evaluated(req.sample_ids).await {
        Ok(marked) => Json(MarkReply { marked }).into_response(),
        Err(err) => error_response(err),
    }
}

async fn ingest(State(state): State<EvalState>, Json(req): Json<IngestRequest>) -> Response {
    match state.buffer.ingest(req.samples).await {
        Ok(accepted) => Json(IngestReply { accepted }).into_response(),
        Err(err) => error_response(err),
    }
}

async fn stats(State(state): State<EvalState>) -> Response {
    match state.buffer.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(err) => error_response(err),
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalBufferConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use shared_bus::InMemoryEventBus;
    use shared_types::{ControllableTimeSource, PopulationTag, Timestamp};
    use std::collections::{BTreeMap, BTreeSet};
    use tokio::sync::watch;
    use tower::ServiceExt;

    const SECRET: &str = "eval-http-secret-0001";

    fn sample(id: &str, tag: PopulationTag) -> EvalSample {
        EvalSample {
            sample_id: id.into(),
            population_tags: BTreeSet::from([tag]),
            sanitized_event_sequence: vec![serde_json::json!({"action": "raise"})],
            timing_features: BTreeMap::from([("think_ms".to_string(), 850.0)]),
            context_metadata: BTreeMap::new(),
            created_at: Timestamp::new(5),
        }
    }

    fn app() -> (Router, watch::Sender<bool>) {
        let (stop, shutdown) = watch::channel(false);
        let (handle, _task) = EvalBufferHandle::spawn(
            EvalBufferConfig::default(),
            Arc::new(ControllableTimeSource::new(10)),
            Arc::new(InMemoryEventBus::new()),
            shutdown,
        );
        (router(handle, SharedSecret::from(SECRET)), stop)
    }

    fn post(uri: &str, secret: Option<&str>, body: &impl Serialize) -> HttpRequest<Body> {
        let mut builder = HttpRequest::post(uri).header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(EVAL_SECRET_HEADER, secret);
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str, secret: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::get(uri);
        if let Some(secret) = secret {
            builder = builder.header(EVAL_SECRET_HEADER, secret);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body<T: serde::de::DeserializeOwned>(res: Response) -> T {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_next_mark_flow() {
        let (app, _stop) = app();
        let ingest = IngestRequest {
            samples: vec![
                sample("h1", PopulationTag::Human),
                sample("h2", PopulationTag::Human),
                sample("b1", PopulationTag::Bot),
            ],
        };
        let res = app
            .clone()
            .oneshot(post("/internal/eval/ingest", Some(SECRET), &ingest))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body::<IngestReply>(res).await.accepted, 3);

        let res = app
            .clone()
            .oneshot(get("/internal/eval/next?limit=2&require_mixed=true", Some(SECRET)))
            .await
            .unwrap();
        let reservation: Reservation = body(res).await;
        assert!(reservation.mixed);
        let ids: Vec<String> = reservation.samples.iter().map(|s| s.sample_id.clone()).collect();
        assert_eq!(ids, vec!["h1", "b1"]);

        let res = app
            .clone()
            .oneshot(post(
                "/internal/eval/mark-evaluated",
                Some(SECRET),
                &MarkRequest { sample_ids: ids },
            ))
            .await
            .unwrap();
        assert_eq!(body::<MarkReply>(res).await.marked, 2);
    }

    #[tokio::test]
    async fn test_wrong_or_missing_secret_is_401() {
        let (app, _stop) = app();
        let res = app
            .clone()
            .oneshot(get("/internal/eval/next", Some("not-the-secret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app
            .clone()
            .oneshot(get("/internal/eval/stats", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = app.oneshot(get("/internal/eval/health", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_duplicate_ingest_is_409() {
        let (app, _stop) = app();
        let ingest = IngestRequest {
            samples: vec![sample("h1", PopulationTag::Human)],
        };
        app.clone()
            .oneshot(post("/internal/eval/ingest", Some(SECRET), &ingest))
            .await
            .unwrap();
        let res = app
            .oneshot(post("/internal/eval/ingest", Some(SECRET), &ingest))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
