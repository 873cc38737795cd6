//! Client for a remote gameplay backend that exposes the internal eval API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared_types::{EvalSample, PeerError, PeerResult};
use std::time::Duration;
use tracing::debug;

use super::http::{ErrorReply, IngestReply, IngestRequest, MarkReply, MarkRequest, EVAL_SECRET_HEADER};
use crate::domain::Reservation;
use crate::error::{DataIntegrityError, EvalBufferError, EvalBufferResult};
use crate::ports::SampleSource;

#[derive(Debug, Clone)]
pub struct PlatformEvalClient {
    client: Client,
    base_url: String,
    secret: String,
    timeout: Duration,
}

impl PlatformEvalClient {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>, timeout: Duration) -> PeerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> EvalBufferResult<T> {
        let response = request
            .header(EVAL_SECRET_HEADER, &self.secret)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| PeerError::Decode(e.to_string()).into());
        }

        let message = response
            .json::<ErrorReply>()
            .await
            .map(|r| r.error)
            .unwrap_or_else(|_| status.to_string());
        Err(match status {
            StatusCode::CONFLICT => DataIntegrityError::Remote(message).into(),
            StatusCode::BAD_REQUEST => EvalBufferError::Validation(message),
            _ => PeerError::Status {
                status: status.as_u16(),
            }
            .into(),
        })
    }

    pub async fn ingest(&self, samples: Vec<EvalSample>) -> EvalBufferResult<usize> {
        let request = self
            .client
            .post(self.url("/internal/eval/ingest"))
            .json(&IngestRequest { samples });
        let reply: IngestReply = self.send(request).await?;
        Ok(reply.accepted)
    }

    fn map_err(&self, err: reqwest::Error) -> PeerError {
        if err.is_timeout() {
            PeerError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            PeerError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl SampleSource for PlatformEvalClient {
    async fn reserve_batch(&self, limit: usize, require_mixed: bool) -> EvalBufferResult<Reservation> {
        let request = self
            .client
            .get(self.url("/internal/eval/next"))
            .query(&[("limit", limit.to_string()), ("require_mixed", require_mixed.to_string())]);
        let reservation: Reservation = self.send(request).await?;
        debug!(count = reservation.len(), mixed = reservation.mixed, "Reserved samples from platform");
        Ok(reservation)
    }

    async fn mark_evaluated(&self, sample_ids: Vec<String>) -> EvalBufferResult<usize> {
        let request = self
            .client
            .post(self.url("/internal/eval/mark-evaluated"))
            .json(&MarkRequest { sample_ids });
        let reply: MarkReply = self.send(request).await?;
        Ok(reply.marked)
    }
}
