//! HTTP scorer transport: `POST <endpoint>/score`.

use async_trait::async_trait;
use reqwest::Client;
use shared_types::{PeerError, PeerResult};
use std::time::Duration;
use tracing::debug;

use crate::domain::{ScoreReply, ScoreRequest, ScorerEndpoint};
use crate::ports::ScorerClient;

#[derive(Debug, Clone)]
pub struct HttpScorerClient {
    client: Client,
    timeout: Duration,
}

impl HttpScorerClient {
    pub fn new(timeout: Duration) -> PeerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ScorerClient for HttpScorerClient {
    async fn score(&self, scorer: &ScorerEndpoint, request: &ScoreRequest) -> PeerResult<ScoreReply> {
        let url = format!("{}/score", scorer.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PeerError::Timeout {
                        after_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    PeerError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                status: status.as_u16(),
            });
        }
        let reply: ScoreReply = response
            .json()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))?;
        debug!(scorer = %scorer.id, responses = reply.responses.len(), "Scorer replied");
        Ok(reply)
    }
}

#[async_trait]
impl<T: ScorerClient + ?Sized> ScorerClient for std::sync::Arc<T> {
    async fn score(&self, scorer: &ScorerEndpoint, request: &ScoreRequest) -> PeerResult<ScoreReply> {
        (**self).score(scorer, request).await
    }
}
