//! HTTP client for peer indexers.
//!
//! One client serves every peer; the base url is passed per call because
//! peers come and go with the directory.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared_types::{
    AttestationBundle, AttestationStatus, AttestationVote, NodeId, PeerError, PeerResult,
};
use std::time::Duration;

use crate::domain::{DirectoryState, VoteListing};
use crate::ports::PeerIndexer;

#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    timeout: Duration,
}

impl IndexerClient {
    pub fn new(timeout: Duration) -> PeerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    async fn get<T: DeserializeOwned>(&self, url: String) -> PeerResult<T> {
        let response = self.client.get(&url).send().await.map_err(|e| self.map_err(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))
    }

    /// The peer's own view of `node_id`.
    pub async fn fetch_status(&self, read_api_url: &str, node_id: &NodeId) -> PeerResult<AttestationStatus> {
        let status: AttestationStatus = self
            .get(format!(
                "{}/attestation/status/{}",
                read_api_url.trim_end_matches('/'),
                node_id
            ))
            .await?;
        if &status.node_id != node_id {
            return Err(PeerError::Invalid(format!(
                "status answered for {} instead of {}",
                status.node_id, node_id
            )));
        }
        Ok(status)
    }

    pub async fn fetch_directory_state(&self, read_api_url: &str) -> PeerResult<DirectoryState> {
        self.get(format!("{}/directory/state", read_api_url.trim_end_matches('/')))
            .await
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
impl PeerIndexer for IndexerClient {
    async fn fetch_bundle(&self, read_api_url: &str) -> PeerResult<AttestationBundle> {
        self.get(format!("{}/attestation/bundle", read_api_url.trim_end_matches('/')))
            .await
    }

    async fn fetch_votes(&self, read_api_url: &str, epoch: u64) -> PeerResult<Vec<AttestationVote>> {
        let listing: VoteListing = self
            .get(format!(
                "{}/attestation/votes?epoch={}",
                read_api_url.trim_end_matches('/'),
                epoch
            ))
            .await?;
        Ok(listing.votes)
    }
}
