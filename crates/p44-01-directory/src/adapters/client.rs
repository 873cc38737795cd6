//! HTTP client for a remote room directory.

use reqwest::Client;
use shared_types::{PeerError, PeerResult, RoomAnnouncement};
use std::time::Duration;
use tracing::debug;

use super::http::{AnnounceReply, RoomsReply};
use crate::domain::AnnounceOutcome;

/// Talks to `/rooms/announce` and `/rooms` on a directory node.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> PeerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(|e| PeerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post an already signed announcement.
    pub async fn announce(&self, announcement: &RoomAnnouncement) -> PeerResult<AnnounceOutcome> {
        let url = format!("{}/rooms/announce", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(announcement)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                status: status.as_u16(),
            });
        }
        let reply: AnnounceReply = response
            .json()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))?;
        debug!(node_id = %announcement.node_id, outcome = ?reply.outcome, "Announced to directory");
        Ok(reply.outcome)
    }

    /// Fetch the live room listing.
    pub async fn list_rooms(&self) -> PeerResult<Vec<RoomAnnouncement>> {
        let url = format!("{}/rooms", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                status: status.as_u16(),
            });
        }
        let reply: RoomsReply = response
            .json()
            .await
            .map_err(|e| PeerError::Decode(e.to_string()))?;
        Ok(reply.rooms)
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
