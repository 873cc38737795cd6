//! Driven ports: indexer discovery and status queries.

use async_trait::async_trait;
use shared_types::{AttestationStatus, NodeId, PeerResult, RoomAnnouncement};

/// Live room listing used to find indexer endpoints.
#[async_trait]
pub trait IndexerDiscovery: Send + Sync {
    async fn live_rooms(&self) -> PeerResult<Vec<RoomAnnouncement>>;
}

/// `GET /attestation/status/:node_id` on one indexer.
#[async_trait]
pub trait AttestationQuery: Send + Sync {
    async fn status(&self, read_api_url: &str, subject: &NodeId) -> PeerResult<AttestationStatus>;
}
