//! Driven ports: where the indexer learns about rooms and reaches peers.

use async_trait::async_trait;
use shared_types::{AttestationBundle, AttestationVote, PeerResult, RoomAnnouncement};

/// Live room listing, local or remote.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn live_rooms(&self) -> PeerResult<Vec<RoomAnnouncement>>;
}

/// Read API of a peer indexer, addressed by its `read_api_url`.
#[async_trait]
pub trait PeerIndexer: Send + Sync {
    async fn fetch_bundle(&self, read_api_url: &str) -> PeerResult<AttestationBundle>;

    async fn fetch_votes(&self, read_api_url: &str, epoch: u64) -> PeerResult<Vec<AttestationVote>>;
}
