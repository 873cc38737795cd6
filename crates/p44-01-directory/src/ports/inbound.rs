//! Inbound port (driving side) of the room directory.

use async_trait::async_trait;
use shared_types::{NodeId, RoomAnnouncement};

use crate::domain::{AnnounceOutcome, DirectoryHealth};
use crate::error::DirectoryResult;

/// Directory operations exposed to the HTTP layer and in-process readers.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Validate, verify and upsert an announcement keyed by node id.
    async fn announce(&self, announcement: RoomAnnouncement) -> DirectoryResult<AnnounceOutcome>;

    /// Live rooms, largest capacity first, then most recently seen.
    async fn list_rooms(&self) -> Vec<RoomAnnouncement>;

    /// A single live room.
    async fn get_room(&self, node_id: &NodeId) -> Option<RoomAnnouncement>;

    /// Liveness probe.
    async fn health_check(&self) -> DirectoryHealth;
}
