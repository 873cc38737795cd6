//! Room directory access: the local [`RoomDirectory`] or a remote one.

use async_trait::async_trait;
use p44_01_directory::{AnnounceOutcome, DirectoryApi, DirectoryClient, RoomDirectory};
use p44_02_indexer::DirectorySource;
use p44_03_ledger_gate::IndexerDiscovery;
use shared_types::{PeerError, PeerResult, RoomAnnouncement};
use std::sync::Arc;

use super::metered;

#[derive(Clone)]
pub enum DirectoryLink {
    Local(Arc<RoomDirectory>),
    Remote(DirectoryClient),
}

impl DirectoryLink {
    pub async fn announce(&self, announcement: &RoomAnnouncement) -> PeerResult<AnnounceOutcome> {
        match self {
            Self::Local(directory) => directory
                .announce(announcement.clone())
                .await
                .map_err(|e| PeerError::Invalid(e.to_string())),
            Self::Remote(client) => metered("directory", client.announce(announcement)).await,
        }
    }

    pub async fn rooms(&self) -> PeerResult<Vec<RoomAnnouncement>> {
        match self {
            Self::Local(directory) => Ok(directory.list_rooms().await),
            Self::Remote(client) => metered("directory", client.list_rooms()).await,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

#[async_trait]
impl DirectorySource for DirectoryLink {
    async fn live_rooms(&self) -> PeerResult<Vec<RoomAnnouncement>> {
        self.rooms().await
    }
}

#[async_trait]
impl IndexerDiscovery for DirectoryLink {
    async fn live_rooms(&self) -> PeerResult<Vec<RoomAnnouncement>> {
        self.rooms().await
    }
}
