//! Calls to peer indexers, shared by the local indexer and the ledger gate.

use async_trait::async_trait;
use p44_02_indexer::{IndexerClient, PeerIndexer};
use p44_03_ledger_gate::AttestationQuery;
use shared_types::{AttestationBundle, AttestationStatus, AttestationVote, NodeId, PeerResult};

use super::metered;

#[derive(Clone)]
pub struct IndexerLink {
    client: IndexerClient,
}

impl IndexerLink {
    pub fn new(client: IndexerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PeerIndexer for IndexerLink {
    async fn fetch_bundle(&self, read_api_url: &str) -> PeerResult<AttestationBundle> {
        metered("indexer", self.client.fetch_bundle(read_api_url)).await
    }

    async fn fetch_votes(&self, read_api_url: &str, epoch: u64) -> PeerResult<Vec<AttestationVote>> {
        metered("indexer", self.client.fetch_votes(read_api_url, epoch)).await
    }
}

#[async_trait]
impl AttestationQuery for IndexerLink {
    async fn status(&self, read_api_url: &str, subject: &NodeId) -> PeerResult<AttestationStatus> {
        metered("indexer", self.client.fetch_status(read_api_url, subject)).await
    }
}
