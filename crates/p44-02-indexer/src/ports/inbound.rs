//! Inbound port (driving side) of the attestation indexer.

use async_trait::async_trait;
use shared_types::{AttestationBundle, AttestationStatus, NodeId};

use crate::domain::{DirectoryState, VoteListing};
use crate::error::IndexerResult;

/// Read API served to peers, the ledger gate and operators.
#[async_trait]
pub trait IndexerApi: Send + Sync {
    /// This node's bundle, signed now. `BundleDisabled` when not publishing.
    async fn current_bundle(&self) -> IndexerResult<AttestationBundle>;

    /// This node's votes for `epoch` (default: the current one).
    async fn votes(&self, epoch: Option<u64>) -> VoteListing;

    /// Every live room with its quorum-backed trust state.
    async fn directory_state(&self) -> DirectoryState;

    /// This indexer's own view of `node_id`. Never a quorum claim.
    async fn attestation_status(&self, node_id: &NodeId) -> AttestationStatus;

    fn current_epoch(&self) -> u64;
}
