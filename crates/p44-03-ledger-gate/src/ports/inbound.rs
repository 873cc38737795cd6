//! Inbound port of the ledger gate.

use async_trait::async_trait;
use shared_types::NodeId;

use crate::domain::{CustodyAction, GateDecision};
use crate::error::GateResult;

#[async_trait]
pub trait LedgerGateApi: Send + Sync {
    /// Authorize `action` against an attestation quorum for `subject`, then
    /// apply it. Denials are `Ok(GateDecision::Denied(..))`.
    async fn execute(&self, subject: &NodeId, action: CustodyAction) -> GateResult<GateDecision>;

    fn balance(&self, account: &str) -> u64;
}
