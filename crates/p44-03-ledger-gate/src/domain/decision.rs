//! Gate decision rules over indexer replies.

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, Timestamp, TrustState, UnattestedReason};

use super::CustodyAction;

/// One indexer's answer. `None` means it timed out, failed or answered
/// about the wrong node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerReply {
    pub indexer: NodeId,
    pub state: Option<TrustState>,
}

/// Why an action was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    InsufficientQuorum { reachable: usize, required: usize },
    NotAttested { indexer: NodeId, reason: UnattestedReason },
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientQuorum { .. } => "insufficient_quorum",
            Self::NotAttested { .. } => "not_attested",
        }
    }
}

/// Proof that a mutation was authorized and applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub receipt_id: String,
    pub subject: NodeId,
    pub action: CustodyAction,
    pub balance_after: u64,
    pub attested_by: Vec<NodeId>,
    pub decided_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Allowed(Receipt),
    Denied(DenyReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed(_))
    }
}

/// Indexers that vouch for the subject, or the reason to deny.
///
/// Fewer than `required` reachable indexers denies even if every one of
/// them answered attested; any reachable negative answer denies.
pub fn evaluate_replies(replies: &[IndexerReply], required: usize) -> Result<Vec<NodeId>, DenyReason> {
    let reachable: Vec<(&NodeId, TrustState)> = replies
        .iter()
        .filter_map(|r| r.state.map(|s| (&r.indexer, s)))
        .collect();

    if reachable.len() < required {
        return Err(DenyReason::InsufficientQuorum {
            reachable: reachable.len(),
            required,
        });
    }
    if let Some((indexer, state)) = reachable.iter().find(|(_, s)| !s.is_attested()) {
        return Err(DenyReason::NotAttested {
            indexer: (*indexer).clone(),
            reason: state.reason().unwrap_or(UnattestedReason::NoBundle),
        });
    }
    Ok(reachable.into_iter().map(|(id, _)| id.clone()).collect())
}
