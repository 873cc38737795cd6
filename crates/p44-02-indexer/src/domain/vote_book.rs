//! This node's votes for the most recent poll round.
//!
//! The poll task is the only writer and always replaces the whole round, so
//! readers never observe a half-written round.

use parking_lot::RwLock;
use shared_types::{AttestationVote, NodeId, Timestamp};
use std::collections::BTreeMap;

/// One complete poll round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteRound {
    pub epoch: u64,
    pub computed_at: Timestamp,
    pub votes: BTreeMap<NodeId, AttestationVote>,
}

#[derive(Debug, Default)]
pub struct VoteBook {
    round: RwLock<VoteRound>,
}

impl VoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly computed round.
    pub fn replace(&self, round: VoteRound) {
        *self.round.write() = round;
    }

    /// Votes cast in `epoch`, ordered by subject. Empty when the stored
    /// round belongs to another epoch.
    pub fn votes_for_epoch(&self, epoch: u64) -> Vec<AttestationVote> {
        let round = self.round.read();
        if round.epoch != epoch {
            return Vec::new();
        }
        round.votes.values().cloned().collect()
    }

    /// Most recent vote about `subject`, whatever its epoch.
    pub fn latest_for(&self, subject: &NodeId) -> Option<AttestationVote> {
        self.round.read().votes.get(subject).cloned()
    }

    pub fn snapshot(&self) -> VoteRound {
        self.round.read().clone()
    }
}
