//! Indexer domain: bundle classification, the vote book and aggregation.

pub mod classify;
pub mod state;
pub mod vote_book;

pub use classify::{classify_bundle, Freshness};
pub use state::{aggregate, count_votes, sort_validators, voter_quorum, DirectoryState, ValidatorStatus};
pub use vote_book::{VoteBook, VoteRound};

use serde::{Deserialize, Serialize};
use shared_types::{AttestationVote, NodeId};

/// Response of `GET /attestation/votes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteListing {
    pub voter_node_id: NodeId,
    pub epoch: u64,
    pub votes: Vec<AttestationVote>,
}

/// Counts from one poll round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub epoch: u64,
    pub attested: usize,
    pub unattested: usize,
    pub unreachable: usize,
}
