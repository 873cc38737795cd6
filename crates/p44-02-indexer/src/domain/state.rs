//! Aggregated directory state: every live room with its quorum-backed trust.

use serde::{Deserialize, Serialize};
use shared_types::{
    majority_quorum, AttestationVote, NodeId, RoomAnnouncement, Timestamp, TrustState,
    UnattestedReason,
};
use std::cmp::Reverse;

/// One room as seen through bundles and peer votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorStatus {
    pub node_id: NodeId,
    pub node_name: String,
    pub service_url: String,
    pub read_api_url: Option<String>,
    pub last_seen: Timestamp,
    pub trust: TrustState,
    pub votes_pass: usize,
    pub votes_fail: usize,
    pub quorum: usize,
}

/// Response of `GET /directory/state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryState {
    pub epoch: u64,
    pub validators: Vec<ValidatorStatus>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub generated_at: Timestamp,
}

/// Quorum over the rooms that run an indexer, or over all rooms when none do.
pub fn voter_quorum(rooms: &[RoomAnnouncement]) -> usize {
    let voters = rooms.iter().filter(|r| r.read_api_url.is_some()).count();
    let n = if voters == 0 { rooms.len() } else { voters };
    majority_quorum(n)
}

/// Pass and fail counts about `subject`, ignoring its own votes.
pub fn count_votes(subject: &NodeId, votes: &[AttestationVote]) -> (usize, usize) {
    votes
        .iter()
        .filter(|v| &v.subject_node_id == subject && &v.voter_node_id != subject)
        .fold((0, 0), |(pass, fail), v| {
            if v.verdict.is_attested() {
                (pass + 1, fail)
            } else {
                (pass, fail + 1)
            }
        })
}

/// Combine the subject's bundle state with its peer votes.
///
/// A set too small to form a quorum (`quorum == 0`) never attests.
pub fn aggregate(bundle_state: TrustState, votes_pass: usize, quorum: usize) -> TrustState {
    if !bundle_state.is_attested() {
        return bundle_state;
    }
    if quorum == 0 || votes_pass < quorum {
        return TrustState::Unattested(UnattestedReason::InsufficientQuorum);
    }
    TrustState::Attested
}

/// Attested first, then most recently seen.
pub fn sort_validators(validators: &mut [ValidatorStatus]) {
    validators.sort_by_key(|v| (!v.trust.is_attested(), Reverse(v.last_seen)));
}
