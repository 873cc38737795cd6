//! Epoch and quorum arithmetic shared by indexers and the ledger gate.

use crate::entities::Timestamp;

/// Epochs shorter than this are rounded up.
pub const MIN_EPOCH_SECONDS: u64 = 5;

/// Epoch containing `now`.
pub fn epoch_for(now: Timestamp, epoch_seconds: u64) -> u64 {
    now.as_secs() / epoch_seconds.max(MIN_EPOCH_SECONDS)
}

/// Strict majority of `n` independent voters.
///
/// Zero for a set of one or none: such a set is too small to form a
/// quorum at all.
pub fn majority_quorum(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        (n - 1) / 2 + 1
    }
}
