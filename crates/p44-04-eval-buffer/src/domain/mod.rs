//! Buffer domain: the consume-once store and its reservation types.

pub mod buffer;

pub use buffer::EvalBuffer;

use serde::{Deserialize, Serialize};
use shared_types::{EvalSample, Timestamp};

/// Written exactly once per sample, when it is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedMarker {
    pub sample_id: String,
    pub consumed_at: Timestamp,
}

/// Samples handed out by one `reserve_batch` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub samples: Vec<EvalSample>,
    /// Both HUMAN and BOT are present in `samples`.
    pub mixed: bool,
}

impl Reservation {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub total: usize,
    pub unconsumed: usize,
    pub consumed: usize,
    pub evaluated: usize,
    pub poisoned: bool,
}
