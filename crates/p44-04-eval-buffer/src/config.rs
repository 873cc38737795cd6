//! Evaluation buffer configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalBufferConfig {
    /// Largest `limit` honored by a single reservation.
    pub max_reserve: usize,

    /// Actor mailbox depth.
    pub mailbox_capacity: usize,
}

impl Default for EvalBufferConfig {
    fn default() -> Self {
        Self {
            max_reserve: 500,
            mailbox_capacity: 256,
        }
    }
}

impl EvalBufferConfig {
    pub fn new(max_reserve: usize, mailbox_capacity: usize) -> Self {
        Self {
            max_reserve: max_reserve.max(1),
            mailbox_capacity: mailbox_capacity.max(1),
        }
    }
}
