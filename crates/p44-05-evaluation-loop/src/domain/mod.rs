//! Evaluation domain: batching, scoring replies, rewards and the cycle.

pub mod batching;
pub mod burn;
pub mod registry;
pub mod reply;
pub mod reward;
pub mod window;

pub use batching::{BatchStager, EvalBatch, EvalChunk};
pub use burn::BurnPolicy;
pub use registry::{ScorerEndpoint, ScorerRegistry};
pub use reply::{validate_reply, ScoreReply, ScoreRequest};
pub use reward::{average_precision, RewardBreakdown, RewardFormula, RewardWeights, ScoredOutcome};
pub use window::RollingWindows;

use serde::{Deserialize, Serialize};
use shared_types::RewardVector;
use std::fmt;

/// Phases of one evaluation cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Collecting,
    Dispatching,
    Scoring,
    Rewarding,
    Idle,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Collecting => "collecting",
            Self::Dispatching => "dispatching",
            Self::Scoring => "scoring",
            Self::Rewarding => "rewarding",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A chunk was scored and rewards were submitted.
    Rewarded {
        cycle_id: String,
        rewards: RewardVector,
        degraded: bool,
    },
    /// A chunk was dispatched but no scorer replied validly.
    Burned {
        cycle_id: String,
        rewards: RewardVector,
        degraded: bool,
    },
    /// Max wait elapsed and not even leftovers made a chunk. No reward.
    Degraded { cycle_id: String, pending_batches: usize },
    /// A chunk was ready but no scorer was selected; it stays pending.
    NoScorers { cycle_id: String },
}

impl CycleOutcome {
    pub fn rewards(&self) -> Option<&RewardVector> {
        match self {
            Self::Rewarded { rewards, .. } | Self::Burned { rewards, .. } => Some(rewards),
            Self::Degraded { .. } | Self::NoScorers { .. } => None,
        }
    }
}
