//! Outbound ports of the evaluation loop.
//!
//! Samples come in through [`p44_04_eval_buffer::SampleSource`].

use async_trait::async_trait;
use shared_types::{PeerResult, RewardVector};

use crate::domain::{ScoreReply, ScoreRequest, ScorerEndpoint};
use crate::error::EvaluationResult;

/// Sends a chunk to one scorer.
#[async_trait]
pub trait ScorerClient: Send + Sync {
    async fn score(&self, scorer: &ScorerEndpoint, request: &ScoreRequest) -> PeerResult<ScoreReply>;
}

/// Where reward vectors end up.
#[async_trait]
pub trait WeightSink: Send + Sync {
    async fn submit(&self, rewards: RewardVector) -> EvaluationResult<()>;
}
