use async_trait::async_trait;
use p44_05_evaluation_loop::{HttpScorerClient, ScorerClient, ScorerEndpoint};
use p44_05_evaluation_loop::domain::{ScoreReply, ScoreRequest};
use shared_types::PeerResult;

use super::metered;

/// [`HttpScorerClient`] with latency and failure metrics.
#[derive(Clone)]
pub struct MeteredScorers(pub HttpScorerClient);

#[async_trait]
impl ScorerClient for MeteredScorers {
    async fn score(&self, scorer: &ScorerEndpoint, request: &ScoreRequest) -> PeerResult<ScoreReply> {
        metered("scorer", self.0.score(scorer, request)).await
    }
}
