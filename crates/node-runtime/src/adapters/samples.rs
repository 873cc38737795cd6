//! Where the evaluation loop gets its samples.

use async_trait::async_trait;
use p44_04_eval_buffer::{
    EvalBufferError, EvalBufferHandle, EvalBufferResult, PlatformEvalClient, Reservation,
    SampleSource,
};
use p44_telemetry::{record_peer_failure, PeerTimer};

use super::failure_kind;

#[derive(Clone)]
pub enum SampleFeed {
    /// This node's own buffer.
    Local(EvalBufferHandle),
    /// A gameplay backend's internal eval API.
    Remote(PlatformEvalClient),
}

impl SampleFeed {
    async fn remote<T>(call: impl std::future::Future<Output = EvalBufferResult<T>>) -> EvalBufferResult<T> {
        let _timer = PeerTimer::start("platform");
        let result = call.await;
        match &result {
            Err(EvalBufferError::Source(err)) => record_peer_failure("platform", failure_kind(err)),
            Err(EvalBufferError::DataIntegrity(_)) => record_peer_failure("platform", "integrity"),
            Err(EvalBufferError::Validation(_)) => record_peer_failure("platform", "invalid"),
            _ => {}
        }
        result
    }
}

#[async_trait]
impl SampleSource for SampleFeed {
    async fn reserve_batch(&self, limit: usize, require_mixed: bool) -> EvalBufferResult<Reservation> {
        match self {
            Self::Local(handle) => handle.reserve_batch(limit, require_mixed).await,
            Self::Remote(client) => Self::remote(client.reserve_batch(limit, require_mixed)).await,
        }
    }

    async fn mark_evaluated(&self, sample_ids: Vec<String>) -> EvalBufferResult<usize> {
        match self {
            Self::Local(handle) => handle.mark_evaluated(sample_ids).await,
            Self::Remote(client) => Self::remote(client.mark_evaluated(sample_ids)).await,
        }
    }
}
