//! Port consumed by the evaluation loop.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::Reservation;
use crate::error::EvalBufferResult;

/// Anything that hands out consume-once samples: the local buffer actor or
/// a remote gameplay backend.
#[async_trait]
pub trait SampleSource: Send + Sync {
    async fn reserve_batch(&self, limit: usize, require_mixed: bool) -> EvalBufferResult<Reservation>;

    async fn mark_evaluated(&self, sample_ids: Vec<String>) -> EvalBufferResult<usize>;
}

#[async_trait]
impl<T: SampleSource + ?Sized> SampleSource for Arc<T> {
    async fn reserve_batch(&self, limit: usize, require_mixed: bool) -> EvalBufferResult<Reservation> {
        (**self).reserve_batch(limit, require_mixed).await
    }

    async fn mark_evaluated(&self, sample_ids: Vec<String>) -> EvalBufferResult<usize> {
        (**self).mark_evaluated(sample_ids).await
    }
}
