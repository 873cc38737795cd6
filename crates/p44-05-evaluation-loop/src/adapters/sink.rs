//! Weight sinks that stay inside the process.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::RewardVector;
use tracing::info;

use crate::error::EvaluationResult;
use crate::ports::WeightSink;

/// Logs every vector. The default sink when no chain submitter is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWeightSink;

#[async_trait]
impl WeightSink for LoggingWeightSink {
    async fn submit(&self, rewards: RewardVector) -> EvaluationResult<()> {
        let total: f64 = rewards.values().sum();
        for (scorer, reward) in &rewards {
            info!(scorer = %scorer, reward, "Reward");
        }
        info!(scorers = rewards.len(), total, "Submitted reward vector");
        Ok(())
    }
}

/// Keeps every submitted vector, newest last.
#[derive(Debug, Default)]
pub struct InMemoryWeightSink {
    submissions: Mutex<Vec<RewardVector>>,
}

impl InMemoryWeightSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> Vec<RewardVector> {
        self.submissions.lock().clone()
    }

    pub fn latest(&self) -> Option<RewardVector> {
        self.submissions.lock().last().cloned()
    }
}

#[async_trait]
impl WeightSink for InMemoryWeightSink {
    async fn submit(&self, rewards: RewardVector) -> EvaluationResult<()> {
        self.submissions.lock().push(rewards);
        Ok(())
    }
}

#[async_trait]
impl<T: WeightSink + ?Sized> WeightSink for std::sync::Arc<T> {
    async fn submit(&self, rewards: RewardVector) -> EvaluationResult<()> {
        (**self).submit(rewards).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ScorerId;

    #[tokio::test]
    async fn test_in_memory_sink_keeps_order() {
        let sink = InMemoryWeightSink::new();
        sink.submit(RewardVector::from([(ScorerId::from("a"), 1.0)])).await.unwrap();
        sink.submit(RewardVector::from([(ScorerId::from("b"), 0.5)])).await.unwrap();
        assert_eq!(sink.submissions().len(), 2);
        assert_eq!(sink.latest().unwrap()[&ScorerId::from("b")], 0.5);
        LoggingWeightSink.submit(RewardVector::new()).await.unwrap();
    }
}
