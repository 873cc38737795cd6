//! The node's weight sink: log every vector and keep recent ones for
//! `/weights/latest`.

use async_trait::async_trait;
use p44_05_evaluation_loop::{EvaluationResult, LoggingWeightSink, WeightSink};
use parking_lot::Mutex;
use shared_types::RewardVector;
use std::collections::VecDeque;

/// Vectors kept in memory.
const HISTORY: usize = 32;

#[derive(Debug, Default)]
pub struct RecordingSink {
    log: LoggingWeightSink,
    history: Mutex<VecDeque<RewardVector>>,
    submitted: Mutex<u64>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<RewardVector> {
        self.history.lock().back().cloned()
    }

    /// Vectors submitted since startup.
    pub fn submitted(&self) -> u64 {
        *self.submitted.lock()
    }
}

#[async_trait]
impl WeightSink for RecordingSink {
    async fn submit(&self, rewards: RewardVector) -> EvaluationResult<()> {
        self.log.submit(rewards.clone()).await?;
        let mut history = self.history.lock();
        if history.len() == HISTORY {
            history.pop_front();
        }
        history.push_back(rewards);
        *self.submitted.lock() += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ScorerId;

    #[tokio::test]
    async fn test_history_is_bounded() {
        let sink = RecordingSink::new();
        assert!(sink.latest().is_none());
        for i in 0..(HISTORY + 5) {
            let vector = RewardVector::from([(ScorerId::from("m1"), i as f64)]);
            sink.submit(vector).await.unwrap();
        }
        assert_eq!(sink.submitted(), (HISTORY + 5) as u64);
        assert_eq!(sink.history.lock().len(), HISTORY);
        assert_eq!(sink.latest().unwrap()[&ScorerId::from("m1")], (HISTORY + 4) as f64);
    }
}
