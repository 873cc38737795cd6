//! Evaluation loop configuration.

use serde::{Deserialize, Serialize};
use shared_types::ScorerId;
use std::time::Duration;

use crate::domain::{BurnPolicy, RewardWeights};

/// Batches per chunk are clamped to this range.
pub const MAX_BATCHES_PER_CHUNK: usize = 200;
/// Random scorer sample size is clamped to `1..=MAX_SAMPLE_SIZE`.
pub const MAX_SAMPLE_SIZE: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Batches per dispatched chunk (N).
    pub batches_per_chunk: usize,

    /// Samples grouped into one batch.
    pub samples_per_batch: usize,

    /// Require both hand types in every chunk.
    pub require_mixed: bool,

    /// Wait between reservations that came back empty.
    #[serde(with = "duration_millis")]
    pub collect_poll_interval: Duration,

    /// Longest a cycle may spend collecting before it degrades.
    #[serde(with = "duration_millis")]
    pub max_wait: Duration,

    /// Idle sleep at the end of every cycle.
    #[serde(with = "duration_millis")]
    pub poll_interval: Duration,

    /// Per-scorer deadline.
    #[serde(with = "duration_millis")]
    pub scorer_timeout: Duration,

    /// Scorers to query when no explicit list is given.
    pub sample_size: usize,

    /// Query exactly these scorers when any of them are registered.
    #[serde(default)]
    pub explicit_scorers: Vec<ScorerId>,

    /// Scored batches kept per scorer. Defaults to `batches_per_chunk`.
    #[serde(default)]
    pub reward_window: Option<usize>,

    #[serde(default)]
    pub reward: RewardWeights,

    #[serde(default)]
    pub burn: BurnPolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            batches_per_chunk: 10,
            samples_per_batch: 5,
            require_mixed: true,
            collect_poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(120),
            poll_interval: Duration::from_secs(30),
            scorer_timeout: Duration::from_secs(20),
            sample_size: 20,
            explicit_scorers: Vec::new(),
            reward_window: None,
            reward: RewardWeights::default(),
            burn: BurnPolicy::default(),
        }
    }
}

impl EvaluationConfig {
    pub fn batches_per_chunk(&self) -> usize {
        self.batches_per_chunk.clamp(1, MAX_BATCHES_PER_CHUNK)
    }

    pub fn samples_per_batch(&self) -> usize {
        self.samples_per_batch.max(1)
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size.clamp(1, MAX_SAMPLE_SIZE)
    }

    pub fn reward_window(&self) -> usize {
        self.reward_window
            .unwrap_or_else(|| self.batches_per_chunk())
            .max(1)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps() {
        let config = EvaluationConfig {
            batches_per_chunk: 0,
            samples_per_batch: 0,
            sample_size: 1_000,
            ..EvaluationConfig::default()
        };
        assert_eq!(config.batches_per_chunk(), 1);
        assert_eq!(config.samples_per_batch(), 1);
        assert_eq!(config.sample_size(), MAX_SAMPLE_SIZE);
        assert_eq!(config.reward_window(), 1);
    }

    #[test]
    fn test_reward_window_defaults_to_chunk_size() {
        let config = EvaluationConfig::default();
        assert_eq!(config.reward_window(), 10);
        let config = EvaluationConfig {
            reward_window: Some(25),
            ..EvaluationConfig::default()
        };
        assert_eq!(config.reward_window(), 25);
    }
}
