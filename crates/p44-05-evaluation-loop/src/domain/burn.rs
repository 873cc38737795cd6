//! What happens to emission when scorers earn nothing, and the optional
//! standing burn.

use serde::{Deserialize, Serialize};
use shared_types::{RewardVector, ScorerId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnPolicy {
    /// Receives the burn allocation.
    pub sink_id: ScorerId,
    /// Weight given to the sink when no scorer replied validly.
    pub burn_reward: f64,
    /// Fraction of every vector routed to the sink, in `[0, 1]`.
    pub burn_fraction: Option<f64>,
}

impl Default for BurnPolicy {
    fn default() -> Self {
        Self {
            sink_id: ScorerId::from("0"),
            burn_reward: 1.0,
            burn_fraction: None,
        }
    }
}

impl BurnPolicy {
    /// Vector used when zero scorers replied validly.
    pub fn burn_only(&self) -> RewardVector {
        RewardVector::from([(self.sink_id.clone(), self.burn_reward)])
    }

    /// Apply the standing burn, if configured: rewards are normalized to
    /// sum to one (uniform when all are zero), scaled by `1 - f`, and the
    /// sink receives `f`.
    pub fn apply(&self, rewards: RewardVector) -> RewardVector {
        let Some(fraction) = self.burn_fraction else {
            return rewards;
        };
        if rewards.is_empty() {
            return self.burn_only();
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let total: f64 = rewards.values().sum();
        let count = rewards.len() as f64;

        let mut out: RewardVector = rewards
            .into_iter()
            .map(|(id, r)| {
                let share = if total > 0.0 { r / total } else { 1.0 / count };
                (id, share * (1.0 - fraction))
            })
            .collect();
        *out.entry(self.sink_id.clone()).or_insert(0.0) += fraction;
        out
    }
}
