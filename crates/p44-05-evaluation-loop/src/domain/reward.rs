//! Reward formula over a scorer's rolling window.
//!
//! Bots are the positive class. The reward is a weighted mean of four
//! terms in `[0, 1]`:
//!
//! | term       | definition                                  |
//! |------------|---------------------------------------------|
//! | `f1`       | F1 of the bot predictions                   |
//! | `ap`       | average precision of the risk scores        |
//! | `fp_score` | `1 / (1 + human_fp_penalty * FP / n)`       |
//! | `fn_score` | `1 / (1 + bot_miss_penalty * FN / n)`       |

use serde::{Deserialize, Serialize};

/// One scored batch: the scorer's answer next to the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredOutcome {
    pub risk_score: f64,
    pub predicted_bot: bool,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardWeights {
    pub f1: f64,
    pub ap: f64,
    pub fp: f64,
    pub fn_miss: f64,
    /// Cost of flagging a human as a bot.
    pub human_fp_penalty: f64,
    /// Cost of letting a bot through.
    pub bot_miss_penalty: f64,
}

impl Default for RewardWeights {
    fn default() -> Self {
        Self {
            f1: 1.0,
            ap: 1.0,
            fp: 1.0,
            fn_miss: 0.5,
            human_fp_penalty: 2.0,
            bot_miss_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub f1: f64,
    pub ap: f64,
    pub fp_score: f64,
    pub fn_score: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
}

fn confusion(outcomes: &[ScoredOutcome]) -> Confusion {
    outcomes.iter().fold(Confusion::default(), |mut c, o| {
        match (o.predicted_bot, o.is_bot) {
            (true, true) => c.tp += 1,
            (true, false) => c.fp += 1,
            (false, true) => c.fn_ += 1,
            (false, false) => {}
        }
        c
    })
}

fn f1(c: Confusion) -> f64 {
    if c.tp == 0 {
        return 0.0;
    }
    let tp = c.tp as f64;
    2.0 * tp / (2.0 * tp + c.fp as f64 + c.fn_ as f64)
}

/// Step-wise average precision; tied scores share one threshold.
/// Zero when the window holds no bots.
pub fn average_precision(outcomes: &[ScoredOutcome]) -> f64 {
    let positives = outcomes.iter().filter(|o| o.is_bot).count();
    if positives == 0 {
        return 0.0;
    }
    let mut ranked: Vec<&ScoredOutcome> = outcomes.iter().collect();
    ranked.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < ranked.len() {
        let threshold = ranked[i].risk_score;
        while i < ranked.len() && ranked[i].risk_score == threshold {
            if ranked[i].is_bot {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let recall = tp as f64 / positives as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    ap
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RewardFormula {
    weights: RewardWeights,
}

impl RewardFormula {
    pub fn new(weights: RewardWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &RewardWeights {
        &self.weights
    }

    pub fn evaluate(&self, outcomes: &[ScoredOutcome]) -> RewardBreakdown {
        if outcomes.is_empty() {
            return RewardBreakdown::default();
        }
        let w = &self.weights;
        let n = outcomes.len() as f64;
        let c = confusion(outcomes);

        let f1 = f1(c);
        let ap = average_precision(outcomes);
        let fp_score = 1.0 / (1.0 + w.human_fp_penalty.max(0.0) * c.fp as f64 / n);
        let fn_score = 1.0 / (1.0 + w.bot_miss_penalty.max(0.0) * c.fn_ as f64 / n);

        let terms = [(w.f1, f1), (w.ap, ap), (w.fp, fp_score), (w.fn_miss, fn_score)];
        let total_weight: f64 = terms.iter().map(|(w, _)| w.max(0.0)).sum();
        let reward = if total_weight > 0.0 {
            terms.iter().map(|(w, t)| w.max(0.0) * t).sum::<f64>() / total_weight
        } else {
            0.0
        };

        RewardBreakdown {
            f1,
            ap,
            fp_score,
            fn_score,
            reward,
        }
    }
}
