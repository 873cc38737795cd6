//! # Evaluation Loop (p44-05)
//!
//! Periodic cycle that turns consume-once samples into scorer rewards.
//!
//! ```text
//! Collecting ──→ Dispatching ──→ Scoring ──→ Rewarding ──→ Idle
//!  reserve +      N batches,      concurrent    rolling window,   sleep, then
//!  stage          pick scorers    POST /score   formula, burn     mark evaluated
//! ```
//!
//! - A chunk is exactly N batches; nothing is rewarded over fewer.
//! - Each batch holds one hand type. With `require_mixed`, a chunk carries
//!   both.
//! - Timeouts, transport failures and malformed replies mean "no response".
//!   Zero valid replies route the whole vector to the burn sink.
//! - A data-integrity failure from the sample source is fatal.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{HttpScorerClient, InMemoryWeightSink, LoggingWeightSink};
pub use config::EvaluationConfig;
pub use domain::{
    BurnPolicy, CycleOutcome, CyclePhase, RewardFormula, RewardWeights, ScorerEndpoint,
    ScorerRegistry,
};
pub use error::{EvaluationError, EvaluationResult};
pub use ports::{ScorerClient, WeightSink};
pub use service::EvaluationLoop;
