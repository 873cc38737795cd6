//! # Evaluation Buffer (p44-04)
//!
//! Per-node store of behavioral samples. Every sample is handed to scoring
//! at most once: reservation writes a consumed marker for each sample in
//! the same critical section that selects it, and a marker collision
//! poisons the buffer for good.
//!
//! All access goes through [`EvalBufferHandle`], a mailbox in front of a
//! single actor task that owns the [`EvalBuffer`].

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod actor;
pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use actor::EvalBufferHandle;
pub use adapters::PlatformEvalClient;
pub use config::EvalBufferConfig;
pub use domain::{BufferStats, ConsumedMarker, EvalBuffer, Reservation};
pub use error::{DataIntegrityError, EvalBufferError, EvalBufferResult};
pub use ports::SampleSource;
