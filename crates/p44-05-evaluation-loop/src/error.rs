//! Error types for the evaluation loop.
//!
//! Only failures that must stop evaluation are errors. Unreachable scorers
//! and degraded cycles are reported through [`crate::domain::CycleOutcome`].

use p44_04_eval_buffer::EvalBufferError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The sample source broke the consume-once guarantee or shut down.
    #[error("sample source failed: {0}")]
    Source(#[from] EvalBufferError),

    /// The weight sink refused the reward vector.
    #[error("weight sink rejected rewards: {0}")]
    Sink(String),
}

impl EvaluationError {
    /// Fatal errors stop the loop and shut the node down.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Source(err) => err.is_fatal(),
            Self::Sink(_) => false,
        }
    }
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;
