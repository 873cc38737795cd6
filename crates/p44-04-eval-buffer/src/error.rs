//! Error types for the evaluation buffer.

use shared_types::PeerError;
use thiserror::Error;

/// Breaches of the consume-once guarantee. Any of these stops evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    #[error("sample {0} was already ingested")]
    DuplicateSample(String),

    #[error("sample {0} already carries a consumed marker")]
    DoubleConsumption(String),

    #[error("buffer is poisoned after an integrity failure: {0}")]
    Poisoned(String),

    /// Reported by a remote buffer over HTTP.
    #[error("remote integrity failure: {0}")]
    Remote(String),
}

#[derive(Debug, Error)]
pub enum EvalBufferError {
    #[error("invalid sample: {0}")]
    Validation(String),

    #[error(transparent)]
    DataIntegrity(#[from] DataIntegrityError),

    /// The buffer actor has stopped.
    #[error("evaluation buffer is closed")]
    Closed,

    /// A remote sample source could not be reached.
    #[error("sample source unavailable: {0}")]
    Source(#[from] PeerError),
}

impl EvalBufferError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DataIntegrity(_) | Self::Closed)
    }
}

pub type EvalBufferResult<T> = Result<T, EvalBufferError>;
