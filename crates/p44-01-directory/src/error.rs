//! Error types for the room directory.

use shared_types::SigningError;
use thiserror::Error;

/// Announcement validation failures. Every variant leaves the directory
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be an http(s) url, got {url:?}")]
    InvalidUrl { field: &'static str, url: String },

    #[error("capacity must be at least 1, got {0}")]
    InvalidCapacity(u32),

    #[error("announced_at {announced_at} is more than {max_skew}s away from {now}")]
    ClockSkew {
        announced_at: u64,
        now: u64,
        max_skew: u64,
    },

    #[error("bad signature: {0}")]
    InvalidSignature(#[from] SigningError),
}

impl DirectoryError {
    /// True when the payload was well-formed but not signed by a holder of
    /// the shared secret.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidSignature(_))
    }

    /// Short machine-readable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::InvalidCapacity(_) => "invalid_capacity",
            Self::ClockSkew { .. } => "clock_skew",
            Self::InvalidSignature(_) => "invalid_signature",
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
