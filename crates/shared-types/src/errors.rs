//! # Error Types
//!
//! Error types shared by every component that signs records or talks to
//! a peer over the network.

use thiserror::Error;

/// Signing and verification failures. Always a validation error for the
/// record that carried them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("shared secret is empty or zeroed")]
    EmptySecret,

    #[error("shared secret too short: {len} bytes, need at least {min}")]
    WeakSecret { len: usize, min: usize },

    #[error("record is unsigned")]
    MissingSignature,

    #[error("signature is not valid hex")]
    MalformedSignature,

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("canonical serialization failed: {0}")]
    Serialization(String),
}

/// A peer could not be reached or answered with something unusable.
///
/// Callers fold this into a negative vote, an unreachable count, or a
/// missing scorer response. It never aborts a polling round.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("peer timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("peer returned HTTP {status}")]
    Status { status: u16 },

    #[error("undecodable peer response: {0}")]
    Decode(String),

    #[error("peer sent an invalid record: {0}")]
    Invalid(String),
}

impl PeerError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias for peer calls.
pub type PeerResult<T> = Result<T, PeerError>;
