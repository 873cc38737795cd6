//! Error types for the attestation indexer.

use shared_types::{PeerError, SigningError};
use thiserror::Error;

/// Indexer errors.
///
/// Peer failures during a poll round are not errors: they become
/// `Unattested(NoBundle)` votes. Only local faults surface here.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// This node is configured not to publish a bundle.
    #[error("attestation bundle publishing is disabled")]
    BundleDisabled,

    /// Signing a bundle or vote failed (empty or unusable secret).
    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// The directory could not be read, so no subjects are known.
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(PeerError),
}

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;
