//! # Attestation Indexer (p44-02)
//!
//! Every validator runs one. It publishes a signed bundle about its own
//! environment, votes on every peer each epoch, and aggregates peer votes
//! into a quorum-backed trust state per room.
//!
//! ## Vote classification
//!
//! | Observation                                   | Verdict                           |
//! |-----------------------------------------------|-----------------------------------|
//! | no read api, fetch failure, bad origin        | `Unattested(NoBundle)`            |
//! | `trust_flag == false`                         | `Unattested(EnvironmentIntegrityDisabled)` |
//! | issued outside the staleness / skew window    | `Unattested(BundleStale)`         |
//! | otherwise                                     | `Attested`                        |
//!
//! The status endpoint reports this indexer's own latest vote. Quorum is
//! formed by the caller (the ledger gate) across several indexers.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::IndexerClient;
pub use config::IndexerConfig;
pub use domain::{DirectoryState, PollSummary, ValidatorStatus, VoteBook, VoteListing};
pub use error::{IndexerError, IndexerResult};
pub use ports::{DirectorySource, IndexerApi, PeerIndexer};
pub use service::IndexerService;
