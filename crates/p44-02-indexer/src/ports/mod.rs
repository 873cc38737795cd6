//! Ports for the attestation indexer.

pub mod inbound;
pub mod outbound;

pub use inbound::IndexerApi;
pub use outbound::{DirectorySource, PeerIndexer};
