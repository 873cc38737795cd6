//! Ports for the ledger gate.

pub mod inbound;
pub mod outbound;

pub use inbound::LedgerGateApi;
pub use outbound::{AttestationQuery, IndexerDiscovery};
