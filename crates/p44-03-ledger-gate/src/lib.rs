//! # Ledger Gate (p44-03)
//!
//! Custody service in front of the bankroll. Before an irreversible
//! mutation tied to a validator node, it asks several independent indexers
//! whether that node is attested.
//!
//! ## Decision rule
//!
//! 1. Indexers = live rooms with a read api, minus the subject, by node id,
//!    at most `max_fanout`.
//! 2. Fewer than `min_indexers` reachable → `InsufficientQuorum`.
//! 3. Any reachable indexer says unattested → `NotAttested`.
//! 4. Otherwise the mutation is applied and a receipt returned.
//!
//! The subject's lock is held across steps 1-4.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::GateConfig;
pub use domain::{Bankroll, CustodyAction, DenyReason, GateDecision, Receipt};
pub use error::{GateResult, LedgerError};
pub use ports::{AttestationQuery, IndexerDiscovery, LedgerGateApi};
pub use service::LedgerGate;
