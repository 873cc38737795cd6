//! # P44 Validator Node
//!
//! Runs one validator of the mesh: room directory, attestation indexer,
//! ledger gate, evaluation buffer and evaluation loop, each behind its own
//! crate, wired together here.
//!
//! ## Modules
//!
//! - `container/` - configuration and component construction
//! - `adapters/` - port implementations (local component or remote client)
//! - `handlers/` - event bus subscribers
//! - `wiring/` - HTTP listeners and periodic loops
//! - `runtime` - start and graceful shutdown
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, `P44_CONFIG` file, `P44_*` env)
//! 2. Reject an insecure shared secret
//! 3. Initialize telemetry
//! 4. Build components, bind listeners, spawn loops
//! 5. Run until Ctrl-C or a fatal evaluation error

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;
pub mod wiring;

pub use container::{BuildError, ConfigError, NodeConfig, NodeContainer};
pub use runtime::{BoundAddrs, NodeRuntime, RunningNode};
