//! # Wiring
//!
//! Starts what the container built: HTTP listeners and periodic loops.
//!
//! ```text
//!  announce ──every announce_interval──→ DirectoryLink ──→ directory
//!  indexer-poll ──every poll_interval──→ IndexerService ──→ peer indexers
//!  directory-sweep ──every sweep_interval──→ RoomDirectory
//!  evaluation ──cycles──→ SampleFeed / scorers / RecordingSink
//!  telemetry ←── event bus ←── every component
//! ```

pub mod loops;
pub mod servers;

pub use servers::{serve, BoundServer, Routers};
