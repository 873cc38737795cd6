//! # Room Directory (p44-01)
//!
//! Registry of rooms announced by validator nodes.
//!
//! ## Contract
//!
//! - `announce` validates required fields, url schemes, clock skew and the
//!   HMAC signature, then upserts keyed by node id with `last_seen = now`.
//!   A rejected announcement never touches the map.
//! - `list_rooms` returns rooms with `now - last_seen < ttl`, evicting the
//!   rest as it reads.
//! - Records are replaced atomically per node id.
//!
//! ## Architecture
//!
//! ```text
//! announce loop ──POST /rooms/announce──→ [RoomDirectory] ←──GET /rooms── indexers, ledger gate
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::DirectoryClient;
pub use config::DirectoryConfig;
pub use domain::{AnnounceOutcome, AnnouncementTemplate, DirectoryHealth};
pub use error::{DirectoryError, DirectoryResult};
pub use ports::DirectoryApi;
pub use service::RoomDirectory;
