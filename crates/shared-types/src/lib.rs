//! # Shared Types Crate
//!
//! Records, clocks and signing helpers shared by every validator component.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a component or a
//!   network boundary is defined here.
//! - **Signature of Origin**: announcements, bundles and votes implement
//!   `Signable` and are verified against the shared secret on receipt.
//! - **Injected Time**: all TTL and epoch logic reads a `TimeSource`.

pub mod entities;
pub mod epoch;
pub mod errors;
pub mod security;
pub mod time;

pub use entities::*;
pub use epoch::{epoch_for, majority_quorum, MIN_EPOCH_SECONDS};
pub use errors::*;
pub use security::{secrets_match, sign_bytes, verify_bytes, SharedSecret, Signable};
pub use time::{ControllableTimeSource, SystemTimeSource, TimeSource};
