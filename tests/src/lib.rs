//! # P44 Test Suite
//!
//! Cross-component flows over real loopback HTTP: axum servers bound to
//! `127.0.0.1:0`, reqwest clients, the system clock.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # servers, fixtures, shared secret
//! └── integration/
//!     ├── attestation_mesh.rs   # directory + indexers + ledger gate
//!     ├── directory_expiry.rs   # announce, TTL, forged announcements
//!     └── evaluation_flow.rs    # eval buffer + scorers + weight sink
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p p44-tests
//! cargo test -p p44-tests integration::attestation_mesh::
//! ```

#![allow(dead_code)]

pub mod harness;
pub mod integration;
