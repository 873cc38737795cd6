//! Cross-component flows.

pub mod attestation_mesh;
pub mod directory_expiry;
pub mod evaluation_flow;
