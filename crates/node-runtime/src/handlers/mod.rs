//! # Event Handlers
//!
//! Subscribers to the node's event bus.

pub mod telemetry;

pub use telemetry::TelemetryHandler;
