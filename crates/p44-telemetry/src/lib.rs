//! # P44 Telemetry
//!
//! Logging and metrics for a validator node.
//!
//! - Logs: `tracing` with an `EnvFilter` and either JSON lines (for log
//!   shippers) or a human-readable format.
//! - Metrics: a `prometheus` registry served as text at `/metrics` by the
//!   node runtime, fed from the event bus via [`record_event`].
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `P44_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `P44_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |
//! | `P44_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `P44_SERVICE_NAME` | `p44-validator` | Service name in logs |

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, record_event, record_peer_failure, register_metrics, PeerTimer};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install log subscriber: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics, then install logging.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}
