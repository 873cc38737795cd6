//! `node-runtime` binary.

use anyhow::{Context, Result};
use node_runtime::{NodeConfig, NodeRuntime};
use p44_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load().context("Failed to load configuration")?;

    let telemetry = TelemetryConfig::from_env().with_node_name(config.identity.node_name.clone());
    init_telemetry(&telemetry).context("Failed to initialize telemetry")?;

    if std::env::var("P44_ALLOW_INSECURE").is_ok() {
        warn!("P44_ALLOW_INSECURE is set, skipping shared secret checks");
        config.validate().context("Invalid configuration")?;
    } else {
        config
            .validate_for_production()
            .context("Refusing to start with this configuration")?;
    }

    info!(
        node_id = %config.identity.node_id,
        version = %config.identity.version_hash,
        "Starting P44 validator node"
    );
    let node = NodeRuntime::new(config).start().await?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Received Ctrl-C");
        }
        _ = node.shutdown_requested() => {
            warn!("Node requested shutdown");
        }
    }

    node.shutdown().await;
    Ok(())
}
