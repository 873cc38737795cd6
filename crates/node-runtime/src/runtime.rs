//! Node lifecycle: build, start, run until shutdown, stop.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::container::{NodeConfig, NodeContainer};
use crate::handlers::TelemetryHandler;
use crate::wiring::loops::{announce_loop, evaluation_task, indexer_poll_loop, sweep_loop};
use crate::wiring::{serve, BoundServer, Routers};

/// How long [`RunningNode::shutdown`] waits for each task.
const TASK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Addresses the node is listening on.
#[derive(Debug, Clone, Default)]
pub struct BoundAddrs {
    pub directory: Option<SocketAddr>,
    pub indexer: Option<SocketAddr>,
    pub service: Option<SocketAddr>,
    pub status: Option<SocketAddr>,
}

pub struct NodeRuntime {
    config: NodeConfig,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        Self { config }
    }

    /// Build every component, bind every listener and spawn every loop.
    pub async fn start(self) -> Result<RunningNode> {
        p44_telemetry::register_metrics().context("Failed to register metrics")?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut container = NodeContainer::build(self.config, shutdown_rx.clone())
            .context("Failed to build node components")?;
        let telemetry = TelemetryHandler::new(&container.bus);

        let mut tasks: Vec<(&'static str, JoinHandle<()>)> = Vec::new();
        if let Some(task) = container.take_buffer_task() {
            tasks.push(("eval-buffer", task));
        }
        tasks.push(("telemetry", tokio::spawn({
            let rx = shutdown_rx.clone();
            async move {
                telemetry.run(rx).await;
            }
        })));

        let routers = Routers::for_container(&container);
        let network = container.config.network.clone();
        let host = network.bind_host.as_str();
        let mut addrs = BoundAddrs::default();
        let mut servers: Vec<BoundServer> = Vec::new();

        if let Some(router) = routers.directory {
            let server = serve("directory", router, host, network.directory_port, shutdown_rx.clone())
                .await
                .context("Failed to bind directory listener")?;
            addrs.directory = Some(server.addr);
            servers.push(server);
        }
        if let Some(router) = routers.indexer {
            let server = serve("indexer", router, host, network.indexer_port, shutdown_rx.clone())
                .await
                .context("Failed to bind indexer listener")?;
            addrs.indexer = Some(server.addr);
            servers.push(server);
        }
        if let Some(router) = routers.service {
            let server = serve("service", router, host, network.service_port, shutdown_rx.clone())
                .await
                .context("Failed to bind service listener")?;
            addrs.service = Some(server.addr);
            servers.push(server);
        }
        let server = serve("status", routers.status, host, network.status_port, shutdown_rx.clone())
            .await
            .context("Failed to bind status listener")?;
        addrs.status = Some(server.addr);
        servers.push(server);

        for server in servers {
            tasks.push((server.name, server.task));
        }

        let config = &container.config;
        if let Some(directory) = &container.directory {
            tasks.push(("directory-sweep", tokio::spawn(sweep_loop(
                Arc::clone(directory),
                config.directory.sweep_interval(),
                shutdown_rx.clone(),
            ))));
        }
        if config.directory.announce {
            tasks.push(("announce", tokio::spawn(announce_loop(
                container.directory_link.clone(),
                container.announcement_template(),
                container.secret.clone(),
                Arc::clone(&container.time_source),
                config.directory.announce_interval(),
                shutdown_rx.clone(),
            ))));
        }
        if let Some(indexer) = &container.indexer {
            tasks.push(("indexer-poll", tokio::spawn(indexer_poll_loop(
                Arc::clone(indexer),
                config.indexer.poll_interval(),
                shutdown_rx.clone(),
            ))));
        }
        if config.evaluation.enabled {
            let evaluation = container
                .evaluation_loop()
                .context("Failed to build evaluation loop")?;
            tasks.push(("evaluation", tokio::spawn(evaluation_task(
                evaluation,
                shutdown_rx.clone(),
                shutdown_tx.clone(),
            ))));
        }

        info!(
            node_id = %container.config.identity.node_id,
            directory = ?addrs.directory,
            indexer = ?addrs.indexer,
            service = ?addrs.service,
            status = ?addrs.status,
            tasks = tasks.len(),
            "Node started"
        );

        Ok(RunningNode {
            container: Arc::new(container),
            addrs,
            shutdown_tx,
            shutdown_rx,
            tasks,
        })
    }
}

/// A started node.
pub struct RunningNode {
    container: Arc<NodeContainer>,
    addrs: BoundAddrs,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningNode {
    pub fn addrs(&self) -> &BoundAddrs {
        &self.addrs
    }

    pub fn container(&self) -> Arc<NodeContainer> {
        Arc::clone(&self.container)
    }

    /// Resolves once shutdown has been requested, by [`Self::shutdown`] or
    /// by a fatal error inside the node.
    pub fn shutdown_requested(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.shutdown_rx.clone();
        async move {
            // A dropped sender also counts as shutdown.
            let _ = rx.wait_for(|stop| *stop).await;
        }
    }

    /// Signal every task and wait for them to finish.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        for (name, task) in self.tasks {
            match tokio::time::timeout(TASK_DRAIN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(task = name, error = %err, "Task ended abnormally"),
                Err(_) => warn!(task = name, "Task did not stop in time"),
            }
        }
        info!("Shutdown complete");
    }
}
