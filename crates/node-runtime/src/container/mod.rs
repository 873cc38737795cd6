//! # Node Container
//!
//! Builds every component of a validator node from a [`NodeConfig`] and
//! holds them for the servers and loops.
//!
//! ## Build Order
//!
//! 1. Event bus and clock
//! 2. Directory (local, remote, or both)
//! 3. Indexer, reading rooms through the directory link
//! 4. Ledger gate, sharing the directory link and indexer client
//! 5. Eval buffer (local actor) or platform client
//! 6. Scorer registry and weight sink
//!
//! The evaluation loop itself is built on demand by
//! [`NodeContainer::evaluation_loop`] since running it consumes it.

pub mod config;

pub use config::{ConfigError, NodeConfig};

use p44_01_directory::{AnnouncementTemplate, DirectoryClient, RoomDirectory};
use p44_02_indexer::{IndexerClient, IndexerService};
use p44_03_ledger_gate::LedgerGate;
use p44_04_eval_buffer::{EvalBufferHandle, PlatformEvalClient};
use p44_05_evaluation_loop::{EvaluationLoop, HttpScorerClient, ScorerRegistry};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{NodeId, PeerError, SharedSecret, SystemTimeSource, TimeSource};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::adapters::{DirectoryLink, IndexerLink, MeteredScorers, RecordingSink, SampleFeed};

pub type LocalIndexer = IndexerService<DirectoryLink, IndexerLink>;
pub type LocalGate = LedgerGate<DirectoryLink, IndexerLink>;
pub type LocalEvaluation = EvaluationLoop<SampleFeed, MeteredScorers, Arc<RecordingSink>>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build {component} client: {source}")]
    Client {
        component: &'static str,
        source: PeerError,
    },
}

fn client_err(component: &'static str) -> impl FnOnce(PeerError) -> BuildError {
    move |source| BuildError::Client { component, source }
}

/// Every component of one node.
pub struct NodeContainer {
    pub config: NodeConfig,
    pub secret: SharedSecret,
    pub bus: Arc<InMemoryEventBus>,
    pub time_source: Arc<dyn TimeSource>,

    /// Hosted directory, when `directory.host` is set.
    pub directory: Option<Arc<RoomDirectory>>,
    /// Where announcements go and rooms are read from.
    pub directory_link: DirectoryLink,

    pub indexer: Option<Arc<LocalIndexer>>,
    pub gate: Option<Arc<LocalGate>>,

    /// Local buffer, when no platform URL is configured.
    pub eval_buffer: Option<EvalBufferHandle>,
    pub sample_feed: SampleFeed,

    pub scorers: Arc<ScorerRegistry>,
    pub weights: Arc<RecordingSink>,

    buffer_task: Option<JoinHandle<()>>,
}

impl NodeContainer {
    /// Build with the system clock. Must run inside a tokio runtime since
    /// the local eval buffer actor is spawned here.
    pub fn build(config: NodeConfig, shutdown: watch::Receiver<bool>) -> Result<Self, BuildError> {
        Self::build_with_clock(config, Arc::new(SystemTimeSource::new()), shutdown)
    }

    pub fn build_with_clock(
        config: NodeConfig,
        time_source: Arc<dyn TimeSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let secret = config.security.shared_secret();
        let bus = Arc::new(InMemoryEventBus::new());
        let events: Arc<dyn EventPublisher> = bus.clone();

        let directory = config.directory.host.then(|| {
            Arc::new(RoomDirectory::new(
                config.directory.to_directory_config(),
                secret.clone(),
                Arc::clone(&time_source),
                Arc::clone(&events),
            ))
        });
        let directory_link = match (&config.directory.url, &directory) {
            (Some(url), _) => DirectoryLink::Remote(
                DirectoryClient::new(url.clone(), config.directory.request_timeout())
                    .map_err(client_err("directory"))?,
            ),
            (None, Some(local)) => DirectoryLink::Local(Arc::clone(local)),
            (None, None) => {
                return Err(ConfigError::Invalid("no directory to announce to".into()).into())
            }
        };

        let peers = IndexerLink::new(
            IndexerClient::new(config.indexer.to_indexer_config(&config.identity).peer_timeout)
                .map_err(client_err("indexer"))?,
        );

        let indexer = config.indexer.enabled.then(|| {
            Arc::new(IndexerService::new(
                config.indexer.to_indexer_config(&config.identity),
                secret.clone(),
                Arc::clone(&time_source),
                directory_link.clone(),
                peers.clone(),
                Arc::clone(&events),
            ))
        });

        let gate = config.ledger.enabled.then(|| {
            Arc::new(LedgerGate::new(
                config.ledger.to_gate_config(),
                directory_link.clone(),
                peers.clone(),
                Arc::clone(&time_source),
                Arc::clone(&events),
            ))
        });

        let (eval_buffer, sample_feed, buffer_task) = match &config.eval.platform_url {
            Some(url) => {
                let client = PlatformEvalClient::new(
                    url.clone(),
                    config.security.eval_secret.clone().unwrap_or_else(|| config.security.shared_secret.clone()),
                    config.eval.platform_timeout(),
                )
                .map_err(client_err("platform"))?;
                (None, SampleFeed::Remote(client), None)
            }
            None => {
                let (handle, task) = EvalBufferHandle::spawn(
                    config.eval.buffer.clone(),
                    Arc::clone(&time_source),
                    Arc::clone(&events),
                    shutdown,
                );
                (Some(handle.clone()), SampleFeed::Local(handle), Some(task))
            }
        };

        let scorers = Arc::new(ScorerRegistry::new(config.evaluation.scorers.clone()));

        info!(
            node_id = %config.identity.node_id,
            hosts_directory = directory.is_some(),
            remote_directory = !directory_link.is_local(),
            indexer = indexer.is_some(),
            ledger = gate.is_some(),
            local_buffer = eval_buffer.is_some(),
            scorers = scorers.len(),
            "Node components built"
        );

        Ok(Self {
            config,
            secret,
            bus,
            time_source,
            directory,
            directory_link,
            indexer,
            gate,
            eval_buffer,
            sample_feed,
            scorers,
            weights: Arc::new(RecordingSink::new()),
            buffer_task,
        })
    }

    pub fn events(&self) -> Arc<dyn EventPublisher> {
        self.bus.clone()
    }

    /// What the announce loop signs on every tick.
    pub fn announcement_template(&self) -> AnnouncementTemplate {
        let identity = &self.config.identity;
        AnnouncementTemplate {
            node_id: NodeId::new(identity.node_id.clone()),
            node_name: identity.node_name.clone(),
            service_url: identity.service_url.clone(),
            read_api_url: identity
                .read_api_url
                .clone()
                .filter(|_| self.indexer.is_some()),
            room_code: identity.room_code.clone(),
            capacity: identity.capacity,
            version_hash: identity.version_hash.clone(),
        }
    }

    pub fn evaluation_loop(&self) -> Result<LocalEvaluation, BuildError> {
        let client = HttpScorerClient::new(self.config.evaluation.cycle.scorer_timeout)
            .map_err(client_err("scorer"))?;
        Ok(EvaluationLoop::new(
            self.config.evaluation.cycle.clone(),
            self.sample_feed.clone(),
            MeteredScorers(client),
            Arc::clone(&self.weights),
            Arc::clone(&self.scorers),
            self.events(),
        ))
    }

    /// The buffer actor task, for joining on shutdown.
    pub fn take_buffer_task(&mut self) -> Option<JoinHandle<()>> {
        self.buffer_task.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ControllableTimeSource;

    fn build(config: NodeConfig) -> Result<NodeContainer, BuildError> {
        let (_tx, rx) = watch::channel(false);
        NodeContainer::build_with_clock(config, Arc::new(ControllableTimeSource::new(1_000)), rx)
    }

    #[tokio::test]
    async fn test_default_node_is_self_contained() {
        let container = build(NodeConfig::default()).unwrap();
        assert!(container.directory.is_some());
        assert!(container.directory_link.is_local());
        assert!(container.indexer.is_some());
        assert!(container.gate.is_some());
        assert!(container.eval_buffer.is_some());
        assert!(matches!(container.sample_feed, SampleFeed::Local(_)));
    }

    #[tokio::test]
    async fn test_remote_endpoints_replace_local_components() {
        let mut config = NodeConfig::default();
        config.directory.host = false;
        config.directory.url = Some("http://directory.example:3001".into());
        config.eval.platform_url = Some("http://platform.example:8000".into());
        config.indexer.enabled = false;
        config.ledger.enabled = false;

        let container = build(config).unwrap();
        assert!(container.directory.is_none());
        assert!(!container.directory_link.is_local());
        assert!(container.indexer.is_none());
        assert!(container.gate.is_none());
        assert!(container.eval_buffer.is_none());
        assert!(matches!(container.sample_feed, SampleFeed::Remote(_)));
        assert_eq!(container.announcement_template().read_api_url, None);
    }

    #[tokio::test]
    async fn test_announcement_template_from_identity() {
        let mut config = NodeConfig::default();
        config.identity.node_id = "v9".into();
        config.identity.room_code = Some("ROOM9".into());
        config.identity.capacity = 4;
        let container = build(config).unwrap();

        let template = container.announcement_template();
        assert_eq!(template.node_id, NodeId::new("v9"));
        assert_eq!(template.room_code.as_deref(), Some("ROOM9"));
        assert_eq!(template.capacity, 4);
        assert_eq!(template.read_api_url.as_deref(), Some("http://127.0.0.1:3002"));
    }

    #[tokio::test]
    async fn test_missing_directory_is_rejected() {
        let mut config = NodeConfig::default();
        config.directory.host = false;
        assert!(matches!(build(config), Err(BuildError::Config(_))));
    }
}
