//! Loopback servers and fixtures shared by the integration flows.

use axum::Router;
use p44_01_directory::{AnnouncementTemplate, DirectoryClient, DirectoryConfig, RoomDirectory};
use shared_bus::{EventPublisher, InMemoryEventBus};
use shared_types::{
    EvalSample, NodeId, PopulationTag, RoomAnnouncement, SharedSecret, SystemTimeSource,
    TimeSource, Timestamp,
};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const MESH_SECRET: &str = "integration-mesh-secret";

pub fn secret() -> SharedSecret {
    SharedSecret::from(MESH_SECRET)
}

pub fn clock() -> Arc<dyn TimeSource> {
    Arc::new(SystemTimeSource::new())
}

pub fn bus() -> Arc<InMemoryEventBus> {
    Arc::new(InMemoryEventBus::new())
}

pub fn events(bus: &Arc<InMemoryEventBus>) -> Arc<dyn EventPublisher> {
    bus.clone()
}

/// A router served on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { addr, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A hosted room directory and a client for it.
pub struct TestDirectory {
    pub directory: Arc<RoomDirectory>,
    pub server: TestServer,
    pub client: DirectoryClient,
}

impl TestDirectory {
    pub async fn start(config: DirectoryConfig) -> Self {
        let directory = Arc::new(RoomDirectory::new(
            config,
            secret(),
            clock(),
            events(&bus()),
        ));
        let api: p44_01_directory::adapters::http::DirectoryState = directory.clone();
        let server = TestServer::start(p44_01_directory::adapters::router(api)).await;
        let client = DirectoryClient::new(server.url(), Duration::from_secs(2)).unwrap();
        Self {
            directory,
            server,
            client,
        }
    }

    pub async fn announce(&self, template: &AnnouncementTemplate) -> RoomAnnouncement {
        let ann = template.build(clock().now(), &secret()).unwrap();
        self.client.announce(&ann).await.unwrap();
        ann
    }
}

pub fn template(node_id: &str, read_api_url: Option<String>) -> AnnouncementTemplate {
    AnnouncementTemplate {
        node_id: NodeId::new(node_id),
        node_name: format!("{node_id}-name"),
        service_url: format!("http://{node_id}.mesh.test:3003"),
        read_api_url,
        room_code: None,
        capacity: 1,
        version_hash: "integration".into(),
    }
}

pub fn sample(id: &str, tag: PopulationTag) -> EvalSample {
    EvalSample {
        sample_id: id.to_string(),
        population_tags: BTreeSet::from([tag]),
        sanitized_event_sequence: Vec::new(),
        timing_features: BTreeMap::new(),
        context_metadata: BTreeMap::new(),
        created_at: Timestamp::new(1),
    }
}
