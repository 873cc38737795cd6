//! Start a whole node on loopback ports and talk to it over HTTP.

use node_runtime::{NodeConfig, NodeRuntime};
use std::time::Duration;

fn loopback_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.identity.node_id = "v-smoke".into();
    config.identity.node_name = "smoke".into();
    config.security.shared_secret = "smoke-test-shared-secret".into();
    config.network.bind_host = "127.0.0.1".into();
    config.network.directory_port = 0;
    config.network.indexer_port = 0;
    config.network.service_port = 0;
    config.network.status_port = 0;
    config
}

#[tokio::test]
async fn test_node_serves_status_and_announces_itself() {
    let node = NodeRuntime::new(loopback_config()).start().await.unwrap();
    let addrs = node.addrs().clone();
    let http = reqwest::Client::new();

    let health: serde_json::Value = http
        .get(format!("http://{}/healthz", addrs.status.unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["node_id"], "v-smoke");

    // The announce loop fires on start.
    let directory = addrs.directory.unwrap();
    let mut rooms = serde_json::Value::Null;
    for _ in 0..50 {
        rooms = http
            .get(format!("http://{directory}/rooms"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if rooms["rooms"].as_array().is_some_and(|r| !r.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(rooms["rooms"][0]["node_id"], "v-smoke");

    let metrics = http
        .get(format!("http://{}/metrics", addrs.status.unwrap()))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains("p44_eval_samples_reserved_total"));

    let weights: serde_json::Value = http
        .get(format!("http://{}/weights/latest", addrs.status.unwrap()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(weights["submitted"], 0);

    node.shutdown().await;
}

#[tokio::test]
async fn test_service_listener_serves_ledger_and_eval() {
    let node = NodeRuntime::new(loopback_config()).start().await.unwrap();
    let service = node.addrs().service.unwrap();
    let http = reqwest::Client::new();

    let balance = http
        .get(format!("http://{service}/ledger/balances/nobody"))
        .send()
        .await
        .unwrap();
    assert!(balance.status().is_success());

    // Eval API requires the secret header.
    let stats = http
        .get(format!("http://{service}/internal/eval/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(stats.status().as_u16(), 401);

    let stats = http
        .get(format!("http://{service}/internal/eval/stats"))
        .header(p44_04_eval_buffer::adapters::EVAL_SECRET_HEADER, "smoke-test-shared-secret")
        .send()
        .await
        .unwrap();
    assert!(stats.status().is_success());

    node.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_requested_resolves_after_shutdown() {
    let node = NodeRuntime::new(loopback_config()).start().await.unwrap();
    let requested = node.shutdown_requested();
    node.shutdown().await;
    tokio::time::timeout(Duration::from_secs(1), requested)
        .await
        .unwrap();
}
