//! # Attestation Mesh Flow
//!
//! A hosted directory, three indexers and a ledger gate, all over loopback
//! HTTP:
//!
//! 1. Each indexer serves its read API and announces itself.
//! 2. Each indexer polls once: fetch every peer's bundle, vote.
//! 3. The gate asks every live indexer except the subject for the subject's
//!    status and decides.
//!
//! `v3` runs with its trust flag off, so its peers vote it unattested.

#[cfg(test)]
mod tests {
    use axum::{routing::get, Router};
    use node_runtime::adapters::{DirectoryLink, IndexerLink};
    use node_runtime::container::{LocalGate, LocalIndexer};
    use p44_01_directory::DirectoryConfig;
    use p44_02_indexer::{DirectoryState, IndexerClient, IndexerConfig, IndexerService};
    use p44_03_ledger_gate::adapters::http::{ActionReply, ActionRequest};
    use p44_03_ledger_gate::{CustodyAction, DenyReason, GateConfig, LedgerGate};
    use shared_types::{NodeId, TrustState, UnattestedReason};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::harness::{bus, clock, events, secret, template, TestDirectory, TestServer};

    const GATE_TIMEOUT: Duration = Duration::from_millis(500);

    struct TestIndexer {
        node_id: NodeId,
        service: Arc<LocalIndexer>,
        server: TestServer,
    }

    struct Mesh {
        directory: TestDirectory,
        indexers: Vec<TestIndexer>,
        /// Keeps the unresponsive indexer alive.
        slow: Option<TestServer>,
    }

    fn peers() -> IndexerLink {
        IndexerLink::new(IndexerClient::new(Duration::from_secs(2)).unwrap())
    }

    async fn start_indexer(directory: &TestDirectory, node_id: &str, trust_flag: bool) -> TestIndexer {
        let config = IndexerConfig {
            trust_flag,
            epoch_seconds: 3_600,
            peer_timeout: Duration::from_millis(300),
            ..IndexerConfig::new(NodeId::new(node_id), node_id)
        };
        let service = Arc::new(IndexerService::new(
            config,
            secret(),
            clock(),
            DirectoryLink::Remote(directory.client.clone()),
            peers(),
            events(&bus()),
        ));
        let api: p44_02_indexer::adapters::http::IndexerState = service.clone();
        let server = TestServer::start(p44_02_indexer::adapters::router(api)).await;
        directory
            .announce(&template(node_id, Some(server.url())))
            .await;
        TestIndexer {
            node_id: NodeId::new(node_id),
            service,
            server,
        }
    }

    /// An indexer that accepts connections and never answers in time.
    async fn start_slow_indexer(directory: &TestDirectory) -> TestServer {
        async fn hang() -> &'static str {
            tokio::time::sleep(Duration::from_secs(10)).await;
            "too late"
        }
        let router = Router::new()
            .route("/attestation/bundle", get(hang))
            .route("/attestation/votes", get(hang))
            .route("/attestation/status/:node_id", get(hang));
        let server = TestServer::start(router).await;
        directory
            .announce(&template("v9-slow", Some(server.url())))
            .await;
        server
    }

    async fn mesh(with_slow: bool) -> Mesh {
        let directory = TestDirectory::start(DirectoryConfig::default()).await;
        let mut indexers = Vec::new();
        for (id, trust) in [("v1", true), ("v2", true), ("v3", false)] {
            indexers.push(start_indexer(&directory, id, trust).await);
        }
        let slow = if with_slow {
            Some(start_slow_indexer(&directory).await)
        } else {
            None
        };
        for indexer in &indexers {
            indexer.service.poll_once().await.unwrap();
        }
        Mesh {
            directory,
            indexers,
            slow,
        }
    }

    async fn gate_server(mesh: &Mesh, min_indexers: usize) -> TestServer {
        let gate: Arc<LocalGate> = Arc::new(LedgerGate::new(
            GateConfig::new(min_indexers, 8, GATE_TIMEOUT),
            DirectoryLink::Remote(mesh.directory.client.clone()),
            peers(),
            clock(),
            events(&bus()),
        ));
        let api: p44_03_ledger_gate::adapters::http::GateState = gate;
        TestServer::start(p44_03_ledger_gate::adapters::router(api)).await
    }

    async fn credit(gate: &TestServer, subject: &str) -> ActionReply {
        reqwest::Client::new()
            .post(format!("{}/ledger/actions", gate.url()))
            .json(&ActionRequest {
                subject_node_id: NodeId::new(subject),
                action: CustodyAction::Credit {
                    account: format!("{subject}-bankroll"),
                    amount: 100,
                },
            })
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_peers_vote_on_each_others_bundles() {
        let mesh = mesh(false).await;
        let v2 = &mesh.indexers[1];

        let state: DirectoryState = reqwest::get(format!("{}/directory/state", v2.server.url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(state.validators.len(), 3);
        let find = |id: &str| {
            state
                .validators
                .iter()
                .find(|v| v.node_id == NodeId::new(id))
                .unwrap()
        };
        // Two other voters each, majority of three voters is two.
        assert_eq!(find("v1").trust, TrustState::Attested);
        assert_eq!(find("v1").votes_pass, 2);
        assert_eq!(find("v1").quorum, 2);
        assert_eq!(
            find("v3").trust,
            TrustState::Unattested(UnattestedReason::EnvironmentIntegrityDisabled)
        );
        assert_eq!(find("v3").votes_fail, 2);
        // Attested validators are listed first.
        assert!(state.validators[0].trust.is_attested());
        assert!(state.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_gate_allows_attested_subject() {
        let mesh = mesh(false).await;
        let gate = gate_server(&mesh, 2).await;

        let reply = credit(&gate, "v1").await;
        assert!(reply.allowed, "{reply:?}");
        let receipt = reply.receipt.unwrap();
        assert_eq!(receipt.balance_after, 100);
        assert_eq!(
            receipt.attested_by,
            vec![NodeId::new("v2"), NodeId::new("v3")]
        );
    }

    #[tokio::test]
    async fn test_gate_tolerates_one_timed_out_indexer() {
        let mesh = mesh(true).await;
        assert!(mesh.slow.is_some());
        let gate = gate_server(&mesh, 2).await;

        let started = std::time::Instant::now();
        let reply = credit(&gate, "v1").await;
        assert!(reply.allowed, "{reply:?}");
        assert_eq!(
            reply.receipt.unwrap().attested_by,
            vec![NodeId::new("v2"), NodeId::new("v3")]
        );
        // Bounded by the per-indexer deadline, not the slow peer.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_gate_denies_when_a_responder_reports_unattested() {
        let mesh = mesh(true).await;
        let gate = gate_server(&mesh, 2).await;

        let reply = credit(&gate, "v3").await;
        assert!(!reply.allowed);
        assert!(reply.receipt.is_none());
        assert!(matches!(
            reply.denial,
            Some(DenyReason::NotAttested {
                reason: UnattestedReason::EnvironmentIntegrityDisabled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_gate_denies_below_quorum() {
        let mesh = mesh(true).await;
        let gate = gate_server(&mesh, 3).await;

        let reply = credit(&gate, "v1").await;
        assert!(!reply.allowed);
        assert_eq!(
            reply.denial,
            Some(DenyReason::InsufficientQuorum {
                reachable: 2,
                required: 3,
            })
        );

        let balance: serde_json::Value =
            reqwest::get(format!("{}/ledger/balances/v1-bankroll", gate.url()))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(balance["balance"], 0);
    }

    #[tokio::test]
    async fn test_unknown_subject_is_never_attested() {
        let mesh = mesh(false).await;
        let gate = gate_server(&mesh, 2).await;

        let reply = credit(&gate, "v404").await;
        assert!(!reply.allowed);
        assert!(matches!(
            reply.denial,
            Some(DenyReason::NotAttested {
                reason: UnattestedReason::NoBundle,
                ..
            })
        ));
        assert_eq!(mesh.indexers.len(), 3);
    }
}
