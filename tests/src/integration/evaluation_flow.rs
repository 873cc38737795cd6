//! # Evaluation Flow
//!
//! A local eval buffer served behind its secret, read by the evaluation
//! loop through the platform client; scorers are axum stubs.
//!
//! ```text
//! producer ──ingest──→ [eval buffer] ←──next / mark-evaluated── PlatformEvalClient
//!                                                                   │
//!                                            EvaluationLoop ────────┘
//!                                               │   POST /score
//!                                               ├──→ honest scorer
//!                                               ├──→ contrarian scorer
//!                                               └──→ closed port
//! ```

#[cfg(test)]
mod tests {
    use axum::{routing::post, Json, Router};
    use node_runtime::adapters::{MeteredScorers, RecordingSink, SampleFeed};
    use p44_04_eval_buffer::{EvalBufferConfig, EvalBufferHandle, PlatformEvalClient, SampleSource};
    use p44_05_evaluation_loop::domain::{ScoreReply, ScoreRequest};
    use p44_05_evaluation_loop::{
        CycleOutcome, EvaluationConfig, EvaluationLoop, HttpScorerClient, ScorerEndpoint,
        ScorerRegistry,
    };
    use shared_bus::{EventFilter, EventTopic, ScorerReplyStatus, ValidatorEvent};
    use shared_types::{PopulationTag, ScoreResponse, ScorerId};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;

    use crate::harness::{bus, clock, events, sample, TestServer, MESH_SECRET};

    fn is_bot_batch(batch: &[shared_types::EvalSample]) -> bool {
        batch.iter().any(|s| s.has_tag(PopulationTag::Bot))
    }

    async fn scorer(contrarian: bool) -> TestServer {
        let router = Router::new().route(
            "/score",
            post(move |Json(req): Json<ScoreRequest>| async move {
                let responses = req
                    .chunks
                    .iter()
                    .enumerate()
                    .map(|(chunk_index, batch)| {
                        let bot = is_bot_batch(batch) != contrarian;
                        ScoreResponse {
                            chunk_index,
                            risk_score: if bot { 0.9 } else { 0.1 },
                            prediction: bot,
                        }
                    })
                    .collect();
                Json(ScoreReply { responses })
            }),
        );
        TestServer::start(router).await
    }

    fn cycle_config() -> EvaluationConfig {
        EvaluationConfig {
            batches_per_chunk: 2,
            samples_per_batch: 2,
            require_mixed: true,
            collect_poll_interval: Duration::from_millis(20),
            max_wait: Duration::from_secs(3),
            poll_interval: Duration::from_millis(20),
            scorer_timeout: Duration::from_secs(2),
            ..EvaluationConfig::default()
        }
    }

    struct Platform {
        handle: EvalBufferHandle,
        server: TestServer,
        _stop: watch::Sender<bool>,
    }

    async fn platform() -> Platform {
        let (stop, shutdown) = watch::channel(false);
        let (handle, _task) = EvalBufferHandle::spawn(
            EvalBufferConfig::default(),
            clock(),
            events(&bus()),
            shutdown,
        );
        let router = p44_04_eval_buffer::adapters::router(handle.clone(), MESH_SECRET.into());
        let server = TestServer::start(router).await;
        Platform {
            handle,
            server,
            _stop: stop,
        }
    }

    fn client(platform: &Platform, secret: &str) -> PlatformEvalClient {
        PlatformEvalClient::new(platform.server.url(), secret, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_cycle_rewards_honest_scorer_over_contrarian() {
        let platform = platform().await;
        let producer = client(&platform, MESH_SECRET);
        let accepted = producer
            .ingest(vec![
                sample("h1", PopulationTag::Human),
                sample("b1", PopulationTag::Bot),
                sample("h2", PopulationTag::Human),
                sample("b2", PopulationTag::Bot),
            ])
            .await
            .unwrap();
        assert_eq!(accepted, 4);

        let honest = scorer(false).await;
        let contrarian = scorer(true).await;
        let registry = Arc::new(ScorerRegistry::new(vec![
            ScorerEndpoint {
                id: ScorerId::from("honest"),
                endpoint: honest.url(),
                serving: true,
            },
            ScorerEndpoint {
                id: ScorerId::from("contrarian"),
                endpoint: contrarian.url(),
                serving: true,
            },
            ScorerEndpoint {
                id: ScorerId::from("gone"),
                endpoint: "http://127.0.0.1:9".into(),
                serving: true,
            },
        ]));

        let bus = bus();
        let mut replies = bus.subscribe(EventFilter::topics(vec![EventTopic::Evaluation]));
        let sink = Arc::new(RecordingSink::new());
        let mut evaluation = EvaluationLoop::new(
            cycle_config(),
            SampleFeed::Remote(client(&platform, MESH_SECRET)),
            MeteredScorers(HttpScorerClient::new(Duration::from_secs(2)).unwrap()),
            Arc::clone(&sink),
            registry,
            events(&bus),
        )
        .with_seed(7);

        let outcome = evaluation.run_cycle().await.unwrap();
        let CycleOutcome::Rewarded {
            rewards, degraded, ..
        } = outcome
        else {
            panic!("expected a rewarded cycle, got {outcome:?}");
        };
        assert!(!degraded);
        assert_eq!(rewards.len(), 2, "unreachable scorer gets no entry");
        assert!(rewards[&ScorerId::from("honest")] > rewards[&ScorerId::from("contrarian")]);
        assert_eq!(sink.latest(), Some(rewards));

        // Every sample was consumed once and marked evaluated.
        let stats = platform.handle.stats().await.unwrap();
        assert_eq!(stats.unconsumed, 0);
        assert_eq!(stats.evaluated, 4);
        assert!(!stats.poisoned);

        let mut statuses = Vec::new();
        while let Ok(Some(event)) = replies.try_recv() {
            if let ValidatorEvent::ScorerReplied { scorer, status } = event {
                statuses.push((scorer.0, status));
            }
        }
        statuses.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            statuses,
            vec![
                ("contrarian".to_string(), ScorerReplyStatus::Valid),
                ("gone".to_string(), ScorerReplyStatus::Unreachable),
                ("honest".to_string(), ScorerReplyStatus::Valid),
            ]
        );
    }

    #[tokio::test]
    async fn test_samples_are_handed_out_once() {
        let platform = platform().await;
        let feed = SampleFeed::Remote(client(&platform, MESH_SECRET));
        platform
            .handle
            .ingest(vec![
                sample("h1", PopulationTag::Human),
                sample("b1", PopulationTag::Bot),
            ])
            .await
            .unwrap();

        let first = feed.reserve_batch(10, false).await.unwrap();
        assert_eq!(first.samples.len(), 2);
        let second = feed.reserve_batch(10, false).await.unwrap();
        assert!(second.samples.is_empty());

        // Re-ingesting a consumed sample is refused.
        assert!(platform
            .handle
            .ingest(vec![sample("h1", PopulationTag::Human)])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_wrong_secret_is_refused() {
        let platform = platform().await;
        let intruder = SampleFeed::Remote(client(&platform, "guessed-secret"));
        let err = intruder.reserve_batch(5, false).await.unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_background_loop_burns_without_scorers_replying() {
        let platform = platform().await;
        platform
            .handle
            .ingest(vec![
                sample("h1", PopulationTag::Human),
                sample("h2", PopulationTag::Human),
                sample("b1", PopulationTag::Bot),
                sample("b2", PopulationTag::Bot),
            ])
            .await
            .unwrap();

        let registry = Arc::new(ScorerRegistry::new(vec![ScorerEndpoint {
            id: ScorerId::from("gone"),
            endpoint: "http://127.0.0.1:9".into(),
            serving: true,
        }]));
        let sink = Arc::new(RecordingSink::new());
        let evaluation = EvaluationLoop::new(
            cycle_config(),
            SampleFeed::Local(platform.handle.clone()),
            MeteredScorers(HttpScorerClient::new(Duration::from_secs(1)).unwrap()),
            Arc::clone(&sink),
            registry,
            events(&bus()),
        );

        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(evaluation.run(shutdown));
        for _ in 0..100 {
            if sink.submitted() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        stop.send(true).unwrap();
        task.await.unwrap().unwrap();

        let burned = sink.latest().unwrap();
        assert_eq!(burned.len(), 1);
        assert!(burned.contains_key(&ScorerId::from("0")));
    }
}
