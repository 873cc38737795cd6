//! Ledger gate service.
//!
//! `execute` holds the subject's lock from the first indexer query until the
//! mutation is applied, so two actions for one subject never interleave
//! their check and their write. Different subjects proceed in parallel.

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use shared_bus::{EventPublisher, ValidatorEvent};
use shared_types::{NodeId, RoomAnnouncement, TimeSource};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GateConfig;
use crate::domain::{
    evaluate_replies, Bankroll, CustodyAction, GateDecision, IndexerReply, Receipt,
};
use crate::error::GateResult;
use crate::ports::{AttestationQuery, IndexerDiscovery, LedgerGateApi};

pub struct LedgerGate<D, Q>
where
    D: IndexerDiscovery,
    Q: AttestationQuery,
{
    config: GateConfig,
    discovery: D,
    query: Q,
    bankroll: Bankroll,
    subject_locks: DashMap<NodeId, Arc<Mutex<()>>>,
    time_source: Arc<dyn TimeSource>,
    events: Arc<dyn EventPublisher>,
}

impl<D, Q> LedgerGate<D, Q>
where
    D: IndexerDiscovery,
    Q: AttestationQuery,
{
    pub fn new(
        config: GateConfig,
        discovery: D,
        query: Q,
        time_source: Arc<dyn TimeSource>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let bankroll = Bankroll::with_balances(&config.opening_balances);
        Self {
            config,
            discovery,
            query,
            bankroll,
            subject_locks: DashMap::new(),
            time_source,
            events,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Subjects with an action in flight or waiting.
    pub fn tracked_subjects(&self) -> usize {
        self.subject_locks.len()
    }

    fn lock_for(&self, subject: &NodeId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.subject_locks
                .entry(subject.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Live indexers other than the subject, by node id, capped at fanout.
    async fn indexers_for(&self, subject: &NodeId) -> Vec<RoomAnnouncement> {
        let rooms = match self.discovery.live_rooms().await {
            Ok(rooms) => rooms,
            Err(err) => {
                warn!(subject = %subject, error = %err, "Indexer discovery failed");
                return Vec::new();
            }
        };
        let mut indexers: Vec<RoomAnnouncement> = rooms
            .into_iter()
            .filter(|r| r.read_api_url.is_some() && &r.node_id != subject)
            .collect();
        indexers.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        indexers.truncate(self.config.max_fanout);
        indexers
    }

    async fn ask(&self, indexer: &RoomAnnouncement, subject: &NodeId) -> IndexerReply {
        let url = indexer.read_api_url.as_deref().unwrap_or_default();
        let state = match tokio::time::timeout(
            self.config.indexer_timeout,
            self.query.status(url, subject),
        )
        .await
        {
            Ok(Ok(status)) if &status.node_id == subject => Some(status.trust_state()),
            Ok(Ok(status)) => {
                warn!(indexer = %indexer.node_id, answered = %status.node_id, "Status for wrong subject");
                None
            }
            Ok(Err(err)) => {
                warn!(indexer = %indexer.node_id, error = %err, "Indexer unreachable");
                None
            }
            Err(_) => {
                warn!(indexer = %indexer.node_id, "Indexer status timed out");
                None
            }
        };
        IndexerReply {
            indexer: indexer.node_id.clone(),
            state,
        }
    }

    /// Drop the subject's lock once no caller holds or awaits it. Callers
    /// clone under the same shard lock, so the count cannot race upward.
    fn release(&self, subject: &NodeId, lock: Arc<Mutex<()>>) {
        drop(lock);
        self.subject_locks
            .remove_if(subject, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn decide(&self, subject: &NodeId, action: CustodyAction) -> GateResult<GateDecision> {
        let indexers = self.indexers_for(subject).await;
        let replies = join_all(indexers.iter().map(|ix| self.ask(ix, subject))).await;

        let decision = match evaluate_replies(&replies, self.config.min_indexers) {
            Err(reason) => {
                warn!(subject = %subject, ?reason, "Custody action denied");
                GateDecision::Denied(reason)
            }
            Ok(attested_by) => {
                let balance_after = match self.bankroll.apply(&action) {
                    Ok(balance) => balance,
                    Err(err) => {
                        warn!(subject = %subject, error = %err, "Custody action rejected by ledger");
                        return Err(err);
                    }
                };
                info!(
                    subject = %subject,
                    account = action.account(),
                    amount = action.amount(),
                    balance_after,
                    "Custody action applied"
                );
                GateDecision::Allowed(Receipt {
                    receipt_id: Uuid::new_v4().to_string(),
                    subject: subject.clone(),
                    action,
                    balance_after,
                    attested_by,
                    decided_at: self.time_source.now(),
                })
            }
        };

        self.record(subject, &decision).await;
        Ok(decision)
    }

    async fn record(&self, subject: &NodeId, decision: &GateDecision) {
        let reason = match decision {
            GateDecision::Allowed(_) => None,
            GateDecision::Denied(reason) => Some(reason.as_str().to_string()),
        };
        self.events
            .publish(ValidatorEvent::GateDecided {
                subject: subject.clone(),
                allowed: decision.is_allowed(),
                reason,
            })
            .await;
    }
}

#[async_trait]
impl<D, Q> LedgerGateApi for LedgerGate<D, Q>
where
    D: IndexerDiscovery,
    Q: AttestationQuery,
{
    async fn execute(&self, subject: &NodeId, action: CustodyAction) -> GateResult<GateDecision> {
        let lock = self.lock_for(subject);
        let result = {
            let _guard = lock.lock().await;
            self.decide(subject, action).await
        };
        self.release(subject, lock);
        result
    }

    fn balance(&self, account: &str) -> u64 {
        self.bankroll.balance(account)
    }
}
