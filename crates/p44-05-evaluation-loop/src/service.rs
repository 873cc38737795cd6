//! The evaluation cycle.
//!
//! One cycle: collect samples into batches until N are pending, dispatch one
//! chunk to the selected scorers, turn valid replies into rewards, submit
//! them, idle, then mark the chunk's samples evaluated. Batches that were
//! not dispatched stay pending for the next cycle.

use futures::future::join_all;
use p44_04_eval_buffer::SampleSource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_bus::{CycleOutcomeKind, EventPublisher, ScorerReplyStatus, ValidatorEvent};
use shared_types::{PeerError, RewardVector, ScoreResponse, ScorerId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EvaluationConfig;
use crate::domain::{
    validate_reply, BatchStager, CycleOutcome, CyclePhase, EvalChunk, RewardBreakdown,
    RewardFormula, RollingWindows, ScoreRequest, ScoredOutcome, ScorerEndpoint, ScorerRegistry,
};
use crate::error::{EvaluationError, EvaluationResult};
use crate::ports::{ScorerClient, WeightSink};

pub struct EvaluationLoop<S, C, W>
where
    S: SampleSource,
    C: ScorerClient,
    W: WeightSink,
{
    config: EvaluationConfig,
    source: S,
    scorers: C,
    sink: W,
    registry: Arc<ScorerRegistry>,
    stager: BatchStager,
    windows: RollingWindows,
    formula: RewardFormula,
    metrics: BTreeMap<ScorerId, RewardBreakdown>,
    phase: CyclePhase,
    rng: StdRng,
    events: Arc<dyn EventPublisher>,
}

impl<S, C, W> EvaluationLoop<S, C, W>
where
    S: SampleSource,
    C: ScorerClient,
    W: WeightSink,
{
    pub fn new(
        config: EvaluationConfig,
        source: S,
        scorers: C,
        sink: W,
        registry: Arc<ScorerRegistry>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        let stager = BatchStager::new(config.samples_per_batch());
        let windows = RollingWindows::new(config.reward_window());
        let formula = RewardFormula::new(config.reward.clone());
        Self {
            config,
            source,
            scorers,
            sink,
            registry,
            stager,
            windows,
            formula,
            metrics: BTreeMap::new(),
            phase: CyclePhase::Idle,
            rng: StdRng::from_entropy(),
            events,
        }
    }

    /// Seed scorer sampling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<ScorerRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Per-scorer metrics from the last rewarded cycle. Scorers whose
    /// window was not yet full have no entry.
    pub fn last_metrics(&self) -> &BTreeMap<ScorerId, RewardBreakdown> {
        &self.metrics
    }

    /// Full batches carried over to the next cycle.
    pub fn pending_batches(&self) -> usize {
        self.stager.pending_len()
    }

    async fn enter(&mut self, phase: CyclePhase, cycle_id: &str) {
        debug!(cycle_id, from = %self.phase, to = %phase, "Cycle phase");
        self.phase = phase;
        self.events
            .publish(ValidatorEvent::CycleAdvanced {
                cycle_id: cycle_id.to_string(),
                phase: phase.to_string(),
            })
            .await;
    }

    /// Run cycles until shutdown or a fatal error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> EvaluationResult<()> {
        info!(
            batches_per_chunk = self.config.batches_per_chunk(),
            require_mixed = self.config.require_mixed,
            scorers = self.registry.len(),
            "Evaluation loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                result = self.run_cycle() => match result {
                    Ok(_) => {}
                    Err(err) if err.is_fatal() => {
                        error!(error = %err, "Evaluation loop stopped");
                        self.events
                            .publish(ValidatorEvent::CriticalError {
                                component: "evaluation".into(),
                                error: err.to_string(),
                            })
                            .await;
                        return Err(err);
                    }
                    Err(err) => warn!(error = %err, "Evaluation cycle failed"),
                },
            }
        }
        info!("Evaluation loop stopped");
        Ok(())
    }

    /// Run one cycle to completion, including the idle sleep.
    pub async fn run_cycle(&mut self) -> EvaluationResult<CycleOutcome> {
        let cycle_id = Uuid::new_v4().to_string();
        let n = self.config.batches_per_chunk();

        self.enter(CyclePhase::Collecting, &cycle_id).await;
        let (chunk, degraded) = match self.collect(n).await? {
            Some(chunk) => (chunk, false),
            None => {
                let (flushed, chunk) = self.stager.take_degraded_chunk(n);
                match chunk {
                    Some(chunk) => {
                        warn!(cycle_id = %cycle_id, flushed, "Max wait elapsed, dispatching degraded chunk");
                        (chunk, true)
                    }
                    None => {
                        let pending_batches = self.stager.pending_len();
                        warn!(cycle_id = %cycle_id, pending_batches, needed = n, "Max wait elapsed, no reward this cycle");
                        self.idle(&cycle_id, None).await?;
                        self.complete(&cycle_id, CycleOutcomeKind::Degraded, 0, true).await;
                        return Ok(CycleOutcome::Degraded {
                            cycle_id,
                            pending_batches,
                        });
                    }
                }
            }
        };

        // Batches restored from an earlier degraded dispatch may be short.
        let degraded = degraded || chunk.has_short_batch(self.stager.samples_per_batch());

        self.enter(CyclePhase::Dispatching, &cycle_id).await;
        let selected = self.registry.select(
            &self.config.explicit_scorers,
            self.config.sample_size(),
            &mut self.rng,
        );
        if selected.is_empty() {
            warn!(cycle_id = %cycle_id, "No scorers selected, keeping chunk pending");
            let batches = chunk.len();
            self.stager.restore(chunk);
            self.idle(&cycle_id, None).await?;
            self.complete(&cycle_id, CycleOutcomeKind::NoScorers, batches, degraded)
                .await;
            return Ok(CycleOutcome::NoScorers { cycle_id });
        }

        self.enter(CyclePhase::Scoring, &cycle_id).await;
        let request = ScoreRequest {
            cycle_id: cycle_id.clone(),
            chunks: chunk.batches.iter().map(|b| b.samples.clone()).collect(),
        };
        let replies = join_all(selected.iter().map(|s| self.ask(s, &request, n))).await;

        self.enter(CyclePhase::Rewarding, &cycle_id).await;
        let (rewards, burned) = self.reward(&chunk, replies);
        let submitted = self.sink.submit(rewards.clone()).await;
        if let Err(err) = &submitted {
            warn!(cycle_id = %cycle_id, error = %err, "Weight sink rejected rewards");
        }

        self.idle(&cycle_id, Some(&chunk)).await?;
        let kind = if burned {
            CycleOutcomeKind::Burned
        } else {
            CycleOutcomeKind::Rewarded
        };
        self.complete(&cycle_id, kind, chunk.len(), degraded).await;
        submitted?;

        info!(cycle_id = %cycle_id, scorers = rewards.len(), burned, degraded, "Cycle rewarded");
        Ok(if burned {
            CycleOutcome::Burned {
                cycle_id,
                rewards,
                degraded,
            }
        } else {
            CycleOutcome::Rewarded {
                cycle_id,
                rewards,
                degraded,
            }
        })
    }

    /// Reserve and stage until a chunk is ready or `max_wait` elapses.
    async fn collect(&mut self, n: usize) -> EvaluationResult<Option<EvalChunk>> {
        let require_mixed = self.config.require_mixed;
        let deadline = Instant::now() + self.config.max_wait;
        loop {
            if let Some(chunk) = self.stager.take_chunk(n, require_mixed) {
                return Ok(Some(chunk));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let wanted = self.stager.samples_wanted(n, require_mixed);
            let reserved = match self.source.reserve_batch(wanted, require_mixed).await {
                Ok(reservation) => {
                    let count = reservation.len();
                    self.stager.stage(reservation.samples);
                    count
                }
                Err(err) if err.is_fatal() => return Err(EvaluationError::Source(err)),
                Err(err) => {
                    warn!(error = %err, "Sample reservation failed");
                    0
                }
            };
            if reserved == 0 {
                let wait = self
                    .config
                    .collect_poll_interval
                    .min(deadline.saturating_duration_since(now));
                tokio::time::sleep(wait).await;
            }
        }
    }

    async fn ask(
        &self,
        scorer: &ScorerEndpoint,
        request: &ScoreRequest,
        n: usize,
    ) -> (ScorerId, Option<Vec<ScoreResponse>>) {
        let result = tokio::time::timeout(self.config.scorer_timeout, self.scorers.score(scorer, request)).await;
        let (status, responses) = match result {
            Ok(Ok(reply)) => match validate_reply(&reply, n) {
                Ok(responses) => (ScorerReplyStatus::Valid, Some(responses)),
                Err(reason) => {
                    warn!(scorer = %scorer.id, reason = %reason, "Malformed scorer reply");
                    (ScorerReplyStatus::Malformed, None)
                }
            },
            Ok(Err(PeerError::Timeout { .. })) | Err(_) => {
                warn!(scorer = %scorer.id, "Scorer timed out");
                (ScorerReplyStatus::Timeout, None)
            }
            Ok(Err(err)) => {
                warn!(scorer = %scorer.id, error = %err, "Scorer unreachable");
                (ScorerReplyStatus::Unreachable, None)
            }
        };
        self.events
            .publish(ValidatorEvent::ScorerReplied {
                scorer: scorer.id.clone(),
                status,
            })
            .await;
        (scorer.id.clone(), responses)
    }

    /// Rewards for the valid replies, or the burn vector when there are none.
    fn reward(
        &mut self,
        chunk: &EvalChunk,
        replies: Vec<(ScorerId, Option<Vec<ScoreResponse>>)>,
    ) -> (RewardVector, bool) {
        let labels: Vec<bool> = chunk.batches.iter().map(|b| b.hand_type.is_bot()).collect();
        let mut rewards = RewardVector::new();
        self.metrics.clear();
        for (scorer, responses) in replies {
            let Some(responses) = responses else {
                continue;
            };
            let outcomes = responses.iter().zip(&labels).map(|(r, &is_bot)| ScoredOutcome {
                risk_score: r.risk_score,
                predicted_bot: r.prediction,
                is_bot,
            });
            self.windows.push(&scorer, outcomes);
            let reward = match self.windows.full_window(&scorer) {
                Some(window) => {
                    let breakdown = self.formula.evaluate(&window);
                    info!(
                        scorer = %scorer,
                        f1 = breakdown.f1,
                        ap = breakdown.ap,
                        fp_score = breakdown.fp_score,
                        fn_score = breakdown.fn_score,
                        reward = breakdown.reward,
                        "Scorer evaluated"
                    );
                    self.metrics.insert(scorer.clone(), breakdown);
                    breakdown.reward
                }
                None => {
                    debug!(
                        scorer = %scorer,
                        have = self.windows.len_of(&scorer),
                        need = self.windows.capacity(),
                        "Window not full"
                    );
                    0.0
                }
            };
            rewards.insert(scorer, reward);
        }

        if rewards.is_empty() {
            warn!("No valid scorer replies, burning");
            (self.config.burn.burn_only(), true)
        } else {
            (self.config.burn.apply(rewards), false)
        }
    }

    async fn idle(&mut self, cycle_id: &str, dispatched: Option<&EvalChunk>) -> EvaluationResult<()> {
        self.enter(CyclePhase::Idle, cycle_id).await;
        tokio::time::sleep(self.config.poll_interval).await;
        let Some(chunk) = dispatched else {
            return Ok(());
        };
        match self.source.mark_evaluated(chunk.sample_ids()).await {
            Ok(marked) => {
                debug!(cycle_id, marked, "Samples marked evaluated");
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(EvaluationError::Source(err)),
            Err(err) => {
                warn!(cycle_id, error = %err, "Mark evaluated failed");
                Ok(())
            }
        }
    }

    async fn complete(&self, cycle_id: &str, outcome: CycleOutcomeKind, batches: usize, degraded: bool) {
        self.events
            .publish(ValidatorEvent::CycleCompleted {
                cycle_id: cycle_id.to_string(),
                outcome,
                batches,
                degraded,
            })
            .await;
    }
}
