//! Prometheus metrics for a validator node.
//!
//! Naming: `p44_<component>_<metric>_<unit>`. Most series are fed from
//! [`ValidatorEvent`]s by [`record_event`]; peer call latency and failures
//! are recorded by the transport adapters directly.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use shared_bus::{CycleOutcomeKind, ValidatorEvent};

use crate::TelemetryError;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // DIRECTORY
    // =========================================================================

    pub static ref ANNOUNCEMENTS: CounterVec = CounterVec::new(
        Opts::new("p44_directory_announcements_total", "Room announcements by outcome"),
        &["outcome"]  // accepted/rejected
    ).expect("metric creation failed");

    pub static ref LIVE_ROOMS: Gauge = Gauge::new(
        "p44_directory_live_rooms",
        "Rooms inside the TTL at the last listing or sweep"
    ).expect("metric creation failed");

    pub static ref ROOMS_EVICTED: Counter = Counter::new(
        "p44_directory_rooms_evicted_total",
        "Rooms dropped after their TTL"
    ).expect("metric creation failed");

    // =========================================================================
    // INDEXER
    // =========================================================================

    pub static ref VOTES: CounterVec = CounterVec::new(
        Opts::new("p44_indexer_votes_total", "Votes cast by this indexer"),
        &["verdict"]  // attested/unattested/unreachable
    ).expect("metric creation failed");

    pub static ref VOTE_EPOCH: Gauge = Gauge::new(
        "p44_indexer_epoch",
        "Epoch of the latest vote round"
    ).expect("metric creation failed");

    // =========================================================================
    // PEERS
    // =========================================================================

    pub static ref PEER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("p44_peer_fetch_failures_total", "Failed calls to other nodes"),
        &["target", "kind"]  // target: directory/indexer/scorer/platform
    ).expect("metric creation failed");

    pub static ref PEER_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "p44_peer_request_duration_seconds",
            "Latency of calls to other nodes"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),
        &["target"]
    ).expect("metric creation failed");

    // =========================================================================
    // LEDGER GATE
    // =========================================================================

    pub static ref GATE_DECISIONS: CounterVec = CounterVec::new(
        Opts::new("p44_gate_decisions_total", "Custody decisions"),
        &["outcome", "reason"]  // outcome: allowed/denied
    ).expect("metric creation failed");

    // =========================================================================
    // EVALUATION
    // =========================================================================

    pub static ref SAMPLES_RESERVED: Counter = Counter::new(
        "p44_eval_samples_reserved_total",
        "Samples handed out for scoring"
    ).expect("metric creation failed");

    pub static ref SAMPLES_EVALUATED: Counter = Counter::new(
        "p44_eval_samples_evaluated_total",
        "Samples marked evaluated"
    ).expect("metric creation failed");

    pub static ref CYCLES: CounterVec = CounterVec::new(
        Opts::new("p44_eval_cycles_total", "Evaluation cycles by outcome"),
        &["outcome", "degraded"]
    ).expect("metric creation failed");

    pub static ref SCORER_REPLIES: CounterVec = CounterVec::new(
        Opts::new("p44_eval_scorer_replies_total", "Scorer replies by status"),
        &["status"]  // valid/malformed/timeout/unreachable
    ).expect("metric creation failed");

    // =========================================================================
    // ERRORS
    // =========================================================================

    pub static ref CRITICAL_ERRORS: CounterVec = CounterVec::new(
        Opts::new("p44_critical_errors_total", "Unrecoverable errors by component"),
        &["component"]
    ).expect("metric creation failed");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ANNOUNCEMENTS.clone()),
        Box::new(LIVE_ROOMS.clone()),
        Box::new(ROOMS_EVICTED.clone()),
        Box::new(VOTES.clone()),
        Box::new(VOTE_EPOCH.clone()),
        Box::new(PEER_FAILURES.clone()),
        Box::new(PEER_LATENCY.clone()),
        Box::new(GATE_DECISIONS.clone()),
        Box::new(SAMPLES_RESERVED.clone()),
        Box::new(SAMPLES_EVALUATED.clone()),
        Box::new(CYCLES.clone()),
        Box::new(SCORER_REPLIES.clone()),
        Box::new(CRITICAL_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics in the Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Fold one bus event into the metrics.
pub fn record_event(event: &ValidatorEvent) {
    match event {
        ValidatorEvent::RoomAnnounced { .. } => {
            ANNOUNCEMENTS.with_label_values(&["accepted"]).inc();
        }
        ValidatorEvent::AnnouncementRejected { .. } => {
            ANNOUNCEMENTS.with_label_values(&["rejected"]).inc();
        }
        ValidatorEvent::RoomsEvicted { count, live } => {
            ROOMS_EVICTED.inc_by(*count as f64);
            LIVE_ROOMS.set(*live as f64);
        }
        ValidatorEvent::VotesComputed {
            epoch,
            attested,
            unattested,
            unreachable,
        } => {
            VOTE_EPOCH.set(*epoch as f64);
            VOTES.with_label_values(&["attested"]).inc_by(*attested as f64);
            VOTES.with_label_values(&["unattested"]).inc_by(*unattested as f64);
            VOTES.with_label_values(&["unreachable"]).inc_by(*unreachable as f64);
        }
        ValidatorEvent::GateDecided { allowed, reason, .. } => {
            let outcome = if *allowed { "allowed" } else { "denied" };
            let reason = reason.as_deref().unwrap_or("");
            GATE_DECISIONS.with_label_values(&[outcome, reason]).inc();
        }
        ValidatorEvent::SamplesReserved { count, .. } => {
            SAMPLES_RESERVED.inc_by(*count as f64);
        }
        ValidatorEvent::SamplesEvaluated { count } => {
            SAMPLES_EVALUATED.inc_by(*count as f64);
        }
        ValidatorEvent::ScorerReplied { status, .. } => {
            SCORER_REPLIES.with_label_values(&[status.as_str()]).inc();
        }
        ValidatorEvent::CycleAdvanced { .. } => {}
        ValidatorEvent::CycleCompleted {
            outcome, degraded, ..
        } => {
            let degraded = if *degraded { "true" } else { "false" };
            CYCLES
                .with_label_values(&[cycle_outcome(*outcome), degraded])
                .inc();
        }
        ValidatorEvent::CriticalError { component, .. } => {
            CRITICAL_ERRORS.with_label_values(&[component.as_str()]).inc();
        }
    }
}

fn cycle_outcome(outcome: CycleOutcomeKind) -> &'static str {
    match outcome {
        CycleOutcomeKind::Rewarded => "rewarded",
        CycleOutcomeKind::Burned => "burned",
        CycleOutcomeKind::Degraded => "degraded",
        CycleOutcomeKind::NoScorers => "no_scorers",
    }
}

/// Count a failed call to another node.
pub fn record_peer_failure(target: &str, kind: &str) {
    PEER_FAILURES.with_label_values(&[target, kind]).inc();
}

/// Observes the elapsed time into [`PEER_LATENCY`] on drop.
pub struct PeerTimer {
    target: &'static str,
    start: std::time::Instant,
}

impl PeerTimer {
    pub fn start(target: &'static str) -> Self {
        Self {
            target,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for PeerTimer {
    fn drop(&mut self) {
        PEER_LATENCY
            .with_label_values(&[self.target])
            .observe(self.start.elapsed().as_secs_f64());
    }
}
