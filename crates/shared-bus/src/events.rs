//! # Validator Events
//!
//! Results published by the periodic loops and request handlers. Loops never
//! call each other directly; anything another task needs to observe goes
//! through the bus.

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, ScorerId};

/// Outcome of one evaluation cycle, as reported on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcomeKind {
    /// A full chunk was dispatched and rewards were computed.
    Rewarded,
    /// No scorer replied validly; the burn allocation was used.
    Burned,
    /// Max-wait elapsed before a full chunk could be assembled.
    Degraded,
    /// A chunk was ready but no scorers were selected.
    NoScorers,
}

/// How a single scorer answered a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerReplyStatus {
    Valid,
    Malformed,
    Timeout,
    Unreachable,
}

impl ScorerReplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Malformed => "malformed",
            Self::Timeout => "timeout",
            Self::Unreachable => "unreachable",
        }
    }
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ValidatorEvent {
    // =========================================================================
    // DIRECTORY
    // =========================================================================
    /// An announcement was accepted and stored.
    RoomAnnounced { node_id: NodeId, capacity: u32 },

    /// An announcement failed validation.
    AnnouncementRejected { node_id: NodeId, reason: String },

    /// Expired rooms were dropped (lazy read or sweep).
    RoomsEvicted { count: usize, live: usize },

    // =========================================================================
    // INDEXER
    // =========================================================================
    /// A poll round finished and replaced the vote book.
    VotesComputed {
        epoch: u64,
        attested: usize,
        unattested: usize,
        unreachable: usize,
    },

    // =========================================================================
    // LEDGER GATE
    // =========================================================================
    /// A custody action was authorized or denied.
    GateDecided {
        subject: NodeId,
        allowed: bool,
        reason: Option<String>,
    },

    // =========================================================================
    // EVAL BUFFER & EVALUATION LOOP
    // =========================================================================
    /// Samples were handed out by the buffer.
    SamplesReserved { count: usize, mixed: bool },

    /// Samples passed through scoring.
    SamplesEvaluated { count: usize },

    /// A scorer's reply was classified.
    ScorerReplied {
        scorer: ScorerId,
        status: ScorerReplyStatus,
    },

    /// The evaluation cycle entered a new phase.
    CycleAdvanced { cycle_id: String, phase: String },

    /// An evaluation cycle ended.
    CycleCompleted {
        cycle_id: String,
        outcome: CycleOutcomeKind,
        batches: usize,
        degraded: bool,
    },

    // =========================================================================
    // CRITICAL EVENTS (DLQ)
    // =========================================================================
    /// Unrecoverable error requiring operator attention.
    CriticalError { component: String, error: String },
}

impl ValidatorEvent {
    /// Get the topic for this event (for filtering).
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::RoomAnnounced { .. }
            | Self::AnnouncementRejected { .. }
            | Self::RoomsEvicted { .. } => EventTopic::Directory,
            Self::VotesComputed { .. } => EventTopic::Attestation,
            Self::GateDecided { .. } => EventTopic::Custody,
            Self::SamplesReserved { .. }
            | Self::SamplesEvaluated { .. }
            | Self::ScorerReplied { .. }
            | Self::CycleAdvanced { .. }
            | Self::CycleCompleted { .. } => EventTopic::Evaluation,
            Self::CriticalError { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Name of the component that emitted the event.
    pub fn source_component(&self) -> &'static str {
        match self.topic() {
            EventTopic::Directory => "directory",
            EventTopic::Attestation => "indexer",
            EventTopic::Custody => "ledger-gate",
            EventTopic::Evaluation => "evaluation",
            EventTopic::DeadLetterQueue | EventTopic::All => "runtime",
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    Directory,
    Attestation,
    Custody,
    Evaluation,
    /// Dead Letter Queue for critical errors.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events. Empty means everything.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    pub fn matches(&self, event: &ValidatorEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
