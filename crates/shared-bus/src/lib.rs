//! # Shared Bus - Event Bus Between Validator Loops
//!
//! The announce loop, the indexer poll loop, the evaluation loop and the
//! HTTP handlers run as independent tasks. They report what they did as
//! `ValidatorEvent`s; the runtime's telemetry handler (and tests) subscribe.
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐  subscribe()  ┌────────────┐
//! │ poll / cycle │ ────────────→ │  Event Bus   │ ────────────→ │ telemetry  │
//! └──────────────┘               └──────────────┘               └────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{CycleOutcomeKind, EventFilter, EventTopic, ScorerReplyStatus, ValidatorEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
