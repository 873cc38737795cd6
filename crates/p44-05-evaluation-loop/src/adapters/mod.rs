//! Adapters: reqwest scorer client and weight sinks.

pub mod scorer;
pub mod sink;

pub use scorer::HttpScorerClient;
pub use sink::{InMemoryWeightSink, LoggingWeightSink};
