//! Adapters: axum read API and the reqwest client for peer indexers.

pub mod client;
pub mod http;

pub use client::IndexerClient;
pub use http::router;
