//! Adapters: axum routes for custody actions.

pub mod http;

pub use http::router;
