//! Adapters: the internal eval HTTP API and its client.

pub mod client;
pub mod http;

pub use client::PlatformEvalClient;
pub use http::{router, EVAL_SECRET_HEADER};
