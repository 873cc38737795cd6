//! Adapters: axum routes and the reqwest client for remote directories.

pub mod client;
pub mod http;

pub use client::DirectoryClient;
pub use http::router;
