//! Ports for the room directory.

pub mod inbound;

pub use inbound::DirectoryApi;
