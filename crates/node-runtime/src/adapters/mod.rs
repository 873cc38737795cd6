//! # Port Adapters
//!
//! Connect each component's outbound ports to either an in-process
//! component on this node or the HTTP client for a remote one. Remote calls
//! are timed into `p44_peer_request_duration_seconds` and failures counted
//! by kind.

pub mod directory;
pub mod indexer;
pub mod samples;
pub mod scorers;
pub mod weights;

pub use directory::DirectoryLink;
pub use indexer::IndexerLink;
pub use samples::SampleFeed;
pub use scorers::MeteredScorers;
pub use weights::RecordingSink;

use p44_telemetry::{record_peer_failure, PeerTimer};
use shared_types::{PeerError, PeerResult};
use std::future::Future;

/// Metric label for a failed peer call.
pub fn failure_kind(err: &PeerError) -> &'static str {
    match err {
        PeerError::Timeout { .. } => "timeout",
        PeerError::Transport(_) => "transport",
        PeerError::Status { .. } => "status",
        PeerError::Decode(_) => "decode",
        PeerError::Invalid(_) => "invalid",
    }
}

/// Time `call` and count it if it fails.
pub(crate) async fn metered<T>(
    target: &'static str,
    call: impl Future<Output = PeerResult<T>>,
) -> PeerResult<T> {
    let _timer = PeerTimer::start(target);
    let result = call.await;
    if let Err(err) = &result {
        record_peer_failure(target, failure_kind(err));
    }
    result
}
