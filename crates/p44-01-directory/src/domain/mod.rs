//! Directory domain: announcement validation and the announcement template.

pub mod template;
pub mod validation;

pub use template::AnnouncementTemplate;
pub use validation::{check_clock_skew, validate_fields};

use serde::{Deserialize, Serialize};

/// What happened to an accepted-for-processing announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnounceOutcome {
    /// Stored, replacing any earlier record for the node.
    Accepted,
    /// Older than the stored record for this node; ignored.
    Stale,
}

/// Liveness probe payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryHealth {
    pub status: String,
    pub rooms: usize,
}
