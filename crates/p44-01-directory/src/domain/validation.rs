//! Structural checks on an incoming announcement.
//!
//! Run before signature verification so obviously malformed payloads never
//! reach the MAC.

use shared_types::{RoomAnnouncement, Timestamp};

use crate::error::{DirectoryError, DirectoryResult};

/// Required fields, capacity and url scheme.
pub fn validate_fields(ann: &RoomAnnouncement) -> DirectoryResult<()> {
    if ann.node_id.is_empty() {
        return Err(DirectoryError::MissingField("node_id"));
    }
    if ann.node_name.trim().is_empty() {
        return Err(DirectoryError::MissingField("node_name"));
    }
    if ann.version_hash.trim().is_empty() {
        return Err(DirectoryError::MissingField("version_hash"));
    }
    if ann.signature.trim().is_empty() {
        return Err(DirectoryError::MissingField("signature"));
    }
    if ann.capacity == 0 {
        return Err(DirectoryError::InvalidCapacity(ann.capacity));
    }

    require_http_url("service_url", &ann.service_url)?;
    if let Some(url) = &ann.read_api_url {
        require_http_url("read_api_url", url)?;
    }
    Ok(())
}

/// Reject announcements signed with a clock too far from ours.
pub fn check_clock_skew(
    announced_at: Timestamp,
    now: Timestamp,
    max_skew_secs: u64,
) -> DirectoryResult<()> {
    if announced_at.abs_diff(now) > max_skew_secs {
        return Err(DirectoryError::ClockSkew {
            announced_at: announced_at.as_secs(),
            now: now.as_secs(),
            max_skew: max_skew_secs,
        });
    }
    Ok(())
}

fn require_http_url(field: &'static str, url: &str) -> DirectoryResult<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DirectoryError::MissingField(field));
    }
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(DirectoryError::InvalidUrl {
            field,
            url: url.to_string(),
        }),
    }
}
