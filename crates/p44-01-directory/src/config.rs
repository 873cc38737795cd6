//! Directory configuration.

/// Tunables for the room directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Seconds an announcement stays visible after its last refresh.
    pub ttl_secs: u64,
    /// Maximum distance between a signer's clock and ours.
    pub max_clock_skew_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_clock_skew_secs: 120,
        }
    }
}

impl DirectoryConfig {
    /// Build a config, clamping a zero TTL to one second.
    pub fn new(ttl_secs: u64, max_clock_skew_secs: u64) -> Self {
        Self {
            ttl_secs: ttl_secs.max(1),
            max_clock_skew_secs,
        }
    }
}
