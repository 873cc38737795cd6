//! Indexer configuration.

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, MIN_EPOCH_SECONDS};
use std::time::Duration;

/// Identity and attestation settings of the local indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// This node's identity, as announced to the directory.
    pub node_id: NodeId,
    pub node_name: String,

    /// Self-reported environment integrity flag carried in the bundle.
    pub trust_flag: bool,

    /// When false, `current_bundle` is refused and peers see no bundle.
    pub publish_bundle: bool,

    /// Opaque environment measurement copied into the bundle.
    pub measurement: String,

    /// Epoch length; never below [`MIN_EPOCH_SECONDS`].
    pub epoch_seconds: u64,

    /// Bundles issued longer ago than this are stale.
    pub bundle_staleness_secs: u64,

    /// Bundles issued further than this in the future are stale.
    pub max_clock_skew_secs: u64,

    /// Per-call deadline for peer requests.
    #[serde(with = "duration_millis")]
    pub peer_timeout: Duration,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::new("validator-local"),
            node_name: "validator-local".to_string(),
            trust_flag: true,
            publish_bundle: true,
            measurement: String::new(),
            epoch_seconds: 60,
            bundle_staleness_secs: 120,
            max_clock_skew_secs: 120,
            peer_timeout: Duration::from_millis(2_500),
        }
    }
}

impl IndexerConfig {
    pub fn new(node_id: NodeId, node_name: impl Into<String>) -> Self {
        Self {
            node_id,
            node_name: node_name.into(),
            ..Self::default()
        }
    }

    /// Epoch length after clamping.
    pub fn epoch_seconds(&self) -> u64 {
        self.epoch_seconds.max(MIN_EPOCH_SECONDS)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
