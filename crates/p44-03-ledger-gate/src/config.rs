//! Ledger gate configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Minimum number of reachable indexers (M).
    pub min_indexers: usize,

    /// Upper bound on indexers queried per action.
    pub max_fanout: usize,

    /// Per-indexer deadline.
    #[serde(with = "duration_millis")]
    pub indexer_timeout: Duration,

    /// Balances loaded into the bankroll at startup.
    #[serde(default)]
    pub opening_balances: BTreeMap<String, u64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_indexers: 2,
            max_fanout: 8,
            indexer_timeout: Duration::from_secs(3),
            opening_balances: BTreeMap::new(),
        }
    }
}

impl GateConfig {
    /// Clamps `min_indexers` to at least one and `max_fanout` to at least
    /// `min_indexers`.
    pub fn new(min_indexers: usize, max_fanout: usize, indexer_timeout: Duration) -> Self {
        let min_indexers = min_indexers.max(1);
        Self {
            min_indexers,
            max_fanout: max_fanout.max(min_indexers),
            indexer_timeout,
            opening_balances: BTreeMap::new(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let config = GateConfig::new(0, 0, Duration::from_secs(1));
        assert_eq!(config.min_indexers, 1);
        assert_eq!(config.max_fanout, 1);

        let config = GateConfig::new(3, 2, Duration::from_secs(1));
        assert_eq!(config.max_fanout, 3);
    }
}
