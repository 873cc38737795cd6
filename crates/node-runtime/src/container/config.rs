//! # Node Configuration
//!
//! One section per concern. Every section has a `Default`, so a TOML file
//! only needs the keys it changes. Loading order: defaults, then the file
//! named by `P44_CONFIG` (if any), then `P44_*` environment variables.
//!
//! ## Security Requirements
//!
//! - `security.shared_secret` MUST NOT be empty, all zeros or shorter than
//!   [`MIN_SECRET_LEN`] in production.

use p44_01_directory::DirectoryConfig;
use p44_02_indexer::IndexerConfig;
use p44_03_ledger_gate::GateConfig;
use p44_04_eval_buffer::EvalBufferConfig;
use p44_05_evaluation_loop::{EvaluationConfig, ScorerEndpoint};
use serde::{Deserialize, Serialize};
use shared_types::{NodeId, ScorerId, SharedSecret};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Shortest shared secret accepted by [`NodeConfig::validate_for_production`].
pub const MIN_SECRET_LEN: usize = 16;

/// Announce interval floor.
pub const MIN_ANNOUNCE_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: String, value: String },

    #[error(
        "SECURITY VIOLATION: shared secret is empty or all zeros. \
         Set P44_SHARED_SECRET or security.shared_secret."
    )]
    InsecureSecret,

    #[error("shared secret must be at least {MIN_SECRET_LEN} bytes")]
    ShortSecret,

    #[error("{0}")]
    Invalid(String),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub identity: IdentityConfig,
    pub security: SecurityConfig,
    pub directory: DirectorySection,
    pub indexer: IndexerSection,
    pub ledger: LedgerSection,
    pub eval: EvalSection,
    pub evaluation: EvaluationSection,
    pub network: NetworkConfig,
}

/// Who this node is and what it announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub node_id: String,
    pub node_name: String,
    /// Public base URL of this node's gameplay service.
    pub service_url: String,
    /// Public base URL of this node's indexer read API. `None` runs no
    /// indexer as far as peers are concerned.
    pub read_api_url: Option<String>,
    pub room_code: Option<String>,
    /// Tables this node can host.
    pub capacity: u32,
    pub version_hash: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            node_id: "validator-local".to_string(),
            node_name: "validator-local".to_string(),
            service_url: "http://127.0.0.1:3003".to_string(),
            read_api_url: Some("http://127.0.0.1:3002".to_string()),
            room_code: None,
            capacity: 1,
            version_hash: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Secrets. Never logged.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Mesh-wide key for announcement, bundle and vote signatures.
    pub shared_secret: String,
    /// Key for the internal eval API. Falls back to `shared_secret`.
    pub eval_secret: Option<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("shared_secret", &"<redacted>")
            .field("eval_secret", &self.eval_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SecurityConfig {
    pub fn shared_secret(&self) -> SharedSecret {
        SharedSecret::from(self.shared_secret.as_str())
    }

    pub fn eval_secret(&self) -> SharedSecret {
        SharedSecret::from(self.eval_secret.as_deref().unwrap_or(&self.shared_secret))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySection {
    /// Host a directory on this node.
    pub host: bool,
    /// Remote directory to announce to and read from. When unset the local
    /// directory is used.
    pub url: Option<String>,
    pub ttl_secs: u64,
    pub max_clock_skew_secs: u64,
    /// Announce this node's room.
    pub announce: bool,
    pub announce_interval_secs: u64,
    /// Background eviction of expired rooms.
    pub sweep_interval_secs: u64,
    pub request_timeout_ms: u64,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            host: true,
            url: None,
            ttl_secs: 60,
            max_clock_skew_secs: 120,
            announce: true,
            announce_interval_secs: 10,
            sweep_interval_secs: 30,
            request_timeout_ms: 3_000,
        }
    }
}

impl DirectorySection {
    pub fn to_directory_config(&self) -> DirectoryConfig {
        DirectoryConfig::new(self.ttl_secs, self.max_clock_skew_secs)
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.announce_interval_secs.max(MIN_ANNOUNCE_INTERVAL_SECS))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSection {
    pub enabled: bool,
    pub poll_interval_secs: u64,
    pub trust_flag: bool,
    pub publish_bundle: bool,
    pub measurement: String,
    pub epoch_seconds: u64,
    pub bundle_staleness_secs: u64,
    pub max_clock_skew_secs: u64,
    pub peer_timeout_ms: u64,
}

impl Default for IndexerSection {
    fn default() -> Self {
        let base = IndexerConfig::default();
        Self {
            enabled: true,
            poll_interval_secs: 15,
            trust_flag: base.trust_flag,
            publish_bundle: base.publish_bundle,
            measurement: base.measurement,
            epoch_seconds: base.epoch_seconds,
            bundle_staleness_secs: base.bundle_staleness_secs,
            max_clock_skew_secs: base.max_clock_skew_secs,
            peer_timeout_ms: base.peer_timeout.as_millis() as u64,
        }
    }
}

impl IndexerSection {
    pub fn to_indexer_config(&self, identity: &IdentityConfig) -> IndexerConfig {
        IndexerConfig {
            trust_flag: self.trust_flag,
            publish_bundle: self.publish_bundle,
            measurement: self.measurement.clone(),
            epoch_seconds: self.epoch_seconds,
            bundle_staleness_secs: self.bundle_staleness_secs,
            max_clock_skew_secs: self.max_clock_skew_secs,
            peer_timeout: Duration::from_millis(self.peer_timeout_ms.max(1)),
            ..IndexerConfig::new(NodeId::new(identity.node_id.clone()), identity.node_name.clone())
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub enabled: bool,
    #[serde(flatten)]
    pub gate: GateConfig,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            enabled: true,
            gate: GateConfig::default(),
        }
    }
}

impl LedgerSection {
    pub fn to_gate_config(&self) -> GateConfig {
        GateConfig {
            opening_balances: self.gate.opening_balances.clone(),
            ..GateConfig::new(
                self.gate.min_indexers,
                self.gate.max_fanout,
                self.gate.indexer_timeout,
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSection {
    /// Remote gameplay backend serving `/internal/eval/*`. When unset the
    /// node runs its own buffer.
    pub platform_url: Option<String>,
    pub platform_timeout_ms: u64,
    #[serde(flatten)]
    pub buffer: EvalBufferConfig,
}

impl Default for EvalSection {
    fn default() -> Self {
        Self {
            platform_url: None,
            platform_timeout_ms: 5_000,
            buffer: EvalBufferConfig::default(),
        }
    }
}

impl EvalSection {
    pub fn platform_timeout(&self) -> Duration {
        Duration::from_millis(self.platform_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSection {
    pub enabled: bool,
    /// Known scorers. The registry starts with these.
    pub scorers: Vec<ScorerEndpoint>,
    #[serde(flatten)]
    pub cycle: EvaluationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_host: String,
    /// `/rooms/*`. Zero picks a free port.
    pub directory_port: u16,
    /// `/attestation/*`, `/directory/state`.
    pub indexer_port: u16,
    /// `/ledger/*`, `/internal/eval/*`.
    pub service_port: u16,
    /// `/healthz`, `/metrics`.
    pub status_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            directory_port: 3001,
            indexer_port: 3002,
            service_port: 3003,
            status_port: 9100,
        }
    }
}

impl NodeConfig {
    /// Defaults, then `P44_CONFIG`, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        let mut config = match lookup("P44_CONFIG") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `P44_*` overrides from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let string = |key: &str, slot: &mut String| {
            if let Some(v) = lookup(key) {
                *slot = v;
            }
        };
        string("P44_VALIDATOR_ID", &mut self.identity.node_id);
        string("P44_VALIDATOR_NAME", &mut self.identity.node_name);
        string("P44_PLATFORM_PUBLIC_URL", &mut self.identity.service_url);
        string("P44_VERSION_HASH", &mut self.identity.version_hash);
        string("P44_SHARED_SECRET", &mut self.security.shared_secret);
        string("P44_BIND_HOST", &mut self.network.bind_host);
        string("P44_INDEXER_MEASUREMENT", &mut self.indexer.measurement);

        if let Some(v) = lookup("P44_INDEXER_PUBLIC_URL") {
            self.identity.read_api_url = non_empty(v);
        }
        if let Some(v) = lookup("P44_ROOM_CODE") {
            self.identity.room_code = non_empty(v);
        }
        if let Some(v) = lookup("P44_INTERNAL_EVAL_SECRET") {
            self.security.eval_secret = non_empty(v);
        }
        if let Some(v) = lookup("P44_DIRECTORY_URL") {
            self.directory.url = non_empty(v);
        }
        if let Some(v) = lookup("P44_PLATFORM_BACKEND_URL") {
            self.eval.platform_url = non_empty(v);
        }
        if let Some(v) = lookup("P44_QUERY_UIDS") {
            self.evaluation.cycle.explicit_scorers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ScorerId::from)
                .collect();
        }

        parse_into(&lookup, "P44_CAPACITY_TABLES", &mut self.identity.capacity)?;
        parse_into(&lookup, "P44_ANNOUNCE_INTERVAL_S", &mut self.directory.announce_interval_secs)?;
        parse_into(&lookup, "P44_DIRECTORY_TTL_S", &mut self.directory.ttl_secs)?;
        parse_into(&lookup, "P44_HOST_DIRECTORY", &mut self.directory.host)?;
        parse_into(&lookup, "P44_INDEXER_ENABLED", &mut self.indexer.enabled)?;
        parse_into(&lookup, "P44_TRUST_FLAG", &mut self.indexer.trust_flag)?;
        parse_into(&lookup, "P44_EPOCH_SECONDS", &mut self.indexer.epoch_seconds)?;
        parse_into(&lookup, "P44_LEDGER_ENABLED", &mut self.ledger.enabled)?;
        parse_into(&lookup, "P44_MIN_INDEXERS", &mut self.ledger.gate.min_indexers)?;
        parse_into(&lookup, "P44_EVALUATION_ENABLED", &mut self.evaluation.enabled)?;
        parse_into(&lookup, "P44_TASK_BATCH_SIZE", &mut self.evaluation.cycle.batches_per_chunk)?;
        parse_into(&lookup, "P44_QUERY_SAMPLE_SIZE", &mut self.evaluation.cycle.sample_size)?;
        parse_into(&lookup, "P44_REQUIRE_MIXED", &mut self.evaluation.cycle.require_mixed)?;
        parse_into(&lookup, "P44_DIRECTORY_PORT", &mut self.network.directory_port)?;
        parse_into(&lookup, "P44_INDEXER_PORT", &mut self.network.indexer_port)?;
        parse_into(&lookup, "P44_SERVICE_PORT", &mut self.network.service_port)?;
        parse_into(&lookup, "P44_STATUS_PORT", &mut self.network.status_port)?;

        let mut platform_timeout_secs: Option<u64> = None;
        parse_into(&lookup, "P44_PLATFORM_TIMEOUT_S", &mut platform_timeout_secs)?;
        if let Some(secs) = platform_timeout_secs {
            self.eval.platform_timeout_ms = secs.saturating_mul(1_000);
        }
        Ok(())
    }

    /// Structural checks that hold in every environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.node_id.trim().is_empty() {
            return Err(ConfigError::Invalid("identity.node_id is empty".into()));
        }
        if self.identity.service_url.trim().is_empty() {
            return Err(ConfigError::Invalid("identity.service_url is empty".into()));
        }
        if !self.directory.host && self.directory.url.is_none() {
            return Err(ConfigError::Invalid(
                "directory.url is required when this node hosts no directory".into(),
            ));
        }
        Ok(())
    }

    /// Returns `Err` if the shared secret is empty, all zeros or short.
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let secret = self.security.shared_secret.as_bytes();
        if secret.iter().all(|b| *b == b'0' || *b == 0) {
            return Err(ConfigError::InsecureSecret);
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::ShortSecret);
        }
        Ok(())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

trait EnvValue: Sized {
    fn parse_env(raw: &str) -> Option<Self>;
}

macro_rules! env_value_fromstr {
    ($($t:ty),*) => {
        $(impl EnvValue for $t {
            fn parse_env(raw: &str) -> Option<Self> {
                raw.trim().parse().ok()
            }
        })*
    };
}

env_value_fromstr!(u16, u32, u64, usize);

impl EnvValue for bool {
    fn parse_env(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}

impl<T: EnvValue> EnvValue for Option<T> {
    fn parse_env(raw: &str) -> Option<Self> {
        T::parse_env(raw).map(Some)
    }
}

fn parse_into<T: EnvValue>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(());
    };
    *slot = T::parse_env(&raw).ok_or_else(|| ConfigError::InvalidEnv {
        key: key.to_string(),
        value: raw.clone(),
    })?;
    Ok(())
}
