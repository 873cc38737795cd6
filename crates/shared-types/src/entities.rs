//! # Core Domain Entities
//!
//! Wire-level records exchanged between validator nodes.
//!
//! ## Clusters
//!
//! - **Discovery**: `RoomAnnouncement`
//! - **Attestation**: `AttestationBundle`, `AttestationVote`, `TrustState`
//! - **Evaluation**: `EvalSample`, `ScoreResponse`, `RewardVector`

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::errors::SigningError;
use crate::security::Signable;

// =============================================================================
// IDENTITY & TIME
// =============================================================================

/// Identity of a validator node (its hotkey address in production).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Wrap an identity string, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Unix timestamp in seconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Maximum reasonable timestamp (year 9999).
    pub const MAX_REASONABLE: u64 = 253_402_300_799;

    pub fn new(secs: u64) -> Self {
        Self(secs.min(Self::MAX_REASONABLE))
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_sub(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Absolute distance between two timestamps.
    pub fn abs_diff(&self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn add_secs(&self, secs: u64) -> Self {
        Self::new(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// A room advertised by a validator to the Directory.
///
/// `announced_at` is the signer's clock and is covered by the signature;
/// `last_seen` is stamped by the Directory on receipt and never signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAnnouncement {
    pub node_id: NodeId,
    pub node_name: String,
    pub service_url: String,
    #[serde(default)]
    pub read_api_url: Option<String>,
    #[serde(default)]
    pub room_code: Option<String>,
    pub capacity: u32,
    pub version_hash: String,
    pub announced_at: Timestamp,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub last_seen: Timestamp,
}

impl Signable for RoomAnnouncement {
    fn signing_bytes(&self) -> Result<Vec<u8>, SigningError> {
        let payload = serde_json::json!({
            "node_id": self.node_id,
            "node_name": self.node_name,
            "service_url": self.service_url,
            "read_api_url": self.read_api_url,
            "room_code": self.room_code,
            "capacity": self.capacity,
            "version_hash": self.version_hash,
            "announced_at": self.announced_at,
        });
        serde_json::to_vec(&payload).map_err(|e| SigningError::Serialization(e.to_string()))
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

// =============================================================================
// ATTESTATION
// =============================================================================

/// Schema tag carried by every bundle.
pub const BUNDLE_SCHEMA: &str = "p44.attestation.bundle.v1";

/// A node's signed self-report about its evaluation environment.
///
/// `trust_flag` is opaque and self-reported; only signature-of-origin is
/// verifiable. The quorum of peer votes is the security boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationBundle {
    pub schema: String,
    pub node_id: NodeId,
    pub node_name: String,
    pub trust_flag: bool,
    #[serde(default)]
    pub measurement: String,
    pub epoch: u64,
    pub issued_at: Timestamp,
    #[serde(default)]
    pub signature: String,
}

impl Signable for AttestationBundle {
    fn signing_bytes(&self) -> Result<Vec<u8>, SigningError> {
        let payload = serde_json::json!({
            "schema": self.schema,
            "node_id": self.node_id,
            "node_name": self.node_name,
            "trust_flag": self.trust_flag,
            "measurement": self.measurement,
            "epoch": self.epoch,
            "issued_at": self.issued_at,
        });
        serde_json::to_vec(&payload).map_err(|e| SigningError::Serialization(e.to_string()))
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

/// Why a node is not considered attested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnattestedReason {
    NoBundle,
    BundleStale,
    EnvironmentIntegrityDisabled,
    InsufficientQuorum,
}

impl UnattestedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoBundle => "no_bundle",
            Self::BundleStale => "bundle_stale",
            Self::EnvironmentIntegrityDisabled => "environment_integrity_disabled",
            Self::InsufficientQuorum => "insufficient_quorum",
        }
    }
}

impl fmt::Display for UnattestedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived trust classification of a node. Never persisted as a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TrustState {
    Attested,
    Unattested(UnattestedReason),
}

impl TrustState {
    pub fn is_attested(&self) -> bool {
        matches!(self, Self::Attested)
    }

    pub fn reason(&self) -> Option<UnattestedReason> {
        match self {
            Self::Attested => None,
            Self::Unattested(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attested => f.write_str("attested"),
            Self::Unattested(reason) => write!(f, "unattested({reason})"),
        }
    }
}

/// One indexer's signed verdict about one subject for one epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationVote {
    pub voter_node_id: NodeId,
    pub subject_node_id: NodeId,
    pub epoch: u64,
    pub verdict: TrustState,
    pub issued_at: Timestamp,
    #[serde(default)]
    pub signature: String,
}

impl Signable for AttestationVote {
    fn signing_bytes(&self) -> Result<Vec<u8>, SigningError> {
        let payload = serde_json::json!({
            "voter_node_id": self.voter_node_id,
            "subject_node_id": self.subject_node_id,
            "epoch": self.epoch,
            "verdict": self.verdict,
            "issued_at": self.issued_at,
        });
        serde_json::to_vec(&payload).map_err(|e| SigningError::Serialization(e.to_string()))
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn set_signature(&mut self, signature: String) {
        self.signature = signature;
    }
}

/// Point answer to "is this node attested, according to you?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationStatus {
    pub node_id: NodeId,
    pub attested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnattestedReason>,
    pub epoch: u64,
}

impl AttestationStatus {
    pub fn from_state(node_id: NodeId, state: TrustState, epoch: u64) -> Self {
        Self {
            node_id,
            attested: state.is_attested(),
            reason: state.reason(),
            epoch,
        }
    }

    /// Reassemble the trust state. A missing reason on a negative answer
    /// is read as `NoBundle`.
    pub fn trust_state(&self) -> TrustState {
        if self.attested {
            TrustState::Attested
        } else {
            TrustState::Unattested(self.reason.unwrap_or(UnattestedReason::NoBundle))
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Ground-truth population tag of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PopulationTag {
    Human,
    Bot,
}

/// Stratification key of a batch. Bots are the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandType {
    Human,
    Bot,
}

impl HandType {
    /// Binary label used by scoring: 1 = bot, 0 = human.
    pub fn label(&self) -> u8 {
        match self {
            Self::Human => 0,
            Self::Bot => 1,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Self::Bot)
    }
}

/// A sanitized behavioral sample ("hand") produced by the gameplay backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalSample {
    pub sample_id: String,
    pub population_tags: BTreeSet<PopulationTag>,
    #[serde(default)]
    pub sanitized_event_sequence: Vec<serde_json::Value>,
    #[serde(default)]
    pub timing_features: BTreeMap<String, f64>,
    #[serde(default)]
    pub context_metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: Timestamp,
}

impl EvalSample {
    /// A hand that involved any bot is a bot hand. `None` for untagged samples.
    pub fn dominant_hand_type(&self) -> Option<HandType> {
        if self.population_tags.contains(&PopulationTag::Bot) {
            Some(HandType::Bot)
        } else if self.population_tags.contains(&PopulationTag::Human) {
            Some(HandType::Human)
        } else {
            None
        }
    }

    pub fn has_tag(&self, tag: PopulationTag) -> bool {
        self.population_tags.contains(&tag)
    }
}

/// A scorer's verdict on one batch of a dispatched chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub chunk_index: usize,
    pub risk_score: f64,
    pub prediction: bool,
}

/// Identity of a remote scorer (miner).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScorerId(pub String);

impl fmt::Display for ScorerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScorerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Scorer identity to scalar reward.
pub type RewardVector = BTreeMap<ScorerId, f64>;
