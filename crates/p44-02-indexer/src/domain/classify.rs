//! Bundle classification.
//!
//! Turns whatever a peer served at `/attestation/bundle` into a trust state.
//! Order matters: a bundle that fails origin checks is treated as absent,
//! so its trust flag and timestamps are never read.

use shared_types::{
    AttestationBundle, NodeId, SharedSecret, Signable, Timestamp, TrustState, UnattestedReason,
};
use tracing::debug;

/// Freshness window applied to `issued_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub staleness_secs: u64,
    pub max_clock_skew_secs: u64,
}

impl Freshness {
    /// Issued no longer than `staleness_secs` ago and no further than
    /// `max_clock_skew_secs` ahead of `now`.
    pub fn is_fresh(&self, issued_at: Timestamp, now: Timestamp) -> bool {
        if issued_at > now {
            issued_at.saturating_sub(now) <= self.max_clock_skew_secs
        } else {
            now.saturating_sub(issued_at) <= self.staleness_secs
        }
    }
}

/// Classify a bundle fetched for `subject`.
pub fn classify_bundle(
    subject: &NodeId,
    bundle: &AttestationBundle,
    secret: &SharedSecret,
    freshness: Freshness,
    now: Timestamp,
) -> TrustState {
    if &bundle.node_id != subject {
        debug!(subject = %subject, served = %bundle.node_id, "Bundle served for a different node");
        return TrustState::Unattested(UnattestedReason::NoBundle);
    }
    if let Err(err) = bundle.verify(secret) {
        debug!(subject = %subject, error = %err, "Bundle signature rejected");
        return TrustState::Unattested(UnattestedReason::NoBundle);
    }
    if !bundle.trust_flag {
        return TrustState::Unattested(UnattestedReason::EnvironmentIntegrityDisabled);
    }
    if !freshness.is_fresh(bundle.issued_at, now) {
        return TrustState::Unattested(UnattestedReason::BundleStale);
    }
    TrustState::Attested
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::BUNDLE_SCHEMA;

    const FRESH: Freshness = Freshness {
        staleness_secs: 120,
        max_clock_skew_secs: 120,
    };

    fn secret() -> SharedSecret {
        SharedSecret::from("classify-test-secret")
    }

    fn bundle(node: &str, flag: bool, issued_at: u64) -> AttestationBundle {
        let mut b = AttestationBundle {
            schema: BUNDLE_SCHEMA.to_string(),
            node_id: NodeId::new(node),
            node_name: node.to_string(),
            trust_flag: flag,
            measurement: String::new(),
            epoch: issued_at / 60,
            issued_at: Timestamp::new(issued_at),
            signature: String::new(),
        };
        b.sign(&secret()).unwrap();
        b
    }

    #[test]
    fn test_fresh_signed_bundle_is_attested() {
        let state = classify_bundle(
            &NodeId::new("b"),
            &bundle("b", true, 1_000),
            &secret(),
            FRESH,
            Timestamp::new(1_050),
        );
        assert_eq!(state, TrustState::Attested);
    }

    #[test]
    fn test_wrong_subject_is_no_bundle() {
        let state = classify_bundle(
            &NodeId::new("c"),
            &bundle("b", true, 1_000),
            &secret(),
            FRESH,
            Timestamp::new(1_000),
        );
        assert_eq!(state, TrustState::Unattested(UnattestedReason::NoBundle));
    }

    #[test]
    fn test_forged_bundle_is_no_bundle_even_if_flag_off() {
        let mut b = bundle("b", false, 1_000);
        b.measurement = "tampered".into();
        let state = classify_bundle(&NodeId::new("b"), &b, &secret(), FRESH, Timestamp::new(1_000));
        assert_eq!(state, TrustState::Unattested(UnattestedReason::NoBundle));
    }

    #[test]
    fn test_flag_off_is_integrity_disabled() {
        let state = classify_bundle(
            &NodeId::new("b"),
            &bundle("b", false, 1_000),
            &secret(),
            FRESH,
            Timestamp::new(1_000),
        );
        assert_eq!(
            state,
            TrustState::Unattested(UnattestedReason::EnvironmentIntegrityDisabled)
        );
    }

    #[test]
    fn test_staleness_window_edges() {
        let b = bundle("b", true, 1_000);
        let at = |now| classify_bundle(&NodeId::new("b"), &b, &secret(), FRESH, Timestamp::new(now));
        assert_eq!(at(1_120), TrustState::Attested);
        assert_eq!(at(1_121), TrustState::Unattested(UnattestedReason::BundleStale));
        // Issued in the future
        assert_eq!(at(880), TrustState::Attested);
        assert_eq!(at(879), TrustState::Unattested(UnattestedReason::BundleStale));
    }
}
