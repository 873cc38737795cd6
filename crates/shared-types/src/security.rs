//! # Payload Signing
//!
//! HMAC-SHA256 over canonical JSON, hex encoded.
//!
//! ## Canonical Form
//!
//! Signed records expose their payload as a JSON object without the
//! signature field. `serde_json` maps are key-sorted, so the byte form is
//! identical on every node regardless of struct declaration order.
//!
//! ## Security Properties
//!
//! - Constant-time verification through `Mac::verify_slice`
//! - Secrets are never printed by `Debug`

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::errors::SigningError;

type HmacSha256 = Hmac<Sha256>;

/// Minimum length accepted by `SharedSecret::validate`.
pub const MIN_SECRET_LEN: usize = 16;

/// Pre-shared key used to sign announcements, bundles and votes.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject empty, short, or all-zero secrets.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.0.is_empty() || self.0.iter().all(|b| *b == 0) {
            return Err(SigningError::EmptySecret);
        }
        if self.0.len() < MIN_SECRET_LEN {
            return Err(SigningError::WeakSecret {
                len: self.0.len(),
                min: MIN_SECRET_LEN,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedSecret(<{} bytes>)", self.0.len())
    }
}

impl From<&str> for SharedSecret {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// A record carrying a detached signature over its canonical payload.
pub trait Signable {
    /// Canonical bytes of everything the signature covers.
    fn signing_bytes(&self) -> Result<Vec<u8>, SigningError>;

    fn signature(&self) -> &str;

    fn set_signature(&mut self, signature: String);

    /// Compute and attach the signature.
    fn sign(&mut self, secret: &SharedSecret) -> Result<(), SigningError> {
        let bytes = self.signing_bytes()?;
        let signature = sign_bytes(&bytes, secret)?;
        self.set_signature(signature);
        Ok(())
    }

    /// Verify the attached signature in constant time.
    fn verify(&self, secret: &SharedSecret) -> Result<(), SigningError> {
        if self.signature().is_empty() {
            return Err(SigningError::MissingSignature);
        }
        let bytes = self.signing_bytes()?;
        verify_bytes(&bytes, self.signature(), secret)
    }
}

/// HMAC-SHA256 of `message`, lowercase hex.
pub fn sign_bytes(message: &[u8], secret: &SharedSecret) -> Result<String, SigningError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::EmptySecret)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against `message`.
pub fn verify_bytes(
    message: &[u8],
    signature_hex: &str,
    secret: &SharedSecret,
) -> Result<(), SigningError> {
    let expected =
        hex::decode(signature_hex.trim()).map_err(|_| SigningError::MalformedSignature)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SigningError::EmptySecret)?;
    mac.update(message);
    mac.verify_slice(&expected)
        .map_err(|_| SigningError::SignatureMismatch)
}

/// Constant-time equality for shared-secret headers.
///
/// Both sides are run through the same keyed MAC so the comparison time does
/// not depend on where the inputs first differ.
pub fn secrets_match(provided: &[u8], expected: &SharedSecret) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    mac.update(provided);
    let tag = mac.finalize().into_bytes();

    let Ok(mut check) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    check.update(expected.as_bytes());
    check.verify_slice(&tag).is_ok()
}
