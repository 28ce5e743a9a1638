//! # Content Digest — Decision and Audit Identity
//!
//! Defines `ContentDigest`, the SHA-256 identity of a canonicalized
//! value. The orchestrator uses it two ways: as the idempotency key of
//! a consolidation decision (re-applying the same decision is detected
//! by digest equality) and as the integrity digest of audit metadata.
//!
//! ## Invariant
//!
//! `sha256_digest()` accepts only `&CanonicalBytes`, never raw bytes.
//! Every digest in the system therefore flows through the one
//! canonicalization pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A SHA-256 content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
///
/// The signature enforces that only `CanonicalBytes` (produced through
/// the JCS pipeline) can be hashed — no code path can digest
/// non-canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
///
/// Convenience wrapper for contexts that persist the digest as text
/// (stage rows, deadline rows, audit events).
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}
