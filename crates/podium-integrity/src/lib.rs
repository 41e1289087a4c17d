//! podium-integrity
//!
//! Canonical-form hashing and payload verification.
//!
//! A companion `.sha256` file stores the digest of the document's
//! *canonical compact* re-serialization, not of the raw file bytes. Hashing
//! the canonical form makes verification independent of cosmetic formatting
//! differences between whatever wrote the file and whoever reads it, while
//! still catching partially-written or tampered payloads.
//!
//! Deterministic, pure logic. No IO.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// The payload is not a structurally valid document.
    Parse(String),
    /// The stored digest does not match the recomputed one.
    HashMismatch { stored: String, computed: String },
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::Parse(msg) => write!(f, "payload parse error: {msg}"),
            IntegrityError::HashMismatch { stored, computed } => {
                write!(f, "hash mismatch: stored={stored} computed={computed}")
            }
        }
    }
}

impl std::error::Error for IntegrityError {}

// ---------------------------------------------------------------------------
// Canonical form
// ---------------------------------------------------------------------------

/// Re-serialize a JSON payload to its canonical compact form: no extraneous
/// whitespace, object keys in the parser's (sorted) order.
pub fn canonical_compact(raw: &[u8]) -> Result<String, IntegrityError> {
    let doc: Value =
        serde_json::from_slice(raw).map_err(|e| IntegrityError::Parse(e.to_string()))?;
    serde_json::to_string(&doc).map_err(|e| IntegrityError::Parse(e.to_string()))
}

/// Lowercase-hex SHA-256 digest of the canonical compact form of `raw`.
pub fn canonical_hash(raw: &[u8]) -> Result<String, IntegrityError> {
    let canonical = canonical_compact(raw)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify `raw` against a stored digest.
///
/// The stored value is trimmed of surrounding whitespace and compared
/// case-insensitively (digests are rendered lowercase but some producers
/// upper-case hex).
pub fn verify_bytes(raw: &[u8], stored_hash: &str) -> Result<(), IntegrityError> {
    let computed = canonical_hash(raw)?;
    let stored = stored_hash.trim();
    if stored.eq_ignore_ascii_case(&computed) {
        Ok(())
    } else {
        Err(IntegrityError::HashMismatch {
            stored: stored.to_string(),
            computed,
        })
    }
}

/// Boolean contract: `true` iff the payload parses and its canonical hash
/// matches. A missing companion hash (`None`) skips verification; integrity
/// checking is opt-in per file.
pub fn verify(raw: &[u8], stored_hash: Option<&str>) -> bool {
    match stored_hash {
        None => true,
        Some(stored) => verify_bytes(raw, stored).is_ok(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
