// crates/proofpack-core/src/core/hashing.rs
// ============================================================================
// Module: Proof-Pack Hashing
// Description: SHA-256 content hashing and validated digest values.
// Purpose: Provide deterministic lowercase-hex digests for artifacts and manifests.
// Dependencies: crate::core::canonical, serde, sha2
// ============================================================================

//! ## Overview
//! Every digest surfaced by the proof-pack engine is a SHA-256 hash rendered as
//! 64 lowercase hex characters. [`HashDigest`] enforces that shape on
//! construction and on deserialization, so a malformed hash is always a hard
//! failure rather than a value that silently compares unequal.
//!
//! Structured values are hashed over their canonical JSON bytes; text is hashed
//! over its canonical line-ending form. Binary payloads are hashed directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

use crate::core::canonical::canonical_json_bytes;
use crate::core::canonical::canonical_text;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Length of a SHA-256 digest rendered as hex.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Maximum number of characters echoed back when reporting a malformed hash.
const MAX_REPORTED_HASH_CHARS: usize = 80;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported hash algorithms for proof-pack artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

/// Default hash algorithm for proof-packs.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Validated SHA-256 digest in lowercase hex.
///
/// # Invariants
/// - Exactly [`SHA256_HEX_LENGTH`] characters, each in `[0-9a-f]`.
/// - Deserialization applies the same validation as [`HashDigest::parse`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashDigest(String);

impl HashDigest {
    /// Parses and validates a hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Malformed`] when the value is not 64 lowercase hex
    /// characters.
    pub fn parse(value: &str) -> Result<Self, HashError> {
        if value.len() != SHA256_HEX_LENGTH {
            return Err(HashError::Malformed {
                value: truncate_for_report(value),
                reason: "expected 64 hex characters",
            });
        }
        if !value.bytes().all(|byte| matches!(byte, b'0' ..= b'9' | b'a' ..= b'f')) {
            return Err(HashError::Malformed {
                value: truncate_for_report(value),
                reason: "expected lowercase hex characters",
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds a digest from raw SHA-256 output bytes.
    fn from_digest_bytes(bytes: &[u8]) -> Self {
        Self(hex_encode(bytes))
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for HashDigest {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HashDigest> for String {
    fn from(value: HashDigest) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing or parsing hashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
    /// Hash value does not have the required shape.
    #[error("malformed hash {value:?}: {reason}")]
    Malformed {
        /// Offending value (truncated).
        value: String,
        /// Reason the value was rejected.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Hashing Helpers
// ============================================================================

/// Hashes raw bytes with SHA-256.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> HashDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    HashDigest::from_digest_bytes(&digest)
}

/// Hashes the UTF-8 bytes of a string as-is.
#[must_use]
pub fn hash_str(text: &str) -> HashDigest {
    hash_bytes(text.as_bytes())
}

/// Hashes text after normalizing its line endings.
#[must_use]
pub fn hash_canonical_text(text: &str) -> HashDigest {
    hash_str(&canonical_text(text))
}

/// Hashes the canonical JSON form of a serializable value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn hash_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<HashDigest, HashError> {
    let bytes =
        canonical_json_bytes(value).map_err(|err| HashError::Canonicalization(err.to_string()))?;
    Ok(hash_bytes(&bytes))
}

// ============================================================================
// SECTION: Hex Encoding
// ============================================================================

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

/// Shortens a rejected value so error messages stay bounded.
fn truncate_for_report(value: &str) -> String {
    value.chars().take(MAX_REPORTED_HASH_CHARS).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
