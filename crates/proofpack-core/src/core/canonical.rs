// crates/proofpack-core/src/core/canonical.rs
// ============================================================================
// Module: Proof-Pack Canonicalization
// Description: Deterministic JSON, path, and line-ending canonical forms.
// Purpose: Guarantee semantically identical content produces identical bytes.
// Dependencies: serde, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! Canonical JSON sorts object keys lexicographically (by UTF-8 bytes) at every
//! nesting level and emits compact output. Arrays keep their input order since
//! element order is meaningful. The key sort is an explicit step
//! ([`sorted_entries`]) rather than a property of the map implementation, so
//! canonical output does not depend on `serde_json` feature flags. Scalars
//! are emitted in their RFC 8785 form through `serde_jcs`, so `1.0` and `1`
//! produce the same bytes.
//!
//! Paths are rewritten to `/` separators and text to LF line endings. Both
//! transforms are idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while producing canonical forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CanonicalError {
    /// Value could not be serialized to JSON.
    #[error("canonical serialization failed: {0}")]
    Serialization(String),
    /// Path failed relative-path validation.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// Offending path.
        path: String,
        /// Reason the path was rejected.
        reason: &'static str,
    },
}

// ============================================================================
// SECTION: Canonical JSON
// ============================================================================

/// Serializes a JSON value into canonical bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::Serialization`] when a string cannot be encoded.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut out = Vec::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Serializes any serializable value into canonical JSON bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::Serialization`] when the value cannot be
/// represented as JSON (for example a map with non-string keys).
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CanonicalError> {
    let value =
        serde_json::to_value(value).map_err(|err| CanonicalError::Serialization(err.to_string()))?;
    canonicalize(&value)
}

/// Returns object entries sorted lexicographically by key bytes.
#[must_use]
pub fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(left, _), (right, _)| left.as_bytes().cmp(right.as_bytes()));
    entries
}

/// Writes a value in canonical form.
fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(number) => write_scalar(number, out)?,
        Value::String(text) => write_scalar(text, out)?,
        Value::Array(items) => {
            out.push(b'[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Value::Object(map) => {
            out.push(b'{');
            for (index, (key, item)) in sorted_entries(map).into_iter().enumerate() {
                if index > 0 {
                    out.push(b',');
                }
                write_scalar(key, out)?;
                out.push(b':');
                write_canonical(item, out)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

/// Writes a number or string in its RFC 8785 form.
fn write_scalar<T: Serialize>(value: &T, out: &mut Vec<u8>) -> Result<(), CanonicalError> {
    let bytes =
        serde_jcs::to_vec(value).map_err(|err| CanonicalError::Serialization(err.to_string()))?;
    out.extend_from_slice(&bytes);
    Ok(())
}

// ============================================================================
// SECTION: Canonical Paths
// ============================================================================

/// Rewrites every directory separator to `/`.
#[must_use]
pub fn canonical_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Validates a relative artifact path after canonicalizing separators.
///
/// Rejects empty paths, absolute paths, drive letters, `.`/`..` segments,
/// empty segments, and NUL bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::InvalidPath`] describing the first violation.
pub fn validate_relative_path(path: &str) -> Result<(), CanonicalError> {
    let invalid = |reason| CanonicalError::InvalidPath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.contains('\0') {
        return Err(invalid("path contains a NUL byte"));
    }
    let canonical = canonical_path(path);
    if canonical.starts_with('/') {
        return Err(invalid("absolute paths are not allowed"));
    }
    let bytes = canonical.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(invalid("drive-letter paths are not allowed"));
    }
    for segment in canonical.split('/') {
        match segment {
            "" => return Err(invalid("path contains an empty segment")),
            "." => return Err(invalid("current-directory segments are not allowed")),
            ".." => return Err(invalid("parent traversal is not allowed")),
            _ => {}
        }
    }
    Ok(())
}

/// Validates a single path segment such as a stage name or filename.
///
/// # Errors
///
/// Returns [`CanonicalError::InvalidPath`] when the segment is empty, contains
/// a separator, or is otherwise not a valid relative path.
pub fn validate_path_segment(segment: &str) -> Result<(), CanonicalError> {
    if segment.contains('/') || segment.contains('\\') {
        return Err(CanonicalError::InvalidPath {
            path: segment.to_string(),
            reason: "segment must not contain separators",
        });
    }
    validate_relative_path(segment)
}

/// Joins relative path segments with the canonical separator.
#[must_use]
pub fn join_path(base: &str, relative: &str) -> String {
    let base = canonical_path(base);
    let base = base.trim_end_matches('/');
    let relative = canonical_path(relative);
    if base.is_empty() || base == "." { relative } else { format!("{base}/{relative}") }
}

// ============================================================================
// SECTION: Canonical Line Endings
// ============================================================================

/// Normalizes CRLF and lone CR line endings to LF.
#[must_use]
pub fn canonical_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Normalizes CRLF and lone CR line endings to LF over raw bytes.
#[must_use]
pub fn canonical_text_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied().peekable();
    while let Some(byte) = iter.next() {
        if byte == b'\r' {
            if iter.peek() == Some(&b'\n') {
                iter.next();
            }
            out.push(b'\n');
        } else {
            out.push(byte);
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
