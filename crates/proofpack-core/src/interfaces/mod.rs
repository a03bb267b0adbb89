// crates/proofpack-core/src/interfaces/mod.rs
// ============================================================================
// Module: Proof-Pack Interfaces
// Description: Capability traits for artifact storage and audit logging.
// Purpose: Keep every side effect behind a small, swappable boundary.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! All file access in the proof-pack engine goes through [`ArtifactStore`]:
//! read bytes, write bytes, and test for existence by relative path. The
//! in-memory store in `runtime::store` and the filesystem store in
//! `proofpack-store-fs` both implement it, so every algorithm can be exercised
//! without touching disk.
//!
//! Boundary services report what they did through an [`AuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Artifact Store
// ============================================================================

/// Artifact storage errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// No artifact exists at the path.
    #[error("artifact not found: {0}")]
    NotFound(String),
    /// Underlying storage failed.
    #[error("artifact io error: {0}")]
    Io(String),
    /// Path failed validation.
    #[error("invalid artifact path: {0}")]
    InvalidPath(String),
    /// Artifact exceeds size limit.
    #[error("artifact too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Artifact path.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual artifact size in bytes.
        actual_bytes: usize,
    },
}

/// Byte storage addressed by relative `/`-separated paths.
pub trait ArtifactStore {
    /// Reads the bytes stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::NotFound`] when nothing is stored at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, ArtifactError> {
        self.read_with_limit(path, usize::MAX)
    }

    /// Reads the bytes stored at `path`, failing when they exceed `max_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::TooLarge`] when the artifact exceeds
    /// `max_bytes`, or another [`ArtifactError`] when reading fails.
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError>;

    /// Stores `bytes` at `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when writing fails.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArtifactError>;

    /// Returns true when something is stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the store cannot be queried.
    fn exists(&self, path: &str) -> Result<bool, ArtifactError>;
}

impl<T: ArtifactStore + ?Sized> ArtifactStore for &T {
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError> {
        (**self).read_with_limit(path, max_bytes)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        (**self).write(path, bytes)
    }

    fn exists(&self, path: &str) -> Result<bool, ArtifactError> {
        (**self).exists(path)
    }
}

// ============================================================================
// SECTION: Audit Sink
// ============================================================================

/// Outcome label attached to audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Operation completed and its checks passed.
    Success,
    /// Operation completed but reported failing checks.
    Failure,
    /// Operation was refused before doing any work.
    Rejected,
}

/// Audit event emitted by a boundary service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEvent {
    /// Event name, for example `proofpack_verified`.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Run id, baseline version, or other subject of the event.
    pub subject: String,
    /// Event outcome.
    pub outcome: AuditOutcome,
    /// Short human-readable detail.
    pub detail: Option<String>,
    /// Hash the event is about, when one applies.
    pub hash: Option<String>,
}

impl AuditEvent {
    /// Creates an audit event stamped with the current wall-clock time.
    #[must_use]
    pub fn new(event: &'static str, subject: impl Into<String>, outcome: AuditOutcome) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event,
            timestamp_ms,
            subject: subject.into(),
            outcome,
            detail: None,
            hash: None,
        }
    }

    /// Attaches a detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Attaches the hash the event is about.
    #[must_use]
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }
}

/// Audit sink for proof-pack boundary events.
pub trait AuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuditEvent);
}
