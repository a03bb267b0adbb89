// crates/proofpack-core/src/runtime/proofpack.rs
// ============================================================================
// Module: Proof-Pack Writer
// Description: Canonicalizes, hashes, and persists run artifacts and manifests.
// Purpose: Produce an immutable, self-verifying record of a pipeline run.
// Dependencies: crate::{core, interfaces}, serde_json
// ============================================================================

//! ## Overview
//! [`ProofPackBuilder`] collects a run's artifacts in declared order and
//! writes them through an [`ArtifactStore`]:
//!
//! - `<stage>/<filename>` holds the canonical artifact bytes;
//! - `<stage>/<filename-without-ext>.sha256` holds their hex digest;
//! - `manifest.json` holds the canonical manifest and `manifest.sha256` its
//!   digest;
//! - `merkle-tree.json` holds the full Merkle tree.
//!
//! Every input is validated and hashed before the first write, so a rejected
//! build leaves the store untouched.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::CanonicalError;
use crate::core::canonical::canonical_json_bytes;
use crate::core::canonical::canonical_text;
use crate::core::canonical::join_path;
use crate::core::canonical::validate_path_segment;
use crate::core::gate::GateVerdict;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StageId;
use crate::core::manifest::ArtifactEntry;
use crate::core::manifest::MANIFEST_FILE;
use crate::core::manifest::MANIFEST_HASH_FILE;
use crate::core::manifest::MERKLE_TREE_FILE;
use crate::core::manifest::ManifestBody;
use crate::core::manifest::ManifestError;
use crate::core::manifest::ProofPack;
use crate::core::manifest::RunMetadata;
use crate::core::manifest::assemble;
use crate::core::manifest::sidecar_path;
use crate::core::merkle::build_merkle_tree;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactStore;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditOutcome;
use crate::interfaces::AuditSink;
use crate::runtime::audit::EVENT_PROOFPACK_WRITTEN;
use crate::runtime::audit::default_audit_sink;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default maximum number of artifacts per run.
pub const DEFAULT_MAX_ARTIFACTS: usize = 4096;
/// Default maximum size of a single artifact in bytes.
pub const DEFAULT_MAX_ARTIFACT_BYTES: usize = 64 * 1024 * 1024;
/// Default maximum size of a manifest in bytes.
pub const DEFAULT_MAX_MANIFEST_BYTES: usize = 8 * 1024 * 1024;

/// Size and count limits applied when writing and verifying proof-packs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofPackLimits {
    /// Maximum number of artifacts per run.
    pub max_artifacts: usize,
    /// Maximum size of a single artifact in bytes.
    pub max_artifact_bytes: usize,
    /// Maximum size of `manifest.json` in bytes.
    pub max_manifest_bytes: usize,
}

impl Default for ProofPackLimits {
    fn default() -> Self {
        Self {
            max_artifacts: DEFAULT_MAX_ARTIFACTS,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Artifact Inputs
// ============================================================================

/// Artifact content and the canonical form applied to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactContent {
    /// Structured content, stored as canonical JSON.
    Json(Value),
    /// Text content, stored with LF line endings.
    Text(String),
    /// Opaque bytes, stored as-is.
    Binary(Vec<u8>),
}

impl ArtifactContent {
    /// Returns the canonical bytes to persist and hash.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError`] when JSON content cannot be canonicalized.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        match self {
            Self::Json(value) => canonical_json_bytes(value),
            Self::Text(text) => Ok(canonical_text(text).into_bytes()),
            Self::Binary(bytes) => Ok(bytes.clone()),
        }
    }
}

/// One artifact declared for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInput {
    /// Producing stage; becomes the directory name.
    pub stage: StageId,
    /// File name within the stage directory.
    pub filename: String,
    /// Artifact content.
    pub content: ArtifactContent,
}

impl ArtifactInput {
    /// Declares a JSON artifact.
    #[must_use]
    pub fn json(stage: impl Into<StageId>, filename: impl Into<String>, value: Value) -> Self {
        Self {
            stage: stage.into(),
            filename: filename.into(),
            content: ArtifactContent::Json(value),
        }
    }

    /// Declares a text artifact.
    #[must_use]
    pub fn text(
        stage: impl Into<StageId>,
        filename: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            filename: filename.into(),
            content: ArtifactContent::Text(text.into()),
        }
    }

    /// Declares a binary artifact.
    #[must_use]
    pub fn binary(
        stage: impl Into<StageId>,
        filename: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            stage: stage.into(),
            filename: filename.into(),
            content: ArtifactContent::Binary(bytes.into()),
        }
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder that writes a proof-pack for one run.
#[derive(Clone)]
pub struct ProofPackBuilder {
    /// Run identifier.
    run_id: RunId,
    /// Run metadata.
    metadata: RunMetadata,
    /// Aggregate gate verdict recorded in the manifest.
    verdict: GateVerdict,
    /// Artifacts in declared order.
    artifacts: Vec<ArtifactInput>,
    /// Explicit stage list; derived from artifacts when absent.
    stages_completed: Option<Vec<StageId>>,
    /// Size and count limits.
    limits: ProofPackLimits,
    /// Audit sink for write events.
    audit: Arc<dyn AuditSink>,
}

impl ProofPackBuilder {
    /// Creates a builder for a run.
    #[must_use]
    pub fn new(run_id: RunId, metadata: RunMetadata, verdict: GateVerdict) -> Self {
        Self {
            run_id,
            metadata,
            verdict,
            artifacts: Vec::new(),
            stages_completed: None,
            limits: ProofPackLimits::default(),
            audit: default_audit_sink(),
        }
    }

    /// Appends an artifact in declared order.
    #[must_use]
    pub fn artifact(mut self, input: ArtifactInput) -> Self {
        self.artifacts.push(input);
        self
    }

    /// Appends several artifacts in declared order.
    #[must_use]
    pub fn artifacts<I>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = ArtifactInput>,
    {
        self.artifacts.extend(inputs);
        self
    }

    /// Overrides the completed-stage list.
    #[must_use]
    pub fn stages_completed(mut self, stages: Vec<StageId>) -> Self {
        self.stages_completed = Some(stages);
        self
    }

    /// Overrides the default limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ProofPackLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Routes write events to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Validates, hashes, and persists the proof-pack under `run_dir`.
    ///
    /// `run_dir` is a store-relative directory; an empty string or `.` writes
    /// at the store root.
    ///
    /// # Errors
    ///
    /// Returns [`ProofPackError`] when an input is invalid, a limit is
    /// exceeded, or the store rejects a write.
    pub fn write<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
    ) -> Result<ProofPack, ProofPackError> {
        let result = self.write_inner(store, run_dir);
        let subject = self.run_id.as_str();
        let event = match &result {
            Ok(pack) => AuditEvent::new(EVENT_PROOFPACK_WRITTEN, subject, AuditOutcome::Success)
                .with_detail(format!("{} artifacts", pack.manifest.artifacts.len()))
                .with_hash(pack.manifest_hash.as_str()),
            Err(err) => AuditEvent::new(EVENT_PROOFPACK_WRITTEN, subject, AuditOutcome::Rejected)
                .with_detail(err.to_string()),
        };
        self.audit.record(&event);
        result
    }

    /// Performs the write without auditing.
    fn write_inner<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
    ) -> Result<ProofPack, ProofPackError> {
        let prepared = self.prepare()?;
        let entries: Vec<ArtifactEntry> = prepared.iter().map(|item| item.entry.clone()).collect();
        let leaves: Vec<_> = entries.iter().map(|entry| entry.hash.clone()).collect();
        let tree = build_merkle_tree(&leaves);
        let stages_completed =
            self.stages_completed.clone().unwrap_or_else(|| distinct_stages(&entries));
        let pack = assemble(
            ManifestBody {
                run_id: self.run_id.clone(),
                artifacts: entries,
                metadata: self.metadata.clone(),
                stages_completed,
                verdict: self.verdict,
            },
            tree,
        )?;
        if pack.manifest_bytes.len() > self.limits.max_manifest_bytes {
            return Err(ProofPackError::ManifestTooLarge {
                max_bytes: self.limits.max_manifest_bytes,
                actual_bytes: pack.manifest_bytes.len(),
            });
        }
        let tree_bytes = canonical_json_bytes(&pack.merkle_tree)?;

        for item in &prepared {
            store.write(&join_path(run_dir, &item.entry.path), &item.bytes)?;
            store.write(&join_path(run_dir, &item.sidecar), item.entry.hash.as_str().as_bytes())?;
        }
        store.write(&join_path(run_dir, MANIFEST_FILE), &pack.manifest_bytes)?;
        let hash_path = join_path(run_dir, MANIFEST_HASH_FILE);
        store.write(&hash_path, pack.manifest_hash.as_str().as_bytes())?;
        store.write(&join_path(run_dir, MERKLE_TREE_FILE), &tree_bytes)?;
        Ok(pack)
    }

    /// Validates every input and computes its bytes and entry.
    fn prepare(&self) -> Result<Vec<PreparedArtifact>, ProofPackError> {
        if self.artifacts.len() > self.limits.max_artifacts {
            return Err(ProofPackError::TooManyArtifacts {
                max: self.limits.max_artifacts,
                actual: self.artifacts.len(),
            });
        }
        let mut claimed = BTreeSet::new();
        let mut prepared = Vec::with_capacity(self.artifacts.len());
        for input in &self.artifacts {
            validate_path_segment(input.stage.as_str())?;
            validate_path_segment(&input.filename)?;
            let path = join_path(input.stage.as_str(), &input.filename);
            let sidecar = sidecar_path(&input.stage, &input.filename);
            for claim in [&path, &sidecar] {
                if !claimed.insert(claim.clone()) {
                    return Err(ProofPackError::DuplicateArtifact(claim.clone()));
                }
            }
            let bytes = input.content.canonical_bytes()?;
            if bytes.len() > self.limits.max_artifact_bytes {
                return Err(ProofPackError::ArtifactTooLarge {
                    path,
                    max_bytes: self.limits.max_artifact_bytes,
                    actual_bytes: bytes.len(),
                });
            }
            let entry = ArtifactEntry {
                stage: input.stage.clone(),
                filename: input.filename.clone(),
                path,
                hash: hash_bytes(&bytes),
                size: bytes.len() as u64,
            };
            prepared.push(PreparedArtifact {
                entry,
                sidecar,
                bytes,
            });
        }
        Ok(prepared)
    }
}

/// Validated artifact ready to persist.
struct PreparedArtifact {
    /// Manifest entry.
    entry: ArtifactEntry,
    /// Detached hash path.
    sidecar: String,
    /// Canonical bytes.
    bytes: Vec<u8>,
}

/// Returns distinct stages in first-appearance order.
fn distinct_stages(entries: &[ArtifactEntry]) -> Vec<StageId> {
    let mut seen = BTreeSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.stage.clone()))
        .map(|entry| entry.stage.clone())
        .collect()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Proof-pack write and verification errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofPackError {
    /// Store failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// Canonicalization or path validation failure.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    /// Manifest assembly failure.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Two artifacts claim the same path or detached hash path.
    #[error("duplicate artifact path: {0}")]
    DuplicateArtifact(String),
    /// Too many artifacts declared.
    #[error("too many artifacts: {actual} (max {max})")]
    TooManyArtifacts {
        /// Configured maximum.
        max: usize,
        /// Declared count.
        actual: usize,
    },
    /// An artifact exceeds the size limit.
    #[error("artifact too large: {path} ({actual_bytes} > {max_bytes})")]
    ArtifactTooLarge {
        /// Artifact path.
        path: String,
        /// Configured maximum.
        max_bytes: usize,
        /// Actual size.
        actual_bytes: usize,
    },
    /// The manifest exceeds the size limit.
    #[error("manifest too large: {actual_bytes} > {max_bytes}")]
    ManifestTooLarge {
        /// Configured maximum.
        max_bytes: usize,
        /// Actual size.
        actual_bytes: usize,
    },
    /// `manifest.json` is absent.
    #[error("manifest not found: {0}")]
    MissingManifest(String),
    /// `manifest.sha256` is absent.
    #[error("manifest hash not found: {0}")]
    MissingManifestHash(String),
    /// `manifest.sha256` does not hold a valid digest.
    #[error("malformed manifest hash: {0}")]
    MalformedManifestHash(HashError),
    /// `manifest.json` is not a valid manifest.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
