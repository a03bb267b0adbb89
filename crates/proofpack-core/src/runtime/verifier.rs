// crates/proofpack-core/src/runtime/verifier.rs
// ============================================================================
// Module: Proof-Pack Verifier
// Description: Re-derives trust in a persisted proof-pack from its bytes.
// Purpose: Detect any change to a manifest or its artifacts after writing.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Verification re-reads `manifest.json`, checks it against its detached
//! hash, re-hashes every listed artifact in manifest order, and rebuilds the
//! Merkle root. Check failures are data: each one is kept with its expected
//! and actual values so a report always says *what* failed. Only structural
//! problems (missing or malformed manifest, missing or malformed detached
//! hash) abort with an error.
//!
//! The Merkle check rebuilds the root from the hashes the manifest lists. It
//! proves the files are unchanged since the manifest was written; it does not
//! prove the manifest was honestly derived when it was written.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::core::canonical::join_path;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::RunId;
use crate::core::manifest::ArtifactEntry;
use crate::core::manifest::MANIFEST_FILE;
use crate::core::manifest::MANIFEST_HASH_FILE;
use crate::core::manifest::MERKLE_TREE_FILE;
use crate::core::manifest::Manifest;
use crate::core::merkle::MerkleTree;
use crate::core::merkle::build_merkle_tree;
use crate::core::merkle::verify_merkle_tree;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactStore;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditOutcome;
use crate::interfaces::AuditSink;
use crate::runtime::audit::EVENT_PROOFPACK_VERIFIED;
use crate::runtime::audit::default_audit_sink;
use crate::runtime::proofpack::ProofPackError;
use crate::runtime::proofpack::ProofPackLimits;

// ============================================================================
// SECTION: Result Types
// ============================================================================

/// Kind of verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    /// `manifest.json` bytes against `manifest.sha256`.
    ManifestHash,
    /// One listed artifact.
    Artifact,
    /// Merkle root rebuilt from the listed hashes.
    MerkleRoot,
    /// Re-canonicalized manifest against the detached hash (strict).
    CanonicalForm,
    /// Persisted `merkle-tree.json` (strict).
    MerkleTreeFile,
}

/// Reason a check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckFailure {
    /// Content hash differs from the recorded hash.
    HashMismatch,
    /// Listed file is absent.
    FileNotFound,
    /// Stored size differs from the recorded size.
    SizeMismatch,
    /// Detached artifact hash differs from the recorded hash.
    SidecarMismatch,
    /// Detached artifact hash is absent.
    SidecarMissing,
    /// File exceeds the configured read limit.
    TooLarge,
    /// Listed path is not a valid relative path.
    InvalidPath,
    /// File could not be read.
    Unreadable,
    /// Rebuilt Merkle root differs from the recorded root.
    RootMismatch,
    /// Manifest bytes are not in canonical form.
    NotCanonical,
    /// Persisted tree does not parse or does not rebuild.
    TreeInvalid,
}

/// Outcome of a single verification check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCheck {
    /// Check kind.
    pub kind: CheckKind,
    /// File or value checked.
    pub subject: String,
    /// Whether the check passed.
    pub valid: bool,
    /// Expected value, usually a hash.
    pub expected: Option<String>,
    /// Observed value, when one could be computed.
    pub actual: Option<String>,
    /// Failure reason for a failed check.
    pub failure: Option<CheckFailure>,
}

impl VerifyCheck {
    /// Builds a passing check.
    fn pass(kind: CheckKind, subject: impl Into<String>, expected: impl Into<String>) -> Self {
        let expected = expected.into();
        Self {
            kind,
            subject: subject.into(),
            valid: true,
            actual: Some(expected.clone()),
            expected: Some(expected),
            failure: None,
        }
    }

    /// Builds a failing check.
    fn fail(
        kind: CheckKind,
        subject: impl Into<String>,
        failure: CheckFailure,
        expected: Option<String>,
        actual: Option<String>,
    ) -> Self {
        Self {
            kind,
            subject: subject.into(),
            valid: false,
            expected,
            actual,
            failure: Some(failure),
        }
    }
}

/// Structured verification report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResult {
    /// Run id from the manifest; absent when the manifest hash failed.
    pub run_id: Option<RunId>,
    /// True when every check passed.
    pub valid: bool,
    /// Every check in evaluation order.
    pub checks: Vec<VerifyCheck>,
    /// Detached manifest hash the run was verified against.
    pub manifest_hash: HashDigest,
}

impl VerifyResult {
    /// Returns the failed checks.
    pub fn failures(&self) -> impl Iterator<Item = &VerifyCheck> {
        self.checks.iter().filter(|check| !check.valid)
    }

    /// Returns the checks of one kind.
    pub fn checks_of(&self, kind: CheckKind) -> impl Iterator<Item = &VerifyCheck> {
        self.checks.iter().filter(move |check| check.kind == kind)
    }

    /// Returns a one-line summary such as `4/4 checks passed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        let passed = self.checks.len().saturating_sub(failed);
        format!("{passed}/{} checks passed", self.checks.len())
    }

    /// Builds a result whose validity follows from its checks.
    fn from_checks(
        run_id: Option<RunId>,
        checks: Vec<VerifyCheck>,
        manifest_hash: HashDigest,
    ) -> Self {
        let valid = checks.iter().all(|check| check.valid);
        Self {
            run_id,
            valid,
            checks,
            manifest_hash,
        }
    }
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Proof-pack verifier.
#[derive(Clone)]
pub struct ProofPackVerifier {
    /// Read limits.
    limits: ProofPackLimits,
    /// Audit sink for verification events.
    audit: Arc<dyn AuditSink>,
}

impl Default for ProofPackVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofPackVerifier {
    /// Creates a verifier with default limits and no auditing.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limits: ProofPackLimits::default(),
            audit: default_audit_sink(),
        }
    }

    /// Overrides the read limits.
    #[must_use]
    pub fn with_limits(mut self, limits: ProofPackLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Routes verification events to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Verifies the proof-pack stored under `run_dir`.
    ///
    /// In strict mode the verifier also re-canonicalizes the manifest, checks
    /// each artifact's detached hash, and validates `merkle-tree.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ProofPackError`] when the manifest or its detached hash is
    /// missing or malformed. Content mismatches are reported as failed checks.
    pub fn verify<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
        strict: bool,
    ) -> Result<VerifyResult, ProofPackError> {
        let result = self.verify_inner(store, run_dir, strict);
        let event = match &result {
            Ok(report) => {
                let subject = report
                    .run_id
                    .as_ref()
                    .map_or_else(|| run_dir.to_string(), |run_id| run_id.to_string());
                let outcome =
                    if report.valid { AuditOutcome::Success } else { AuditOutcome::Failure };
                AuditEvent::new(EVENT_PROOFPACK_VERIFIED, subject, outcome)
                    .with_detail(report.summary())
                    .with_hash(report.manifest_hash.as_str())
            }
            Err(err) => AuditEvent::new(EVENT_PROOFPACK_VERIFIED, run_dir, AuditOutcome::Rejected)
                .with_detail(err.to_string()),
        };
        self.audit.record(&event);
        result
    }

    /// Performs verification without auditing.
    fn verify_inner<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
        strict: bool,
    ) -> Result<VerifyResult, ProofPackError> {
        let manifest_path = join_path(run_dir, MANIFEST_FILE);
        let hash_path = join_path(run_dir, MANIFEST_HASH_FILE);
        let max_bytes = self.limits.max_manifest_bytes;
        let manifest_bytes =
            store.read_with_limit(&manifest_path, max_bytes).map_err(|err| match err {
                ArtifactError::NotFound(_) => {
                    ProofPackError::MissingManifest(manifest_path.clone())
                }
                other => ProofPackError::Artifact(other),
            })?;
        let hash_bytes_raw =
            store.read_with_limit(&hash_path, max_bytes).map_err(|err| match err {
                ArtifactError::NotFound(_) => {
                    ProofPackError::MissingManifestHash(hash_path.clone())
                }
                other => ProofPackError::Artifact(other),
            })?;
        let detached = parse_detached_hash(&hash_bytes_raw)?;

        let actual = hash_bytes(&manifest_bytes);
        if actual != detached {
            let check = VerifyCheck::fail(
                CheckKind::ManifestHash,
                MANIFEST_FILE,
                CheckFailure::HashMismatch,
                Some(detached.to_string()),
                Some(actual.to_string()),
            );
            return Ok(VerifyResult::from_checks(None, vec![check], detached));
        }

        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|err| ProofPackError::MalformedManifest(err.to_string()))?;

        let mut checks = Vec::with_capacity(manifest.artifacts.len() + 4);
        checks.push(VerifyCheck::pass(CheckKind::ManifestHash, MANIFEST_FILE, detached.as_str()));
        for entry in &manifest.artifacts {
            checks.push(self.check_artifact(store, run_dir, entry, strict));
        }
        checks.push(check_merkle_root(&manifest));
        if strict {
            checks.push(check_canonical_form(&manifest, &detached));
            checks.push(self.check_tree_file(store, run_dir, &manifest));
        }
        Ok(VerifyResult::from_checks(Some(manifest.run_id), checks, detached))
    }

    /// Re-hashes one artifact and compares hash, size, and (strict) sidecar.
    fn check_artifact<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
        entry: &ArtifactEntry,
        strict: bool,
    ) -> VerifyCheck {
        let subject = entry.path.clone();
        let expected = Some(entry.hash.to_string());
        let bytes = match store
            .read_with_limit(&join_path(run_dir, &entry.path), self.limits.max_artifact_bytes)
        {
            Ok(bytes) => bytes,
            Err(err) => {
                let failure = match err {
                    ArtifactError::NotFound(_) => CheckFailure::FileNotFound,
                    ArtifactError::TooLarge {
                        ..
                    } => CheckFailure::TooLarge,
                    ArtifactError::InvalidPath(_) => CheckFailure::InvalidPath,
                    ArtifactError::Io(_) => CheckFailure::Unreadable,
                };
                return VerifyCheck::fail(CheckKind::Artifact, subject, failure, expected, None);
            }
        };

        let actual = hash_bytes(&bytes);
        if actual != entry.hash {
            return VerifyCheck::fail(
                CheckKind::Artifact,
                subject,
                CheckFailure::HashMismatch,
                expected,
                Some(actual.to_string()),
            );
        }
        let size = bytes.len() as u64;
        if size != entry.size {
            return VerifyCheck::fail(
                CheckKind::Artifact,
                subject,
                CheckFailure::SizeMismatch,
                Some(entry.size.to_string()),
                Some(size.to_string()),
            );
        }
        if strict {
            let sidecar = join_path(run_dir, &entry.sidecar_path());
            match store.read_with_limit(&sidecar, self.limits.max_manifest_bytes) {
                Ok(raw) => {
                    let recorded = String::from_utf8_lossy(&raw).trim().to_string();
                    if recorded != entry.hash.as_str() {
                        return VerifyCheck::fail(
                            CheckKind::Artifact,
                            subject,
                            CheckFailure::SidecarMismatch,
                            expected,
                            Some(recorded),
                        );
                    }
                }
                Err(_) => {
                    return VerifyCheck::fail(
                        CheckKind::Artifact,
                        subject,
                        CheckFailure::SidecarMissing,
                        expected,
                        None,
                    );
                }
            }
        }
        VerifyCheck::pass(CheckKind::Artifact, subject, entry.hash.as_str())
    }

    /// Validates the persisted Merkle tree against the manifest.
    fn check_tree_file<S: ArtifactStore + ?Sized>(
        &self,
        store: &S,
        run_dir: &str,
        manifest: &Manifest,
    ) -> VerifyCheck {
        let expected = Some(manifest.merkle_root.to_string());
        let raw = match store
            .read_with_limit(&join_path(run_dir, MERKLE_TREE_FILE), self.limits.max_manifest_bytes)
        {
            Ok(raw) => raw,
            Err(ArtifactError::NotFound(_)) => {
                return VerifyCheck::fail(
                    CheckKind::MerkleTreeFile,
                    MERKLE_TREE_FILE,
                    CheckFailure::FileNotFound,
                    expected,
                    None,
                );
            }
            Err(_) => {
                return VerifyCheck::fail(
                    CheckKind::MerkleTreeFile,
                    MERKLE_TREE_FILE,
                    CheckFailure::Unreadable,
                    expected,
                    None,
                );
            }
        };
        let Ok(tree) = serde_json::from_slice::<MerkleTree>(&raw) else {
            return VerifyCheck::fail(
                CheckKind::MerkleTreeFile,
                MERKLE_TREE_FILE,
                CheckFailure::TreeInvalid,
                expected,
                None,
            );
        };
        let actual = Some(tree.root_hash.to_string());
        if !verify_merkle_tree(&tree) || tree.leaf_hashes() != manifest.artifact_hashes() {
            return VerifyCheck::fail(
                CheckKind::MerkleTreeFile,
                MERKLE_TREE_FILE,
                CheckFailure::TreeInvalid,
                expected,
                actual,
            );
        }
        if tree.root_hash != manifest.merkle_root {
            return VerifyCheck::fail(
                CheckKind::MerkleTreeFile,
                MERKLE_TREE_FILE,
                CheckFailure::RootMismatch,
                expected,
                actual,
            );
        }
        let root = manifest.merkle_root.as_str();
        VerifyCheck::pass(CheckKind::MerkleTreeFile, MERKLE_TREE_FILE, root)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses the detached manifest hash file.
fn parse_detached_hash(raw: &[u8]) -> Result<HashDigest, ProofPackError> {
    let text = String::from_utf8_lossy(raw);
    HashDigest::parse(text.trim()).map_err(ProofPackError::MalformedManifestHash)
}

/// Rebuilds the Merkle root from the manifest's listed hashes.
fn check_merkle_root(manifest: &Manifest) -> VerifyCheck {
    let rebuilt = build_merkle_tree(&manifest.artifact_hashes()).root_hash;
    if rebuilt == manifest.merkle_root {
        VerifyCheck::pass(CheckKind::MerkleRoot, "merkle_root", manifest.merkle_root.as_str())
    } else {
        VerifyCheck::fail(
            CheckKind::MerkleRoot,
            "merkle_root",
            CheckFailure::RootMismatch,
            Some(manifest.merkle_root.to_string()),
            Some(rebuilt.to_string()),
        )
    }
}

/// Re-canonicalizes the parsed manifest and compares its hash.
fn check_canonical_form(manifest: &Manifest, detached: &HashDigest) -> VerifyCheck {
    match manifest.canonical_bytes() {
        Ok(bytes) => {
            let actual = hash_bytes(&bytes);
            if actual == *detached {
                VerifyCheck::pass(CheckKind::CanonicalForm, MANIFEST_FILE, detached.as_str())
            } else {
                VerifyCheck::fail(
                    CheckKind::CanonicalForm,
                    MANIFEST_FILE,
                    CheckFailure::NotCanonical,
                    Some(detached.to_string()),
                    Some(actual.to_string()),
                )
            }
        }
        Err(err) => VerifyCheck::fail(
            CheckKind::CanonicalForm,
            MANIFEST_FILE,
            CheckFailure::NotCanonical,
            Some(detached.to_string()),
            Some(err.to_string()),
        ),
    }
}
