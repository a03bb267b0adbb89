// crates/proofpack-core/src/core/manifest.rs
// ============================================================================
// Module: Proof-Pack Manifest
// Description: Manifest schema, artifact entries, and proof-pack assembly.
// Purpose: Bind a run's artifact hashes, Merkle root, and verdict into one hash.
// Dependencies: crate::core::{canonical, gate, hashing, identifiers, merkle, time}
// ============================================================================

//! ## Overview
//! A [`Manifest`] lists every artifact of a run in declared order together
//! with the Merkle root over their hashes. [`assemble`] turns a manifest body
//! and its tree into a [`ProofPack`]: the manifest, its canonical bytes, and
//! the SHA-256 of those bytes. Assembly is pure; persistence lives in the
//! runtime writer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::canonical::canonical_json_bytes;
use crate::core::canonical::join_path;
use crate::core::gate::GateVerdict;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::RunId;
use crate::core::identifiers::StageId;
use crate::core::merkle::MerkleTree;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest schema version written into every manifest.
pub const MANIFEST_VERSION: &str = "proofpack.v1";
/// Manifest file name inside a run directory.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Detached manifest hash file name inside a run directory.
pub const MANIFEST_HASH_FILE: &str = "manifest.sha256";
/// Persisted Merkle tree file name inside a run directory.
pub const MERKLE_TREE_FILE: &str = "merkle-tree.json";
/// Extension used for detached hash files.
pub const SIDECAR_EXTENSION: &str = "sha256";

// ============================================================================
// SECTION: Manifest Types
// ============================================================================

/// Hash record for one artifact of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Stage that produced the artifact.
    pub stage: StageId,
    /// File name within the stage directory.
    pub filename: String,
    /// Canonical relative path `<stage>/<filename>`.
    pub path: String,
    /// SHA-256 of the stored bytes.
    pub hash: HashDigest,
    /// Stored size in bytes.
    pub size: u64,
}

impl ArtifactEntry {
    /// Returns the detached hash path `<stage>/<filename-without-ext>.sha256`.
    #[must_use]
    pub fn sidecar_path(&self) -> String {
        sidecar_path(&self.stage, &self.filename)
    }
}

/// Returns the detached hash path for an artifact.
#[must_use]
pub fn sidecar_path(stage: &StageId, filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    join_path(stage.as_str(), &format!("{stem}.{SIDECAR_EXTENSION}"))
}

/// Descriptive metadata recorded with a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Version of the pipeline that produced the run.
    pub pipeline_version: String,
    /// Host-supplied generation time.
    pub generated_at: Timestamp,
    /// Free-form run parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

/// Immutable manifest of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version.
    pub manifest_version: String,
    /// Hash algorithm used for every digest in the manifest.
    pub hash_algorithm: HashAlgorithm,
    /// Run identifier.
    pub run_id: RunId,
    /// Artifacts in declared order.
    pub artifacts: Vec<ArtifactEntry>,
    /// Merkle root over the artifact hashes in declared order.
    pub merkle_root: HashDigest,
    /// Run metadata.
    pub metadata: RunMetadata,
    /// Stages completed by the run.
    pub stages_completed: Vec<StageId>,
    /// Aggregate gate verdict for the run.
    pub verdict: GateVerdict,
}

impl Manifest {
    /// Returns the artifact hashes in manifest order.
    #[must_use]
    pub fn artifact_hashes(&self) -> Vec<HashDigest> {
        self.artifacts.iter().map(|entry| entry.hash.clone()).collect()
    }

    /// Returns the canonical JSON bytes of the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Canonicalization`] when serialization fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        canonical_json_bytes(self).map_err(|err| ManifestError::Canonicalization(err.to_string()))
    }
}

/// Caller-supplied manifest fields before assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestBody {
    /// Run identifier.
    pub run_id: RunId,
    /// Artifacts in declared order.
    pub artifacts: Vec<ArtifactEntry>,
    /// Run metadata.
    pub metadata: RunMetadata,
    /// Stages completed by the run.
    pub stages_completed: Vec<StageId>,
    /// Aggregate gate verdict for the run.
    pub verdict: GateVerdict,
}

/// Assembled proof-pack ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofPack {
    /// Assembled manifest.
    pub manifest: Manifest,
    /// Merkle tree over the manifest's artifact hashes.
    pub merkle_tree: MerkleTree,
    /// Canonical manifest bytes, exactly as persisted.
    pub manifest_bytes: Vec<u8>,
    /// SHA-256 of `manifest_bytes`.
    pub manifest_hash: HashDigest,
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Assembles a proof-pack from a manifest body and its Merkle tree.
///
/// # Errors
///
/// Returns [`ManifestError::MerkleLeafMismatch`] when the tree's leaves are
/// not the body's artifact hashes in order, or
/// [`ManifestError::Canonicalization`] when the manifest cannot be encoded.
pub fn assemble(body: ManifestBody, merkle_tree: MerkleTree) -> Result<ProofPack, ManifestError> {
    let leaves = merkle_tree.leaf_hashes();
    let declared: Vec<HashDigest> = body.artifacts.iter().map(|entry| entry.hash.clone()).collect();
    if leaves != declared {
        return Err(ManifestError::MerkleLeafMismatch {
            expected: declared.len(),
            actual: leaves.len(),
        });
    }
    let manifest = Manifest {
        manifest_version: MANIFEST_VERSION.to_string(),
        hash_algorithm: DEFAULT_HASH_ALGORITHM,
        run_id: body.run_id,
        artifacts: body.artifacts,
        merkle_root: merkle_tree.root_hash.clone(),
        metadata: body.metadata,
        stages_completed: body.stages_completed,
        verdict: body.verdict,
    };
    let manifest_bytes = manifest.canonical_bytes()?;
    let manifest_hash = hash_bytes(&manifest_bytes);
    Ok(ProofPack {
        manifest,
        merkle_tree,
        manifest_bytes,
        manifest_hash,
    })
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Manifest assembly errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Manifest could not be canonicalized.
    #[error("manifest canonicalization failed: {0}")]
    Canonicalization(String),
    /// Tree leaves do not match the declared artifact hashes.
    #[error(
        "merkle leaves do not match artifact hashes ({expected} artifacts, {actual} leaves)"
    )]
    MerkleLeafMismatch {
        /// Number of declared artifacts.
        expected: usize,
        /// Number of tree leaves.
        actual: usize,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
