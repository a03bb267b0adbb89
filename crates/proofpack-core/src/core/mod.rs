// crates/proofpack-core/src/core/mod.rs
// ============================================================================
// Module: Proof-Pack Core Types
// Description: Canonical forms, hashing, Merkle trees, manifests, and records.
// Purpose: Provide the pure, serializable building blocks of proof-packs.
// Dependencies: serde, serde_json, sha2, time
// ============================================================================

//! ## Overview
//! Everything in `core` is pure: no file access, no clock, no logging. These
//! types and functions are the single source of truth for the bytes and hashes
//! that the runtime persists and verifies.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod baseline;
pub mod canonical;
pub mod drift;
pub mod gate;
pub mod hashing;
pub mod identifiers;
pub mod manifest;
pub mod merkle;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use baseline::BaselineEntry;
pub use baseline::BaselineIntent;
pub use baseline::BaselineManifest;
pub use baseline::BaselineRegistry;
pub use baseline::IntentRecord;
pub use baseline::RegistryError;
pub use canonical::CanonicalError;
pub use canonical::canonical_json_bytes;
pub use canonical::canonical_path;
pub use canonical::canonical_text;
pub use canonical::canonicalize;
pub use canonical::validate_relative_path;
pub use drift::DriftLevel;
pub use drift::DriftResult;
pub use drift::NumericDriftThresholds;
pub use drift::StructuralSnapshot;
pub use drift::ThresholdError;
pub use drift::ThresholdSymbol;
pub use drift::classify_hash;
pub use drift::classify_numeric;
pub use drift::classify_structural;
pub use drift::max_drift_level;
pub use gate::GateChainResult;
pub use gate::GateResult;
pub use gate::GateVerdict;
pub use gate::Violation;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::hash_canonical_text;
pub use hashing::hash_str;
pub use identifiers::BaselineVersion;
pub use identifiers::GateId;
pub use identifiers::IdentifierError;
pub use identifiers::IntentId;
pub use identifiers::RunId;
pub use identifiers::StageId;
pub use manifest::ArtifactEntry;
pub use manifest::Manifest;
pub use manifest::ManifestBody;
pub use manifest::ManifestError;
pub use manifest::ProofPack;
pub use manifest::RunMetadata;
pub use manifest::assemble;
pub use merkle::MerkleNode;
pub use merkle::MerkleTree;
pub use merkle::build_merkle_tree;
pub use merkle::merkle_path;
pub use merkle::verify_merkle_path;
pub use merkle::verify_merkle_tree;
pub use self::time::TimeError;
pub use self::time::Timestamp;
