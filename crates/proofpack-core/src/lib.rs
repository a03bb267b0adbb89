// crates/proofpack-core/src/lib.rs
// ============================================================================
// Module: Proof-Pack Core Library
// Description: Public API surface for the proof-pack engine.
// Purpose: Expose core types, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Proof-pack core gives every pipeline run a replayable, cryptographic record
//! of what it produced. Artifacts are canonicalized and hashed, a Merkle tree
//! commits to their order, and an immutable manifest binds everything to a
//! single hash that can be re-verified bit-for-bit later. A fail-closed gate
//! chain, a drift classifier, and an append-only baseline registry build on
//! the same primitives.
//!
//! All file access goes through [`ArtifactStore`]; the in-memory store lets
//! every operation run without a filesystem.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::ArtifactError;
pub use interfaces::ArtifactStore;
pub use interfaces::AuditEvent;
pub use interfaces::AuditOutcome;
pub use interfaces::AuditSink;
pub use runtime::BaselineError;
pub use runtime::BaselineRegistration;
pub use runtime::BaselineService;
pub use runtime::CertificationReport;
pub use runtime::CheckFailure;
pub use runtime::CheckKind;
pub use runtime::DriftReport;
pub use runtime::FileAuditSink;
pub use runtime::FnGate;
pub use runtime::Gate;
pub use runtime::GateChain;
pub use runtime::GateChainError;
pub use runtime::GateRegistry;
pub use runtime::InMemoryArtifactStore;
pub use runtime::IntegrityReport;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::ProofPackBuilder;
pub use runtime::ProofPackError;
pub use runtime::ProofPackLimits;
pub use runtime::ProofPackVerifier;
pub use runtime::StderrAuditSink;
pub use runtime::VerifyCheck;
pub use runtime::VerifyResult;
