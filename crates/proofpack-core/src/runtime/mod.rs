// crates/proofpack-core/src/runtime/mod.rs
// ============================================================================
// Module: Proof-Pack Runtime
// Description: Boundary services that read, write, and audit proof-packs.
// Purpose: Connect the pure core to an artifact store and an audit sink.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime services are the only code that performs I/O or emits audit events:
//! the proof-pack writer and verifier, the gate chain, and the baseline
//! service. Drift reports live here because they compare whole runs.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod baseline;
pub mod drift;
pub mod gate_chain;
pub mod proofpack;
pub mod store;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use baseline::BaselineError;
pub use baseline::BaselineRegistration;
pub use baseline::BaselineService;
pub use baseline::CertificationReport;
pub use baseline::IntegrityCheck;
pub use baseline::IntegrityFailure;
pub use baseline::IntegrityReport;
pub use drift::DriftCheck;
pub use drift::DriftCheckKind;
pub use drift::DriftReport;
pub use drift::compare_manifests;
pub use drift::compare_metrics;
pub use drift::gate_metrics;
pub use gate_chain::BoxedGate;
pub use gate_chain::FnGate;
pub use gate_chain::Gate;
pub use gate_chain::GateChain;
pub use gate_chain::GateChainError;
pub use gate_chain::GateRegistry;
pub use gate_chain::fn_gate;
pub use proofpack::ArtifactContent;
pub use proofpack::ArtifactInput;
pub use proofpack::ProofPackBuilder;
pub use proofpack::ProofPackError;
pub use proofpack::ProofPackLimits;
pub use store::InMemoryArtifactStore;
pub use verifier::CheckFailure;
pub use verifier::CheckKind;
pub use verifier::ProofPackVerifier;
pub use verifier::VerifyCheck;
pub use verifier::VerifyResult;
