// crates/proofpack-config/src/lib.rs
// ============================================================================
// Module: Proof-Pack Config Library
// Description: Configuration model and loader for proof-pack tooling.
// Purpose: Expose a single validated configuration entry point.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Loads `proofpack.toml`, validates it fail-closed, and converts its sections
//! into the runtime types of `proofpack-core`: limits, gate order, drift
//! thresholds, the baseline root, and the audit sink.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuditConfig;
pub use config::AuditSinkKind;
pub use config::BaselinesConfig;
pub use config::ConfigError;
pub use config::DriftConfig;
pub use config::GatesConfig;
pub use config::LimitsConfig;
pub use config::ProofPackConfig;
pub use config::VerifyConfig;
