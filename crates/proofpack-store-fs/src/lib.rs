// crates/proofpack-store-fs/src/lib.rs
// ============================================================================
// Module: Proof-Pack Filesystem Store Library
// Description: Filesystem-backed artifact store.
// Purpose: Persist proof-packs and baselines under a root directory.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! [`FileArtifactStore`] implements `proofpack_core::ArtifactStore` over a
//! directory tree. Store paths are untrusted input: they are validated as
//! relative paths and resolved against the canonical root, so no read or
//! write can leave it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::FileArtifactStore;
