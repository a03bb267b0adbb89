// crates/proofpack-core/src/runtime/store.rs
// ============================================================================
// Module: Proof-Pack In-Memory Store
// Description: Map-backed artifact store for tests and embedding.
// Purpose: Exercise the full engine without touching the filesystem.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryArtifactStore`] keeps artifacts in a sorted map keyed by
//! canonical path. Paths are validated like the filesystem store validates
//! them, so code that passes against the fake also passes against disk.
//! Clones share the same storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::canonical::canonical_path;
use crate::core::canonical::validate_relative_path;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactStore;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory artifact store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifactStore {
    /// Artifact bytes keyed by canonical path.
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Returns every stored path in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Io`] when the store lock is poisoned.
    pub fn paths(&self) -> Result<Vec<String>, ArtifactError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Removes the artifact at `path`, returning whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the path is invalid or the lock is poisoned.
    pub fn remove(&self, path: &str) -> Result<bool, ArtifactError> {
        let key = store_key(path)?;
        Ok(self.lock()?.remove(&key).is_some())
    }

    /// Locks the backing map.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, ArtifactError> {
        self.files
            .lock()
            .map_err(|_| ArtifactError::Io("artifact store mutex poisoned".to_string()))
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn read_with_limit(&self, path: &str, max_bytes: usize) -> Result<Vec<u8>, ArtifactError> {
        let key = store_key(path)?;
        let guard = self.lock()?;
        let bytes = guard.get(&key).ok_or_else(|| ArtifactError::NotFound(key.clone()))?;
        if bytes.len() > max_bytes {
            return Err(ArtifactError::TooLarge {
                path: key,
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes.clone())
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let key = store_key(path)?;
        self.lock()?.insert(key, bytes.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, ArtifactError> {
        let key = store_key(path)?;
        Ok(self.lock()?.contains_key(&key))
    }
}

/// Validates a path and returns its canonical key.
fn store_key(path: &str) -> Result<String, ArtifactError> {
    validate_relative_path(path).map_err(|err| ArtifactError::InvalidPath(err.to_string()))?;
    Ok(canonical_path(path))
}
