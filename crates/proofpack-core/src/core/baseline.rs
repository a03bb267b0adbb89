// crates/proofpack-core/src/core/baseline.rs
// ============================================================================
// Module: Proof-Pack Baseline Records
// Description: Baseline entries, baseline manifests, and the append-only registry.
// Purpose: Keep "compare against baseline X" stable once X is registered.
// Dependencies: crate::core::{drift, hashing, identifiers, time}, serde
// ============================================================================

//! ## Overview
//! A [`BaselineRegistry`] is an ordered, immutable list of [`BaselineEntry`]
//! values. The only way it grows is [`BaselineRegistry::append`], which returns
//! a new registry and refuses a version that is already present. There is no
//! removal or replacement.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::drift::NumericDriftThresholds;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::BaselineVersion;
use crate::core::identifiers::IntentId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Baseline Types
// ============================================================================

/// Intent artifact captured from a run for baselining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Intent identifier; becomes the `intent_<id>` directory.
    pub id: IntentId,
    /// Intent document, stored in canonical JSON form.
    pub content: Value,
}

impl IntentRecord {
    /// Creates an intent record.
    #[must_use]
    pub const fn new(id: IntentId, content: Value) -> Self {
        Self {
            id,
            content,
        }
    }
}

/// Intent file reference inside a baseline manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineIntent {
    /// Intent identifier.
    pub id: IntentId,
    /// Path relative to the baseline directory.
    pub path: String,
    /// SHA-256 of the stored intent bytes.
    pub hash: HashDigest,
}

/// Hashed description of a registered baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineManifest {
    /// Baseline version.
    pub version: BaselineVersion,
    /// Registration time supplied by the host.
    pub created_at: Timestamp,
    /// Intent files in registration order.
    pub intents: Vec<BaselineIntent>,
    /// Thresholds in force for comparisons against this baseline.
    pub thresholds: NumericDriftThresholds,
}

/// Registry record for one baseline version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// Baseline version.
    pub version: BaselineVersion,
    /// Baseline directory relative to the baseline root.
    pub path: String,
    /// Registration time supplied by the host.
    pub created_at: Timestamp,
    /// Hash of the canonical baseline manifest.
    pub manifest_hash: HashDigest,
    /// Whether the baseline was registered as certified.
    pub certified: bool,
    /// Intents captured in the baseline.
    pub intents: Vec<IntentId>,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Append-only list of baseline entries.
///
/// # Invariants
/// - Versions are unique.
/// - Entries keep registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RegistryDocument", into = "RegistryDocument")]
pub struct BaselineRegistry {
    /// Entries in registration order.
    entries: Vec<BaselineEntry>,
}

impl BaselineRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns a new registry with `entry` appended.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::VersionExists`] when the version is already
    /// registered; `self` is left untouched.
    pub fn append(&self, entry: BaselineEntry) -> Result<Self, RegistryError> {
        if self.contains(&entry.version) {
            return Err(RegistryError::VersionExists {
                version: entry.version,
            });
        }
        let mut entries = self.entries.clone();
        entries.push(entry);
        Ok(Self {
            entries,
        })
    }

    /// Returns the entry for a version.
    #[must_use]
    pub fn get(&self, version: &BaselineVersion) -> Option<&BaselineEntry> {
        self.entries.iter().find(|entry| &entry.version == version)
    }

    /// Returns true when a version is registered.
    #[must_use]
    pub fn contains(&self, version: &BaselineVersion) -> bool {
        self.get(version).is_some()
    }

    /// Returns every entry in registration order.
    #[must_use]
    pub fn list(&self) -> &[BaselineEntry] {
        &self.entries
    }

    /// Returns the number of registered baselines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persisted form of the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    /// Entries in registration order.
    baselines: Vec<BaselineEntry>,
}

impl TryFrom<RegistryDocument> for BaselineRegistry {
    type Error = RegistryError;

    fn try_from(document: RegistryDocument) -> Result<Self, Self::Error> {
        document
            .baselines
            .into_iter()
            .try_fold(Self::new(), |registry, entry| registry.append(entry))
    }
}

impl From<BaselineRegistry> for RegistryDocument {
    fn from(registry: BaselineRegistry) -> Self {
        Self {
            baselines: registry.entries,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Registry contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Version already registered.
    #[error("baseline version already exists: {version}")]
    VersionExists {
        /// Existing version.
        version: BaselineVersion,
    },
}
