// crates/proofpack-core/src/runtime/baseline.rs
// ============================================================================
// Module: Proof-Pack Baseline Service
// Description: Registers, lists, re-checks, and certifies baselines on a store.
// Purpose: Persist immutable baselines and detect post-registration tampering.
// Dependencies: crate::{core, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! [`BaselineService`] owns one [`BaselineRegistry`] loaded from
//! `<root>/registry.json` (a missing file is an empty registry). Registering a
//! version writes:
//!
//! - `<root>/<version>/intent_<id>/intent.json` for each intent;
//! - `<root>/<version>/thresholds.json`;
//! - `<root>/<version>/baseline.manifest.json` and `baseline.manifest.sha256`;
//!
//! then appends the entry and persists the registry. A version that is already
//! registered is refused before anything is written.
//!
//! The service is single-writer: it does not lock the store, and concurrent
//! registrations from separate processes must be serialized by the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::baseline::BaselineEntry;
use crate::core::baseline::BaselineIntent;
use crate::core::baseline::BaselineManifest;
use crate::core::baseline::BaselineRegistry;
use crate::core::baseline::IntentRecord;
use crate::core::baseline::RegistryError;
use crate::core::canonical::CanonicalError;
use crate::core::canonical::canonical_json_bytes;
use crate::core::canonical::join_path;
use crate::core::canonical::validate_path_segment;
use crate::core::drift::NumericDriftThresholds;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::BaselineVersion;
use crate::core::identifiers::IntentId;
use crate::core::time::Timestamp;
use crate::interfaces::ArtifactError;
use crate::interfaces::ArtifactStore;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditOutcome;
use crate::interfaces::AuditSink;
use crate::runtime::audit::EVENT_BASELINE_CERTIFIED;
use crate::runtime::audit::EVENT_BASELINE_INTEGRITY_CHECKED;
use crate::runtime::audit::EVENT_BASELINE_REGISTERED;
use crate::runtime::audit::EVENT_BASELINE_REJECTED;
use crate::runtime::audit::default_audit_sink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default baseline root inside the store.
pub const DEFAULT_BASELINE_ROOT: &str = "baselines";
/// Registry file name under the baseline root.
pub const REGISTRY_FILE: &str = "registry.json";
/// Baseline manifest file name.
pub const BASELINE_MANIFEST_FILE: &str = "baseline.manifest.json";
/// Detached baseline manifest hash file name.
pub const BASELINE_MANIFEST_HASH_FILE: &str = "baseline.manifest.sha256";
/// Thresholds file name.
pub const THRESHOLDS_FILE: &str = "thresholds.json";
/// Intent file name inside each intent directory.
pub const INTENT_FILE: &str = "intent.json";

// ============================================================================
// SECTION: Requests and Reports
// ============================================================================

/// Inputs for registering a baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineRegistration {
    /// Version to register.
    pub version: BaselineVersion,
    /// Host-supplied registration time.
    pub created_at: Timestamp,
    /// Intent artifacts captured from the run.
    pub intents: Vec<IntentRecord>,
    /// Thresholds in force for comparisons against the baseline.
    pub thresholds: NumericDriftThresholds,
    /// Whether the baseline is registered as certified.
    pub certified: bool,
}

/// Reason an integrity check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrityFailure {
    /// File is absent.
    FileNotFound,
    /// Hash differs from the recorded hash.
    HashMismatch,
    /// File does not parse.
    Malformed,
}

/// One integrity check over a baseline file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityCheck {
    /// Baseline-relative file path.
    pub subject: String,
    /// Whether the check passed.
    pub valid: bool,
    /// Expected hash.
    pub expected: Option<String>,
    /// Observed hash, when one could be computed.
    pub actual: Option<String>,
    /// Failure reason for a failed check.
    pub failure: Option<IntegrityFailure>,
}

impl IntegrityCheck {
    /// Compares an expected hash with an observed one.
    fn compare(subject: impl Into<String>, expected: &HashDigest, actual: &HashDigest) -> Self {
        let valid = expected == actual;
        Self {
            subject: subject.into(),
            valid,
            expected: Some(expected.to_string()),
            actual: Some(actual.to_string()),
            failure: if valid { None } else { Some(IntegrityFailure::HashMismatch) },
        }
    }

    /// Builds a failed check without an observed hash.
    fn failed(
        subject: impl Into<String>,
        expected: Option<String>,
        failure: IntegrityFailure,
    ) -> Self {
        Self {
            subject: subject.into(),
            valid: false,
            expected,
            actual: None,
            failure: Some(failure),
        }
    }
}

/// Result of re-checking a registered baseline against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Checked version.
    pub version: BaselineVersion,
    /// True when every check passed.
    pub valid: bool,
    /// Hash recorded in the registry.
    pub expected_manifest_hash: HashDigest,
    /// Hash recomputed from the stored baseline manifest.
    pub actual_manifest_hash: Option<HashDigest>,
    /// Every check in evaluation order.
    pub checks: Vec<IntegrityCheck>,
}

/// Result of certifying a baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationReport {
    /// Certified version.
    pub version: BaselineVersion,
    /// True when the entry was registered as certified and is intact.
    pub certified: bool,
    /// Whether the registry entry carries the certified flag.
    pub registered_certified: bool,
    /// Integrity re-check performed for certification.
    pub integrity: IntegrityReport,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Baseline registry bound to an artifact store.
pub struct BaselineService<S> {
    /// Backing store.
    store: S,
    /// Store-relative baseline root.
    root: String,
    /// Registry as last loaded or persisted.
    registry: BaselineRegistry,
    /// Audit sink for baseline events.
    audit: Arc<dyn AuditSink>,
}

impl<S: ArtifactStore> BaselineService<S> {
    /// Loads the registry under `root`; a missing registry file is empty.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::MalformedRegistry`] when the registry file
    /// does not parse, or [`BaselineError::Artifact`] when it cannot be read.
    pub fn open(store: S, root: impl Into<String>) -> Result<Self, BaselineError> {
        let root = root.into();
        let registry_path = join_path(&root, REGISTRY_FILE);
        let registry = match store.read(&registry_path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| BaselineError::MalformedRegistry(err.to_string()))?,
            Err(ArtifactError::NotFound(_)) => BaselineRegistry::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            store,
            root,
            registry,
            audit: default_audit_sink(),
        })
    }

    /// Routes baseline events to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the current registry.
    #[must_use]
    pub const fn registry(&self) -> &BaselineRegistry {
        &self.registry
    }

    /// Returns every entry in registration order.
    #[must_use]
    pub fn list(&self) -> &[BaselineEntry] {
        self.registry.list()
    }

    /// Returns the entry for a version.
    #[must_use]
    pub fn get(&self, version: &BaselineVersion) -> Option<&BaselineEntry> {
        self.registry.get(version)
    }

    /// Registers a new baseline version.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Registry`] naming the version when it already
    /// exists, [`BaselineError::DirectoryExists`] when its directory is already
    /// populated, or another [`BaselineError`] for invalid intents and store
    /// failures.
    pub fn register(
        &mut self,
        registration: BaselineRegistration,
    ) -> Result<BaselineEntry, BaselineError> {
        let version = registration.version.clone();
        let result = self.register_inner(registration);
        let event = match &result {
            Ok(entry) => {
                AuditEvent::new(EVENT_BASELINE_REGISTERED, version.as_str(), AuditOutcome::Success)
                    .with_detail(format!("{} intents", entry.intents.len()))
                    .with_hash(entry.manifest_hash.as_str())
            }
            Err(err) => {
                AuditEvent::new(EVENT_BASELINE_REJECTED, version.as_str(), AuditOutcome::Rejected)
                    .with_detail(err.to_string())
            }
        };
        self.audit.record(&event);
        result
    }

    /// Performs registration without auditing.
    fn register_inner(
        &mut self,
        registration: BaselineRegistration,
    ) -> Result<BaselineEntry, BaselineError> {
        let BaselineRegistration {
            version,
            created_at,
            intents,
            thresholds,
            certified,
        } = registration;
        if self.registry.contains(&version) {
            return Err(RegistryError::VersionExists {
                version,
            }
            .into());
        }
        let base_dir = join_path(&self.root, version.as_str());
        if self.store.exists(&join_path(&base_dir, BASELINE_MANIFEST_FILE))? {
            return Err(BaselineError::DirectoryExists(version));
        }

        let mut seen = BTreeSet::new();
        let mut staged = Vec::with_capacity(intents.len());
        for intent in &intents {
            if !seen.insert(intent.id.clone()) {
                return Err(BaselineError::DuplicateIntent(intent.id.clone()));
            }
            let path = intent_path(&intent.id)?;
            let bytes = canonical_json_bytes(&intent.content)?;
            let record = BaselineIntent {
                id: intent.id.clone(),
                path,
                hash: hash_bytes(&bytes),
            };
            staged.push((record, bytes));
        }
        let thresholds_bytes = canonical_json_bytes(&thresholds)?;
        let manifest = BaselineManifest {
            version: version.clone(),
            created_at: created_at.clone(),
            intents: staged.iter().map(|(record, _)| record.clone()).collect(),
            thresholds,
        };
        let manifest_bytes = canonical_json_bytes(&manifest)?;
        let manifest_hash = hash_bytes(&manifest_bytes);
        let entry = BaselineEntry {
            version: version.clone(),
            path: version.as_str().to_string(),
            created_at,
            manifest_hash: manifest_hash.clone(),
            certified,
            intents: intents.iter().map(|intent| intent.id.clone()).collect(),
        };
        let next = self.registry.append(entry.clone())?;
        let registry_bytes = canonical_json_bytes(&next)?;

        for (record, bytes) in &staged {
            self.store.write(&join_path(&base_dir, &record.path), bytes)?;
        }
        self.store.write(&join_path(&base_dir, THRESHOLDS_FILE), &thresholds_bytes)?;
        self.store.write(&join_path(&base_dir, BASELINE_MANIFEST_FILE), &manifest_bytes)?;
        self.store.write(
            &join_path(&base_dir, BASELINE_MANIFEST_HASH_FILE),
            manifest_hash.as_str().as_bytes(),
        )?;
        self.store.write(&join_path(&self.root, REGISTRY_FILE), &registry_bytes)?;
        self.registry = next;
        Ok(entry)
    }

    /// Re-checks a registered version against the store.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::NotFound`] when the version is not registered.
    /// Tampering is reported in the returned report, not as an error.
    pub fn check_integrity(
        &self,
        version: &BaselineVersion,
    ) -> Result<IntegrityReport, BaselineError> {
        let entry =
            self.registry.get(version).ok_or_else(|| BaselineError::NotFound(version.clone()))?;
        let report = self.check_entry(entry);
        let outcome = if report.valid { AuditOutcome::Success } else { AuditOutcome::Failure };
        self.audit.record(
            &AuditEvent::new(EVENT_BASELINE_INTEGRITY_CHECKED, version.as_str(), outcome)
                .with_hash(entry.manifest_hash.as_str()),
        );
        Ok(report)
    }

    /// Re-checks integrity and reports whether the version is certified.
    ///
    /// The registry entry is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::NotFound`] when the version is not registered.
    pub fn certify(&self, version: &BaselineVersion) -> Result<CertificationReport, BaselineError> {
        let entry =
            self.registry.get(version).ok_or_else(|| BaselineError::NotFound(version.clone()))?;
        let integrity = self.check_entry(entry);
        let certified = entry.certified && integrity.valid;
        let outcome = if certified { AuditOutcome::Success } else { AuditOutcome::Failure };
        let detail = if !entry.certified {
            "entry not registered as certified"
        } else if integrity.valid {
            "certified"
        } else {
            "integrity check failed"
        };
        self.audit.record(
            &AuditEvent::new(EVENT_BASELINE_CERTIFIED, version.as_str(), outcome)
                .with_detail(detail)
                .with_hash(entry.manifest_hash.as_str()),
        );
        Ok(CertificationReport {
            version: version.clone(),
            certified,
            registered_certified: entry.certified,
            integrity,
        })
    }

    /// Recomputes every baseline hash from the store for one entry.
    #[must_use]
    pub fn check_entry(&self, entry: &BaselineEntry) -> IntegrityReport {
        let base_dir = join_path(&self.root, &entry.path);
        let expected = &entry.manifest_hash;
        let mut checks = Vec::new();
        let mut actual_manifest_hash = None;

        let manifest = match self.store.read(&join_path(&base_dir, BASELINE_MANIFEST_FILE)) {
            Ok(bytes) => {
                let actual = hash_bytes(&bytes);
                checks.push(IntegrityCheck::compare(BASELINE_MANIFEST_FILE, expected, &actual));
                actual_manifest_hash = Some(actual);
                match serde_json::from_slice::<BaselineManifest>(&bytes) {
                    Ok(manifest) => Some(manifest),
                    Err(_) => {
                        checks.push(IntegrityCheck::failed(
                            BASELINE_MANIFEST_FILE,
                            None,
                            IntegrityFailure::Malformed,
                        ));
                        None
                    }
                }
            }
            Err(_) => {
                checks.push(IntegrityCheck::failed(
                    BASELINE_MANIFEST_FILE,
                    Some(expected.to_string()),
                    IntegrityFailure::FileNotFound,
                ));
                None
            }
        };

        checks.push(self.check_detached_hash(&base_dir, expected));

        if let Some(manifest) = manifest {
            if manifest.version != entry.version {
                checks.push(IntegrityCheck {
                    subject: BASELINE_MANIFEST_FILE.to_string(),
                    valid: false,
                    expected: Some(entry.version.to_string()),
                    actual: Some(manifest.version.to_string()),
                    failure: Some(IntegrityFailure::Malformed),
                });
            }
            for intent in &manifest.intents {
                checks.push(self.check_file(&base_dir, &intent.path, &intent.hash));
            }
            match canonical_json_bytes(&manifest.thresholds) {
                Ok(bytes) => {
                    checks.push(self.check_file(&base_dir, THRESHOLDS_FILE, &hash_bytes(&bytes)));
                }
                Err(_) => checks.push(IntegrityCheck::failed(
                    THRESHOLDS_FILE,
                    None,
                    IntegrityFailure::Malformed,
                )),
            }
        }

        let valid = checks.iter().all(|check| check.valid);
        IntegrityReport {
            version: entry.version.clone(),
            valid,
            expected_manifest_hash: expected.clone(),
            actual_manifest_hash,
            checks,
        }
    }

    /// Compares the detached baseline hash with the registry hash.
    fn check_detached_hash(&self, base_dir: &str, expected: &HashDigest) -> IntegrityCheck {
        match self.store.read(&join_path(base_dir, BASELINE_MANIFEST_HASH_FILE)) {
            Ok(raw) => {
                let text = String::from_utf8_lossy(&raw);
                match HashDigest::parse(text.trim()) {
                    Ok(actual) => {
                        IntegrityCheck::compare(BASELINE_MANIFEST_HASH_FILE, expected, &actual)
                    }
                    Err(_) => IntegrityCheck::failed(
                        BASELINE_MANIFEST_HASH_FILE,
                        Some(expected.to_string()),
                        IntegrityFailure::Malformed,
                    ),
                }
            }
            Err(_) => IntegrityCheck::failed(
                BASELINE_MANIFEST_HASH_FILE,
                Some(expected.to_string()),
                IntegrityFailure::FileNotFound,
            ),
        }
    }

    /// Hashes a baseline file and compares it with an expected hash.
    fn check_file(&self, base_dir: &str, relative: &str, expected: &HashDigest) -> IntegrityCheck {
        match self.store.read(&join_path(base_dir, relative)) {
            Ok(bytes) => IntegrityCheck::compare(relative, expected, &hash_bytes(&bytes)),
            Err(_) => IntegrityCheck::failed(
                relative,
                Some(expected.to_string()),
                IntegrityFailure::FileNotFound,
            ),
        }
    }
}

/// Returns `intent_<id>/intent.json`, validating the directory name.
fn intent_path(id: &IntentId) -> Result<String, BaselineError> {
    let dir = format!("intent_{id}");
    validate_path_segment(&dir).map_err(|err| BaselineError::InvalidIntent {
        id: id.clone(),
        reason: err.to_string(),
    })?;
    Ok(join_path(&dir, INTENT_FILE))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Baseline service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BaselineError {
    /// Registry contract violation, including re-registration.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Version is not registered.
    #[error("baseline version not found: {0}")]
    NotFound(BaselineVersion),
    /// The version directory already holds a baseline manifest.
    #[error("baseline directory already populated for version: {0}")]
    DirectoryExists(BaselineVersion),
    /// Two intents share an id.
    #[error("duplicate intent id: {0}")]
    DuplicateIntent(IntentId),
    /// Intent id cannot be used as a directory name.
    #[error("invalid intent id {id}: {reason}")]
    InvalidIntent {
        /// Offending id.
        id: IntentId,
        /// Validation message.
        reason: String,
    },
    /// `registry.json` does not parse.
    #[error("malformed baseline registry: {0}")]
    MalformedRegistry(String),
    /// Store failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    /// Canonicalization failure.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
    /// Hashing failure.
    #[error(transparent)]
    Hash(#[from] HashError),
}
