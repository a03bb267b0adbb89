// crates/proofpack-core/tests/baseline.rs
// ============================================================================
// Module: Baseline Registry Tests
// Description: Tests for append-only registration, integrity, and certification.
// ============================================================================
//! ## Overview
//! Validates that versions register once, that the registry survives a
//! reload, and that integrity checks catch changes to any baseline file.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;

use proofpack_core::ArtifactStore;
use proofpack_core::AuditOutcome;
use proofpack_core::BaselineEntry;
use proofpack_core::BaselineError;
use proofpack_core::BaselineManifest;
use proofpack_core::BaselineRegistry;
use proofpack_core::BaselineService;
use proofpack_core::BaselineVersion;
use proofpack_core::InMemoryArtifactStore;
use proofpack_core::IntentId;
use proofpack_core::IntentRecord;
use proofpack_core::MemoryAuditSink;
use proofpack_core::NumericDriftThresholds;
use proofpack_core::RegistryError;
use proofpack_core::ThresholdSymbol;
use proofpack_core::Timestamp;
use proofpack_core::hash_bytes;
use proofpack_core::runtime::BaselineRegistration;
use proofpack_core::runtime::IntegrityFailure;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

const ROOT: &str = "baselines";

fn version(value: &str) -> BaselineVersion {
    BaselineVersion::parse(value).unwrap()
}

fn thresholds() -> NumericDriftThresholds {
    let symbol = |value: f64, rule: &str| {
        ThresholdSymbol::new(value, "ratio", rule, "historical variance").unwrap()
    };
    NumericDriftThresholds::new(symbol(0.1, "soft"), symbol(0.2, "hard"), symbol(0.5, "critical"))
        .unwrap()
}

fn registration(value: &str, certified: bool) -> BaselineRegistration {
    BaselineRegistration {
        version: version(value),
        created_at: Timestamp::parse("2026-04-01T12:00:00Z").unwrap(),
        intents: vec![
            IntentRecord::new(IntentId::new("summary"), json!({"goal": "summarize", "len": 3})),
            IntentRecord::new(IntentId::new("tone"), json!({"tone": "neutral"})),
        ],
        thresholds: thresholds(),
        certified,
    }
}

fn service(store: &InMemoryArtifactStore) -> BaselineService<InMemoryArtifactStore> {
    BaselineService::open(store.clone(), ROOT).unwrap()
}

// ============================================================================
// SECTION: Registration
// ============================================================================

/// Tests registration writes the baseline files and the registry.
#[test]
fn test_register_writes_baseline_layout() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    let entry = baselines.register(registration("v1.0.0", true)).unwrap();

    assert_eq!(
        store.paths().unwrap(),
        vec![
            "baselines/registry.json",
            "baselines/v1.0.0/baseline.manifest.json",
            "baselines/v1.0.0/baseline.manifest.sha256",
            "baselines/v1.0.0/intent_summary/intent.json",
            "baselines/v1.0.0/intent_tone/intent.json",
            "baselines/v1.0.0/thresholds.json",
        ]
    );
    assert_eq!(
        store.read("baselines/v1.0.0/intent_summary/intent.json").unwrap(),
        br#"{"goal":"summarize","len":3}"#
    );
    let manifest_bytes = store.read("baselines/v1.0.0/baseline.manifest.json").unwrap();
    assert_eq!(entry.manifest_hash, hash_bytes(&manifest_bytes));
    assert_eq!(
        store.read("baselines/v1.0.0/baseline.manifest.sha256").unwrap(),
        entry.manifest_hash.as_str().as_bytes()
    );

    let manifest: BaselineManifest = serde_json::from_slice(&manifest_bytes).unwrap();
    assert_eq!(manifest.version, version("v1.0.0"));
    assert_eq!(manifest.intents.len(), 2);
    assert_eq!(manifest.intents[0].path, "intent_summary/intent.json");
    assert_eq!(manifest.thresholds, thresholds());

    assert_eq!(entry.version, version("v1.0.0"));
    assert_eq!(entry.path, "v1.0.0");
    assert!(entry.certified);
    assert_eq!(entry.intents, vec![IntentId::new("summary"), IntentId::new("tone")]);
    assert_eq!(baselines.list(), &[entry]);
}

/// Tests a version registers at most once.
#[test]
fn test_duplicate_version_is_rejected() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    baselines.register(registration("v1.0.0", false)).unwrap();
    let before = store.paths().unwrap();
    let registry_before = store.read("baselines/registry.json").unwrap();

    let err = baselines.register(registration("v1.0.0", true)).unwrap_err();
    assert_eq!(
        err,
        BaselineError::Registry(RegistryError::VersionExists {
            version: version("v1.0.0"),
        })
    );
    assert!(err.to_string().contains("v1.0.0"));
    assert_eq!(baselines.list().len(), 1);
    assert!(!baselines.list()[0].certified);
    assert_eq!(store.paths().unwrap(), before);
    assert_eq!(store.read("baselines/registry.json").unwrap(), registry_before);
}

/// Tests a populated version directory blocks registration.
#[test]
fn test_populated_directory_is_rejected() {
    let store = InMemoryArtifactStore::new();
    store.write("baselines/v2/baseline.manifest.json", b"{}").unwrap();
    let mut baselines = service(&store);
    let err = baselines.register(registration("v2", false)).unwrap_err();
    assert_eq!(err, BaselineError::DirectoryExists(version("v2")));
    assert!(baselines.list().is_empty());
}

/// Tests intent ids must be unique and usable as directory names.
#[test]
fn test_invalid_intents_are_rejected() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);

    let mut duplicate = registration("v1", false);
    duplicate.intents.push(IntentRecord::new(IntentId::new("tone"), json!({})));
    let err = baselines.register(duplicate).unwrap_err();
    assert_eq!(err, BaselineError::DuplicateIntent(IntentId::new("tone")));

    let mut nested = registration("v1", false);
    nested.intents = vec![IntentRecord::new(IntentId::new("a/b"), json!({}))];
    let err = baselines.register(nested).unwrap_err();
    assert!(matches!(err, BaselineError::InvalidIntent { .. }));

    assert!(store.paths().unwrap().is_empty());
}

/// Tests version strings are validated.
#[test]
fn test_version_validation() {
    for value in ["v1.0.0", "2026-04-01", "release_3"] {
        assert!(BaselineVersion::parse(value).is_ok(), "{value}");
    }
    for value in ["", ".", "..", "v1/v2", "v 1", "v1\\x"] {
        assert!(BaselineVersion::parse(value).is_err(), "{value:?}");
    }
    assert!(serde_json::from_value::<BaselineVersion>(json!("../etc")).is_err());
}

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// Tests the registry reloads from the store in registration order.
#[test]
fn test_registry_reloads_from_store() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    baselines.register(registration("v2.0.0", false)).unwrap();
    baselines.register(registration("v1.0.0", true)).unwrap();

    let reopened = service(&store);
    let versions: Vec<&str> =
        reopened.list().iter().map(|entry| entry.version.as_str()).collect();
    assert_eq!(versions, vec!["v2.0.0", "v1.0.0"]);
    assert_eq!(reopened.registry(), baselines.registry());
    assert!(reopened.get(&version("v1.0.0")).unwrap().certified);
    assert!(reopened.get(&version("v3")).is_none());
}

/// Tests a missing registry is empty and a malformed one is an error.
#[test]
fn test_open_handles_missing_and_malformed_registry() {
    let store = InMemoryArtifactStore::new();
    assert!(service(&store).list().is_empty());

    store.write("baselines/registry.json", b"[not json").unwrap();
    let err = BaselineService::open(store.clone(), ROOT).err().unwrap();
    assert!(matches!(err, BaselineError::MalformedRegistry(_)));
}

/// Tests a registry document with a repeated version does not load.
#[test]
fn test_registry_document_rejects_duplicate_versions() {
    let entry = BaselineEntry {
        version: version("v1"),
        path: "v1".to_string(),
        created_at: Timestamp::parse("2026-04-01T12:00:00Z").unwrap(),
        manifest_hash: hash_bytes(b"manifest"),
        certified: false,
        intents: Vec::new(),
    };
    let registry = BaselineRegistry::new().append(entry.clone()).unwrap();
    let mut document = serde_json::to_value(&registry).unwrap();
    assert_eq!(document["baselines"].as_array().unwrap().len(), 1);

    document["baselines"].as_array_mut().unwrap().push(serde_json::to_value(&entry).unwrap());
    assert!(serde_json::from_value::<BaselineRegistry>(document).is_err());

    assert_eq!(
        registry.append(entry).unwrap_err(),
        RegistryError::VersionExists {
            version: version("v1"),
        }
    );
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// SECTION: Integrity and Certification
// ============================================================================

/// Tests a freshly registered baseline is intact.
#[test]
fn test_fresh_baseline_is_intact() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    let entry = baselines.register(registration("v1", true)).unwrap();
    let report = baselines.check_integrity(&version("v1")).unwrap();
    assert!(report.valid);
    assert_eq!(report.actual_manifest_hash, Some(entry.manifest_hash.clone()));
    assert_eq!(report.expected_manifest_hash, entry.manifest_hash);
    assert_eq!(report.checks.len(), 5);
}

/// Tests edits to any baseline file are detected.
#[test]
fn test_tampering_is_detected() {
    let other_hash = hash_bytes(b"other");
    let cases: [(&str, &[u8], &str, IntegrityFailure); 4] = [
        (
            "baselines/v1/intent_tone/intent.json",
            br#"{"tone":"snarky"}"#,
            "intent_tone/intent.json",
            IntegrityFailure::HashMismatch,
        ),
        ("baselines/v1/thresholds.json", b"{}", "thresholds.json", IntegrityFailure::HashMismatch),
        (
            "baselines/v1/baseline.manifest.sha256",
            b"zz",
            "baseline.manifest.sha256",
            IntegrityFailure::Malformed,
        ),
        (
            "baselines/v1/baseline.manifest.sha256",
            other_hash.as_str().as_bytes(),
            "baseline.manifest.sha256",
            IntegrityFailure::HashMismatch,
        ),
    ];
    for (path, bytes, subject, failure) in cases {
        let store = InMemoryArtifactStore::new();
        let mut baselines = service(&store);
        baselines.register(registration("v1", true)).unwrap();
        store.write(path, bytes).unwrap();

        let report = baselines.check_integrity(&version("v1")).unwrap();
        assert!(!report.valid, "{path}");
        let failed: Vec<_> = report.checks.iter().filter(|check| !check.valid).collect();
        assert_eq!(failed.len(), 1, "{path}: {failed:?}");
        assert_eq!(failed[0].subject, subject);
        assert_eq!(failed[0].failure, Some(failure));
    }
}

/// Tests a rewritten baseline manifest is detected.
#[test]
fn test_rewritten_manifest_is_detected() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    let entry = baselines.register(registration("v1", true)).unwrap();
    store.write("baselines/v1/baseline.manifest.json", b"{\"version\":\"v1\"}").unwrap();

    let report = baselines.check_integrity(&version("v1")).unwrap();
    assert!(!report.valid);
    assert_eq!(report.expected_manifest_hash, entry.manifest_hash);
    assert_eq!(report.actual_manifest_hash, Some(hash_bytes(b"{\"version\":\"v1\"}")));
    assert_eq!(report.checks[0].failure, Some(IntegrityFailure::HashMismatch));
    assert_eq!(report.checks[1].failure, Some(IntegrityFailure::Malformed));
}

/// Tests deleted baseline files are reported as missing.
#[test]
fn test_deleted_files_are_missing() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    baselines.register(registration("v1", true)).unwrap();
    store.remove("baselines/v1/intent_summary/intent.json").unwrap();
    store.remove("baselines/v1/baseline.manifest.json").unwrap();

    let report = baselines.check_integrity(&version("v1")).unwrap();
    assert!(!report.valid);
    assert_eq!(report.actual_manifest_hash, None);
    assert_eq!(report.checks[0].failure, Some(IntegrityFailure::FileNotFound));
}

/// Tests unknown versions are errors.
#[test]
fn test_unknown_version_is_not_found() {
    let store = InMemoryArtifactStore::new();
    let baselines = service(&store);
    let err = baselines.check_integrity(&version("v9")).unwrap_err();
    assert_eq!(err, BaselineError::NotFound(version("v9")));
    assert!(baselines.certify(&version("v9")).is_err());
}

/// Tests certification requires the flag and an intact baseline.
#[test]
fn test_certify() {
    let store = InMemoryArtifactStore::new();
    let mut baselines = service(&store);
    baselines.register(registration("certified", true)).unwrap();
    baselines.register(registration("draft", false)).unwrap();

    let report = baselines.certify(&version("certified")).unwrap();
    assert!(report.certified);
    assert!(report.registered_certified);
    assert!(report.integrity.valid);

    let report = baselines.certify(&version("draft")).unwrap();
    assert!(!report.certified);
    assert!(!report.registered_certified);
    assert!(report.integrity.valid);

    store.write("baselines/certified/thresholds.json", b"{}").unwrap();
    let report = baselines.certify(&version("certified")).unwrap();
    assert!(!report.certified);
    assert!(report.registered_certified);
    assert!(!report.integrity.valid);
    assert!(baselines.get(&version("certified")).unwrap().certified);
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Tests registration and checks are audited.
#[test]
fn test_baseline_events_are_audited() {
    let store = InMemoryArtifactStore::new();
    let sink = MemoryAuditSink::new();
    let mut baselines = service(&store).with_audit(Arc::new(sink.clone()));
    baselines.register(registration("v1", true)).unwrap();
    baselines.register(registration("v1", true)).unwrap_err();
    baselines.check_integrity(&version("v1")).unwrap();
    baselines.certify(&version("v1")).unwrap();

    assert_eq!(
        sink.event_names(),
        vec![
            "baseline_registered",
            "baseline_rejected",
            "baseline_integrity_checked",
            "baseline_certified",
        ]
    );
    let events = sink.events();
    assert_eq!(events[0].outcome, AuditOutcome::Success);
    assert_eq!(events[1].outcome, AuditOutcome::Rejected);
    assert_eq!(events[1].subject, "v1");
    assert_eq!(events[3].detail.as_deref(), Some("certified"));
}
