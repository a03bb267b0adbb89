// crates/proofpack-core/tests/drift.rs
// ============================================================================
// Module: Drift Classification Tests
// Description: Tests for numeric, hash, and structural drift and run comparison.
// ============================================================================
//! ## Overview
//! Validates threshold boundaries, non-finite deltas, threshold validation,
//! and whole-run comparison of manifests and gate metrics.

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

use std::collections::BTreeMap;

use proofpack_core::DriftLevel;
use proofpack_core::GateChainResult;
use proofpack_core::GateId;
use proofpack_core::GateResult;
use proofpack_core::GateVerdict;
use proofpack_core::InMemoryArtifactStore;
use proofpack_core::Manifest;
use proofpack_core::NumericDriftThresholds;
use proofpack_core::ProofPackBuilder;
use proofpack_core::RunId;
use proofpack_core::RunMetadata;
use proofpack_core::StructuralSnapshot;
use proofpack_core::ThresholdError;
use proofpack_core::ThresholdSymbol;
use proofpack_core::Timestamp;
use proofpack_core::classify_hash;
use proofpack_core::classify_numeric;
use proofpack_core::classify_structural;
use proofpack_core::drift::RULE_HASH_EQUAL;
use proofpack_core::drift::RULE_HASH_MISMATCH;
use proofpack_core::drift::RULE_MERKLE_ROOT_CHANGED;
use proofpack_core::drift::RULE_NON_FINITE_DELTA;
use proofpack_core::drift::RULE_STAGE_COUNT_CHANGED;
use proofpack_core::drift::RULE_STRUCTURE_UNCHANGED;
use proofpack_core::drift::RULE_WITHIN_TOLERANCE;
use proofpack_core::hash_str;
use proofpack_core::max_drift_level;
use proofpack_core::runtime::ArtifactInput;
use proofpack_core::runtime::DriftCheckKind;
use proofpack_core::runtime::compare_manifests;
use proofpack_core::runtime::compare_metrics;
use proofpack_core::runtime::drift::RULE_ARTIFACT_ADDED;
use proofpack_core::runtime::drift::RULE_ARTIFACT_MISSING;
use proofpack_core::runtime::drift::RULE_METRIC_MISSING;
use proofpack_core::runtime::gate_metrics;
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

fn symbol(value: f64, rule: &str) -> ThresholdSymbol {
    ThresholdSymbol::new(value, "ratio", rule, "calibrated on 50 reference runs").unwrap()
}

fn thresholds() -> NumericDriftThresholds {
    NumericDriftThresholds::new(
        symbol(0.05, "soft_band"),
        symbol(0.15, "hard_band"),
        symbol(0.30, "critical_band"),
    )
    .unwrap()
}

fn manifest(artifacts: Vec<ArtifactInput>) -> Manifest {
    let metadata = RunMetadata {
        pipeline_version: "1.0.0".to_string(),
        generated_at: Timestamp::parse("2026-03-01T00:00:00Z").unwrap(),
        parameters: BTreeMap::new(),
    };
    ProofPackBuilder::new(RunId::new("run"), metadata, GateVerdict::Pass)
        .artifacts(artifacts)
        .write(&InMemoryArtifactStore::new(), "run")
        .unwrap()
        .manifest
}

fn metrics(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries.iter().map(|(name, value)| ((*name).to_string(), *value)).collect()
}

// ============================================================================
// SECTION: Numeric Drift
// ============================================================================

/// Tests each threshold is inclusive at its exact value.
#[test]
fn test_numeric_boundaries_are_inclusive() {
    let thresholds = thresholds();
    let cases = [
        (0.0, DriftLevel::NoDrift, RULE_WITHIN_TOLERANCE),
        (0.049, DriftLevel::NoDrift, RULE_WITHIN_TOLERANCE),
        (0.05, DriftLevel::SoftDrift, "soft_band"),
        (0.149, DriftLevel::SoftDrift, "soft_band"),
        (0.15, DriftLevel::HardDrift, "hard_band"),
        (0.30, DriftLevel::CriticalDrift, "critical_band"),
        (12.0, DriftLevel::CriticalDrift, "critical_band"),
    ];
    for (delta, level, rule) in cases {
        let result = classify_numeric(delta, &thresholds);
        assert_eq!(result.level, level, "delta {delta}");
        assert_eq!(result.rule, rule, "delta {delta}");
    }
}

/// Tests negative deltas classify by magnitude.
#[test]
fn test_negative_deltas_use_magnitude() {
    let thresholds = thresholds();
    assert_eq!(classify_numeric(-0.05, &thresholds).level, DriftLevel::SoftDrift);
    assert_eq!(classify_numeric(-0.2, &thresholds).level, DriftLevel::HardDrift);
    assert_eq!(classify_numeric(-1.0, &thresholds).level, DriftLevel::CriticalDrift);
}

/// Tests NaN and infinite deltas are critical.
#[test]
fn test_non_finite_deltas_are_critical() {
    let thresholds = thresholds();
    for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let result = classify_numeric(delta, &thresholds);
        assert_eq!(result.level, DriftLevel::CriticalDrift);
        assert_eq!(result.rule, RULE_NON_FINITE_DELTA);
    }
}

/// Tests the aggregate level is the maximum.
#[test]
fn test_max_drift_level() {
    assert_eq!(max_drift_level(Vec::<DriftLevel>::new()), DriftLevel::NoDrift);
    assert_eq!(
        max_drift_level([DriftLevel::SoftDrift, DriftLevel::CriticalDrift, DriftLevel::NoDrift]),
        DriftLevel::CriticalDrift
    );
    assert_eq!(
        max_drift_level([DriftLevel::SoftDrift, DriftLevel::HardDrift]),
        DriftLevel::HardDrift
    );
    assert!(DriftLevel::NoDrift < DriftLevel::SoftDrift);
    assert_eq!(DriftLevel::HardDrift.as_str(), "HARD_DRIFT");
    assert_eq!(serde_json::to_value(DriftLevel::CriticalDrift).unwrap(), json!("CRITICAL_DRIFT"));
}

// ============================================================================
// SECTION: Threshold Validation
// ============================================================================

/// Tests threshold ordering is enforced.
#[test]
fn test_threshold_ordering_is_enforced() {
    let err = NumericDriftThresholds::new(
        symbol(0.2, "soft"),
        symbol(0.1, "hard"),
        symbol(0.3, "critical"),
    )
    .unwrap_err();
    assert!(matches!(err, ThresholdError::Ordering { .. }));

    let equal = NumericDriftThresholds::new(
        symbol(0.1, "soft"),
        symbol(0.1, "hard"),
        symbol(0.3, "critical"),
    );
    assert!(equal.is_err());

    let zero =
        NumericDriftThresholds::new(symbol(0.0, "soft"), symbol(0.1, "hard"), symbol(0.3, "c"));
    assert_eq!(
        zero.unwrap_err(),
        ThresholdError::NonPositive {
            value: 0.0,
        }
    );
}

/// Tests threshold records require finite values and non-blank text.
#[test]
fn test_threshold_symbol_validation() {
    assert_eq!(
        ThresholdSymbol::new(f64::NAN, "ratio", "rule", "derived").unwrap_err(),
        ThresholdError::NonFinite {
            field: "value",
        }
    );
    assert_eq!(
        ThresholdSymbol::new(0.1, "ratio", "  ", "derived").unwrap_err(),
        ThresholdError::EmptyField {
            field: "rule",
        }
    );
    assert_eq!(
        ThresholdSymbol::new(0.1, "ratio", "rule", "").unwrap_err(),
        ThresholdError::EmptyField {
            field: "derivation",
        }
    );
}

/// Tests thresholds load from JSON and reject missing or unknown fields.
#[test]
fn test_thresholds_deserialize_with_validation() {
    let entry = |value: f64| {
        json!({"value": value, "unit": "ratio", "rule": "band", "derivation": "reference runs"})
    };
    let document = json!({"soft": entry(0.1), "hard": entry(0.2), "critical": entry(0.4)});
    let loaded: NumericDriftThresholds = serde_json::from_value(document).unwrap();
    assert!((loaded.hard().value - 0.2).abs() < f64::EPSILON);
    assert_eq!(loaded.critical().unit, "ratio");

    let round_trip: NumericDriftThresholds =
        serde_json::from_value(serde_json::to_value(&loaded).unwrap()).unwrap();
    assert_eq!(round_trip, loaded);

    let missing = serde_json::from_value::<ThresholdSymbol>(
        json!({"value": 0.1, "unit": "ratio", "rule": "band"}),
    )
    .unwrap_err();
    assert!(missing.to_string().contains("derivation"), "{missing}");

    let unknown = serde_json::from_value::<ThresholdSymbol>(json!({
        "value": 0.1, "unit": "ratio", "rule": "band", "derivation": "d", "extra": 1
    }));
    assert!(unknown.is_err());

    let unordered = serde_json::from_value::<NumericDriftThresholds>(
        json!({"soft": entry(0.3), "hard": entry(0.2), "critical": entry(0.4)}),
    );
    assert!(unordered.is_err());
}

// ============================================================================
// SECTION: Hash and Structural Drift
// ============================================================================

/// Tests hash comparison levels.
#[test]
fn test_classify_hash() {
    let a = hash_str("a");
    let equal = classify_hash(&a, &hash_str("a"));
    assert_eq!((equal.level, equal.rule.as_str()), (DriftLevel::NoDrift, RULE_HASH_EQUAL));
    let changed = classify_hash(&a, &hash_str("b"));
    assert_eq!(changed.level, DriftLevel::HardDrift);
    assert_eq!(changed.rule, RULE_HASH_MISMATCH);
}

/// Tests stage count changes dominate root changes.
#[test]
fn test_classify_structural() {
    let base = StructuralSnapshot {
        stage_count: 3,
        merkle_root: hash_str("root"),
    };
    let same = classify_structural(&base, &base.clone());
    assert_eq!((same.level, same.rule.as_str()), (DriftLevel::NoDrift, RULE_STRUCTURE_UNCHANGED));

    let moved = StructuralSnapshot {
        stage_count: 3,
        merkle_root: hash_str("other"),
    };
    let moved = classify_structural(&base, &moved);
    assert_eq!(moved.level, DriftLevel::HardDrift);
    assert_eq!(moved.rule, RULE_MERKLE_ROOT_CHANGED);

    let grown = StructuralSnapshot {
        stage_count: 4,
        merkle_root: hash_str("other"),
    };
    let grown = classify_structural(&base, &grown);
    assert_eq!(
        (grown.level, grown.rule.as_str()),
        (DriftLevel::CriticalDrift, RULE_STAGE_COUNT_CHANGED)
    );
}

// ============================================================================
// SECTION: Run Comparison
// ============================================================================

/// Tests identical runs show no drift.
#[test]
fn test_identical_manifests_have_no_drift() {
    let artifacts = || {
        vec![
            ArtifactInput::json("plan", "p.json", json!({"a": 1})),
            ArtifactInput::text("draft", "d.md", "text\n"),
        ]
    };
    let report = compare_manifests(&manifest(artifacts()), &manifest(artifacts()));
    assert_eq!(report.level, DriftLevel::NoDrift);
    assert_eq!(report.checks.len(), 3);
    assert_eq!(report.checks[0].kind, DriftCheckKind::Structural);
    assert_eq!(report.at_least(DriftLevel::SoftDrift).count(), 0);
}

/// Tests changed, missing, and added artifacts are each reported.
#[test]
fn test_manifest_changes_are_classified() {
    let baseline = manifest(vec![
        ArtifactInput::json("plan", "p.json", json!({"a": 1})),
        ArtifactInput::text("draft", "d.md", "text\n"),
        ArtifactInput::text("draft", "gone.md", "old\n"),
    ]);
    let candidate = manifest(vec![
        ArtifactInput::json("plan", "p.json", json!({"a": 2})),
        ArtifactInput::text("draft", "d.md", "text\n"),
        ArtifactInput::text("draft", "new.md", "new\n"),
    ]);
    let report = compare_manifests(&baseline, &candidate);

    let summary: Vec<(&str, DriftLevel, &str)> = report
        .checks
        .iter()
        .map(|check| (check.subject.as_str(), check.result.level, check.result.rule.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("structure", DriftLevel::HardDrift, RULE_MERKLE_ROOT_CHANGED),
            ("plan/p.json", DriftLevel::HardDrift, RULE_HASH_MISMATCH),
            ("draft/d.md", DriftLevel::NoDrift, RULE_HASH_EQUAL),
            ("draft/gone.md", DriftLevel::HardDrift, RULE_ARTIFACT_MISSING),
            ("draft/new.md", DriftLevel::HardDrift, RULE_ARTIFACT_ADDED),
        ]
    );
    assert_eq!(report.level, DriftLevel::HardDrift);
    assert_eq!(report.at_least(DriftLevel::HardDrift).count(), 4);
}

/// Tests a run with a different stage count is critical.
#[test]
fn test_stage_count_change_is_critical() {
    let baseline = manifest(vec![ArtifactInput::text("plan", "p.md", "x\n")]);
    let candidate = manifest(vec![
        ArtifactInput::text("plan", "p.md", "x\n"),
        ArtifactInput::text("review", "r.md", "y\n"),
    ]);
    assert_eq!(compare_manifests(&baseline, &candidate).level, DriftLevel::CriticalDrift);
}

/// Tests metric comparison uses signed deltas and flags missing metrics.
#[test]
fn test_compare_metrics() {
    let baseline = metrics(&[("coverage", 0.80), ("latency", 1.0), ("score", 0.5)]);
    let candidate = metrics(&[("coverage", 0.70), ("latency", 1.5), ("extra", 9.0)]);
    let report = compare_metrics(&baseline, &candidate, &thresholds());

    let levels: Vec<(&str, DriftLevel)> =
        report.checks.iter().map(|check| (check.subject.as_str(), check.result.level)).collect();
    assert_eq!(
        levels,
        vec![
            ("coverage", DriftLevel::SoftDrift),
            ("latency", DriftLevel::CriticalDrift),
            ("score", DriftLevel::HardDrift),
        ]
    );
    assert_eq!(report.checks[2].result.rule, RULE_METRIC_MISSING);
    assert_eq!(report.level, DriftLevel::CriticalDrift);
}

/// Tests gate metrics flatten to qualified names.
#[test]
fn test_gate_metrics_are_qualified() {
    let chain = GateChainResult {
        verdict: GateVerdict::Pass,
        gate_results: vec![
            GateResult::pass(GateId::new("length")).with_metric("words", 1200.0),
            GateResult::pass(GateId::new("style")).with_metric("score", 0.9),
        ],
        first_failure: None,
        total_violations: 0,
    };
    let flattened = gate_metrics(&chain);
    assert_eq!(flattened.keys().collect::<Vec<_>>(), vec!["length.words", "style.score"]);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn classification_is_monotonic_in_magnitude(a in 0.0_f64 .. 1.0, b in 0.0_f64 .. 1.0) {
        let thresholds = thresholds();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(
            classify_numeric(low, &thresholds).level <= classify_numeric(high, &thresholds).level
        );
        prop_assert_eq!(
            classify_numeric(-low, &thresholds).level,
            classify_numeric(low, &thresholds).level
        );
    }
}
