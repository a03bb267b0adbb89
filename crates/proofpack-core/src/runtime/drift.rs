// crates/proofpack-core/src/runtime/drift.rs
// ============================================================================
// Module: Proof-Pack Drift Reports
// Description: Run-to-run comparisons built on the pure drift classifiers.
// Purpose: Summarize how far a candidate run moved from a baseline run.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! A [`DriftReport`] collects one classified check per compared item and
//! rolls them up with [`max_drift_level`]. Manifest comparison yields one
//! structural check followed by one hash check per artifact path; metric
//! comparison yields one numeric check per metric.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::drift::DriftLevel;
use crate::core::drift::DriftResult;
use crate::core::drift::NumericDriftThresholds;
use crate::core::drift::StructuralSnapshot;
use crate::core::drift::classify_hash;
use crate::core::drift::classify_numeric;
use crate::core::drift::classify_structural;
use crate::core::drift::max_drift_level;
use crate::core::gate::GateChainResult;
use crate::core::manifest::Manifest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rule reported when a baseline artifact is absent from the candidate.
pub const RULE_ARTIFACT_MISSING: &str = "artifact_missing";
/// Rule reported when the candidate adds an artifact.
pub const RULE_ARTIFACT_ADDED: &str = "artifact_added";
/// Rule reported when a baseline metric is absent from the candidate.
pub const RULE_METRIC_MISSING: &str = "metric_missing";

// ============================================================================
// SECTION: Report Types
// ============================================================================

/// Kind of drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftCheckKind {
    /// Stage count and Merkle root comparison.
    Structural,
    /// Artifact content hash comparison.
    ArtifactHash,
    /// Numeric metric comparison.
    Metric,
}

/// Single classified comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftCheck {
    /// Check kind.
    pub kind: DriftCheckKind,
    /// Compared item: artifact path, metric name, or `structure`.
    pub subject: String,
    /// Classification.
    pub result: DriftResult,
}

/// Aggregate drift between a baseline and a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Highest level across all checks.
    pub level: DriftLevel,
    /// Every check in comparison order.
    pub checks: Vec<DriftCheck>,
}

impl DriftReport {
    /// Builds a report whose level is the maximum of its checks.
    #[must_use]
    pub fn from_checks(checks: Vec<DriftCheck>) -> Self {
        let level = max_drift_level(checks.iter().map(|check| check.result.level));
        Self {
            level,
            checks,
        }
    }

    /// Returns checks at or above `level`.
    pub fn at_least(&self, level: DriftLevel) -> impl Iterator<Item = &DriftCheck> {
        self.checks.iter().filter(move |check| check.result.level >= level)
    }
}

// ============================================================================
// SECTION: Comparisons
// ============================================================================

/// Compares two manifests structurally and artifact by artifact.
///
/// Artifacts are matched by path. Baseline order comes first, then any
/// artifacts only the candidate has, in candidate order.
#[must_use]
pub fn compare_manifests(baseline: &Manifest, candidate: &Manifest) -> DriftReport {
    let mut checks = vec![DriftCheck {
        kind: DriftCheckKind::Structural,
        subject: "structure".to_string(),
        result: classify_structural(
            &StructuralSnapshot::from_manifest(baseline),
            &StructuralSnapshot::from_manifest(candidate),
        ),
    }];

    let candidate_by_path: BTreeMap<&str, _> =
        candidate.artifacts.iter().map(|entry| (entry.path.as_str(), &entry.hash)).collect();
    let baseline_by_path: BTreeMap<&str, _> =
        baseline.artifacts.iter().map(|entry| (entry.path.as_str(), &entry.hash)).collect();

    for entry in &baseline.artifacts {
        let result = candidate_by_path.get(entry.path.as_str()).map_or_else(
            || DriftResult::new(DriftLevel::HardDrift, RULE_ARTIFACT_MISSING),
            |hash| classify_hash(&entry.hash, hash),
        );
        checks.push(DriftCheck {
            kind: DriftCheckKind::ArtifactHash,
            subject: entry.path.clone(),
            result,
        });
    }
    for entry in &candidate.artifacts {
        if !baseline_by_path.contains_key(entry.path.as_str()) {
            checks.push(DriftCheck {
                kind: DriftCheckKind::ArtifactHash,
                subject: entry.path.clone(),
                result: DriftResult::new(DriftLevel::HardDrift, RULE_ARTIFACT_ADDED),
            });
        }
    }
    DriftReport::from_checks(checks)
}

/// Compares named metrics, classifying `candidate - baseline` for each
/// baseline metric. Metrics only the candidate reports are ignored.
#[must_use]
pub fn compare_metrics(
    baseline: &BTreeMap<String, f64>,
    candidate: &BTreeMap<String, f64>,
    thresholds: &NumericDriftThresholds,
) -> DriftReport {
    let checks = baseline
        .iter()
        .map(|(name, base)| {
            let result = candidate.get(name).map_or_else(
                || DriftResult::new(DriftLevel::HardDrift, RULE_METRIC_MISSING),
                |value| classify_numeric(value - base, thresholds),
            );
            DriftCheck {
                kind: DriftCheckKind::Metric,
                subject: name.clone(),
                result,
            }
        })
        .collect();
    DriftReport::from_checks(checks)
}

/// Flattens gate metrics into `<gate_id>.<metric>` keys.
#[must_use]
pub fn gate_metrics(result: &GateChainResult) -> BTreeMap<String, f64> {
    result
        .gate_results
        .iter()
        .flat_map(|gate| {
            gate.metrics
                .iter()
                .map(move |(name, value)| (format!("{}.{name}", gate.gate_id), *value))
        })
        .collect()
}
