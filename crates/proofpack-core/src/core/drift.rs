// crates/proofpack-core/src/core/drift.rs
// ============================================================================
// Module: Proof-Pack Drift Classification
// Description: Drift levels, threshold records, and pure classifiers.
// Purpose: Turn numeric, hash, and structural deltas into an ordered verdict.
// Dependencies: crate::core::{hashing, manifest}, serde
// ============================================================================

//! ## Overview
//! Drift is a four-level ordered scale. Classifiers are pure functions that
//! return a [`DriftResult`] naming both the level and the rule that produced
//! it; every level, including `CRITICAL_DRIFT`, is an ordinary value.
//!
//! Numeric thresholds are [`ThresholdSymbol`] records rather than bare
//! numbers: each value travels with its unit, its rule, and its derivation.
//! Records and their ordering are validated when they are constructed or
//! deserialized, so a classifier never sees an invalid threshold set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::HashDigest;
use crate::core::manifest::Manifest;

// ============================================================================
// SECTION: Drift Levels
// ============================================================================

/// Ordered drift severity: `NO_DRIFT < SOFT_DRIFT < HARD_DRIFT < CRITICAL_DRIFT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftLevel {
    /// No measurable drift.
    NoDrift,
    /// Drift worth reporting but within tolerance.
    SoftDrift,
    /// Drift that should block promotion.
    HardDrift,
    /// Drift that invalidates the comparison.
    CriticalDrift,
}

impl DriftLevel {
    /// Returns the stable wire name of the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoDrift => "NO_DRIFT",
            Self::SoftDrift => "SOFT_DRIFT",
            Self::HardDrift => "HARD_DRIFT",
            Self::CriticalDrift => "CRITICAL_DRIFT",
        }
    }
}

/// Drift level together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftResult {
    /// Classified level.
    pub level: DriftLevel,
    /// Rule that determined the level.
    pub rule: String,
}

impl DriftResult {
    /// Creates a drift result.
    #[must_use]
    pub fn new(level: DriftLevel, rule: impl Into<String>) -> Self {
        Self {
            level,
            rule: rule.into(),
        }
    }
}

/// Returns the highest level present, or `NO_DRIFT` for no input.
#[must_use]
pub fn max_drift_level<I>(levels: I) -> DriftLevel
where
    I: IntoIterator<Item = DriftLevel>,
{
    levels.into_iter().max().unwrap_or(DriftLevel::NoDrift)
}

// ============================================================================
// SECTION: Threshold Records
// ============================================================================

/// Threshold value carried with its justification.
///
/// # Invariants
/// - `value` is finite.
/// - `unit`, `rule`, and `derivation` are non-blank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholdSymbol")]
pub struct ThresholdSymbol {
    /// Threshold magnitude.
    pub value: f64,
    /// Unit of `value`.
    pub unit: String,
    /// Rule the threshold enforces.
    pub rule: String,
    /// How the value was derived.
    pub derivation: String,
}

impl ThresholdSymbol {
    /// Builds a validated threshold record.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError`] when the value is not finite or any text
    /// field is blank.
    pub fn new(
        value: f64,
        unit: impl Into<String>,
        rule: impl Into<String>,
        derivation: impl Into<String>,
    ) -> Result<Self, ThresholdError> {
        let symbol = Self {
            value,
            unit: unit.into(),
            rule: rule.into(),
            derivation: derivation.into(),
        };
        if !symbol.value.is_finite() {
            return Err(ThresholdError::NonFinite {
                field: "value",
            });
        }
        for (field, text) in
            [("unit", &symbol.unit), ("rule", &symbol.rule), ("derivation", &symbol.derivation)]
        {
            if text.trim().is_empty() {
                return Err(ThresholdError::EmptyField {
                    field,
                });
            }
        }
        Ok(symbol)
    }
}

/// Wire form of a threshold record; every field is optional so that a missing
/// field is reported by name.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawThresholdSymbol {
    /// Threshold magnitude.
    value: Option<f64>,
    /// Unit of `value`.
    unit: Option<String>,
    /// Rule the threshold enforces.
    rule: Option<String>,
    /// How the value was derived.
    derivation: Option<String>,
}

impl TryFrom<RawThresholdSymbol> for ThresholdSymbol {
    type Error = ThresholdError;

    fn try_from(raw: RawThresholdSymbol) -> Result<Self, Self::Error> {
        let missing = |field| ThresholdError::MissingField {
            field,
        };
        Self::new(
            raw.value.ok_or_else(|| missing("value"))?,
            raw.unit.ok_or_else(|| missing("unit"))?,
            raw.rule.ok_or_else(|| missing("rule"))?,
            raw.derivation.ok_or_else(|| missing("derivation"))?,
        )
    }
}

/// Ordered numeric thresholds for drift classification.
///
/// # Invariants
/// - `0 < soft.value < hard.value < critical.value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNumericThresholds")]
pub struct NumericDriftThresholds {
    /// Soft drift threshold.
    soft: ThresholdSymbol,
    /// Hard drift threshold.
    hard: ThresholdSymbol,
    /// Critical drift threshold.
    critical: ThresholdSymbol,
}

impl NumericDriftThresholds {
    /// Builds a threshold set, validating the ordering.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdError::NonPositive`] when the soft value is not
    /// positive, or [`ThresholdError::Ordering`] when the values are not
    /// strictly increasing.
    pub fn new(
        soft: ThresholdSymbol,
        hard: ThresholdSymbol,
        critical: ThresholdSymbol,
    ) -> Result<Self, ThresholdError> {
        if soft.value <= 0.0 {
            return Err(ThresholdError::NonPositive {
                value: soft.value,
            });
        }
        if !(soft.value < hard.value && hard.value < critical.value) {
            return Err(ThresholdError::Ordering {
                soft: soft.value,
                hard: hard.value,
                critical: critical.value,
            });
        }
        Ok(Self {
            soft,
            hard,
            critical,
        })
    }

    /// Returns the soft threshold.
    #[must_use]
    pub const fn soft(&self) -> &ThresholdSymbol {
        &self.soft
    }

    /// Returns the hard threshold.
    #[must_use]
    pub const fn hard(&self) -> &ThresholdSymbol {
        &self.hard
    }

    /// Returns the critical threshold.
    #[must_use]
    pub const fn critical(&self) -> &ThresholdSymbol {
        &self.critical
    }
}

/// Wire form of a threshold set.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNumericThresholds {
    /// Soft drift threshold.
    soft: ThresholdSymbol,
    /// Hard drift threshold.
    hard: ThresholdSymbol,
    /// Critical drift threshold.
    critical: ThresholdSymbol,
}

impl TryFrom<RawNumericThresholds> for NumericDriftThresholds {
    type Error = ThresholdError;

    fn try_from(raw: RawNumericThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.soft, raw.hard, raw.critical)
    }
}

/// Threshold validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    /// A required field is absent.
    #[error("threshold field missing: {field}")]
    MissingField {
        /// Missing field name.
        field: &'static str,
    },
    /// A text field is blank.
    #[error("threshold field is empty: {field}")]
    EmptyField {
        /// Blank field name.
        field: &'static str,
    },
    /// A numeric field is NaN or infinite.
    #[error("threshold field is not finite: {field}")]
    NonFinite {
        /// Offending field name.
        field: &'static str,
    },
    /// The soft threshold is zero or negative.
    #[error("soft threshold must be positive, got {value}")]
    NonPositive {
        /// Offending soft value.
        value: f64,
    },
    /// Thresholds are not strictly increasing.
    #[error("thresholds must satisfy soft < hard < critical (got {soft}, {hard}, {critical})")]
    Ordering {
        /// Soft value.
        soft: f64,
        /// Hard value.
        hard: f64,
        /// Critical value.
        critical: f64,
    },
}

// ============================================================================
// SECTION: Classifiers
// ============================================================================

/// Rule reported for a delta below the soft threshold.
pub const RULE_WITHIN_TOLERANCE: &str = "within_tolerance";
/// Rule reported for a NaN or infinite delta.
pub const RULE_NON_FINITE_DELTA: &str = "non_finite_delta";
/// Rule reported for equal hashes.
pub const RULE_HASH_EQUAL: &str = "hash_equal";
/// Rule reported for differing hashes.
pub const RULE_HASH_MISMATCH: &str = "hash_mismatch";
/// Rule reported for differing stage counts.
pub const RULE_STAGE_COUNT_CHANGED: &str = "stage_count_changed";
/// Rule reported for differing Merkle roots.
pub const RULE_MERKLE_ROOT_CHANGED: &str = "merkle_root_changed";
/// Rule reported for identical structure.
pub const RULE_STRUCTURE_UNCHANGED: &str = "structure_unchanged";

/// Classifies a numeric delta by magnitude against ordered thresholds.
///
/// The highest threshold met or exceeded wins; a zero delta is `NO_DRIFT` and
/// a non-finite delta is `CRITICAL_DRIFT`.
#[must_use]
pub fn classify_numeric(delta: f64, thresholds: &NumericDriftThresholds) -> DriftResult {
    if !delta.is_finite() {
        return DriftResult::new(DriftLevel::CriticalDrift, RULE_NON_FINITE_DELTA);
    }
    let magnitude = delta.abs();
    if magnitude >= thresholds.critical.value {
        DriftResult::new(DriftLevel::CriticalDrift, thresholds.critical.rule.clone())
    } else if magnitude >= thresholds.hard.value {
        DriftResult::new(DriftLevel::HardDrift, thresholds.hard.rule.clone())
    } else if magnitude >= thresholds.soft.value {
        DriftResult::new(DriftLevel::SoftDrift, thresholds.soft.rule.clone())
    } else {
        DriftResult::new(DriftLevel::NoDrift, RULE_WITHIN_TOLERANCE)
    }
}

/// Classifies two content hashes: equal is `NO_DRIFT`, different is `HARD_DRIFT`.
#[must_use]
pub fn classify_hash(baseline: &HashDigest, candidate: &HashDigest) -> DriftResult {
    if baseline == candidate {
        DriftResult::new(DriftLevel::NoDrift, RULE_HASH_EQUAL)
    } else {
        DriftResult::new(DriftLevel::HardDrift, RULE_HASH_MISMATCH)
    }
}

/// Structural summary of a run used for structural drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralSnapshot {
    /// Number of completed stages.
    pub stage_count: usize,
    /// Merkle root over the run's artifacts.
    pub merkle_root: HashDigest,
}

impl StructuralSnapshot {
    /// Captures the structural summary of a manifest.
    #[must_use]
    pub fn from_manifest(manifest: &Manifest) -> Self {
        Self {
            stage_count: manifest.stages_completed.len(),
            merkle_root: manifest.merkle_root.clone(),
        }
    }
}

/// Classifies structural drift: stage count change is `CRITICAL_DRIFT`, a root
/// change alone is `HARD_DRIFT`.
#[must_use]
pub fn classify_structural(
    baseline: &StructuralSnapshot,
    candidate: &StructuralSnapshot,
) -> DriftResult {
    if baseline.stage_count != candidate.stage_count {
        DriftResult::new(DriftLevel::CriticalDrift, RULE_STAGE_COUNT_CHANGED)
    } else if baseline.merkle_root != candidate.merkle_root {
        DriftResult::new(DriftLevel::HardDrift, RULE_MERKLE_ROOT_CHANGED)
    } else {
        DriftResult::new(DriftLevel::NoDrift, RULE_STRUCTURE_UNCHANGED)
    }
}
