// crates/proofpack-core/src/core/gate.rs
// ============================================================================
// Module: Proof-Pack Gate Results
// Description: Verdicts, violations, and per-gate results.
// Purpose: Provide the closed result vocabulary shared by gates and manifests.
// Dependencies: crate::core::identifiers, serde
// ============================================================================

//! ## Overview
//! A gate produces a [`GateResult`]: a binary verdict, the violations that
//! justify it, and any numeric metrics it measured. [`GateChainResult`]
//! aggregates an ordered chain of results without discarding any of them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GateId;

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Binary gate verdict. `Pass` orders before `Fail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateVerdict {
    /// All checks satisfied.
    Pass,
    /// At least one check failed.
    Fail,
}

impl GateVerdict {
    /// Returns true for [`GateVerdict::Pass`].
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A single rule violation reported by a gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable violation code.
    pub code: String,
    /// Human-readable detail.
    pub message: String,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Gate Results
// ============================================================================

/// Outcome of evaluating one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    /// Gate that produced the result.
    pub gate_id: GateId,
    /// Gate verdict.
    pub verdict: GateVerdict,
    /// Violations found; empty for a clean pass.
    pub violations: Vec<Violation>,
    /// Numeric metrics measured by the gate.
    pub metrics: BTreeMap<String, f64>,
}

impl GateResult {
    /// Builds a passing result with no violations.
    #[must_use]
    pub fn pass(gate_id: GateId) -> Self {
        Self {
            gate_id,
            verdict: GateVerdict::Pass,
            violations: Vec::new(),
            metrics: BTreeMap::new(),
        }
    }

    /// Builds a result whose verdict follows from the violations.
    #[must_use]
    pub fn from_violations(gate_id: GateId, violations: Vec<Violation>) -> Self {
        let verdict = if violations.is_empty() { GateVerdict::Pass } else { GateVerdict::Fail };
        Self {
            gate_id,
            verdict,
            violations,
            metrics: BTreeMap::new(),
        }
    }

    /// Adds a metric to the result.
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(name.into(), value);
        self
    }
}

/// Aggregate outcome of an ordered gate chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateChainResult {
    /// `Fail` exactly when `first_failure` is set.
    pub verdict: GateVerdict,
    /// One result per gate, in chain order.
    pub gate_results: Vec<GateResult>,
    /// First gate in chain order whose verdict was `Fail`.
    pub first_failure: Option<GateId>,
    /// Sum of violations across every gate.
    pub total_violations: usize,
}

impl GateChainResult {
    /// Returns the result for a gate id, when present.
    #[must_use]
    pub fn result_for(&self, gate_id: &GateId) -> Option<&GateResult> {
        self.gate_results.iter().find(|result| &result.gate_id == gate_id)
    }
}
