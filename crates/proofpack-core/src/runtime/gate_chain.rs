// crates/proofpack-core/src/runtime/gate_chain.rs
// ============================================================================
// Module: Proof-Pack Gate Chain
// Description: Ordered, fail-closed execution of named validation gates.
// Purpose: Evaluate every gate and report the first failure with full counts.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A [`GateChain`] runs its gates in the fixed order it was built with. It
//! never short-circuits: every gate is evaluated so the report carries every
//! violation. The aggregate verdict is `FAIL` exactly when some gate failed,
//! and `first_failure` names the earliest one in chain order.
//!
//! Gates are pure functions of `(state, config)`. A gate that reports `PASS`
//! while also reporting violations is treated as failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::gate::GateChainResult;
use crate::core::gate::GateResult;
use crate::core::gate::GateVerdict;
use crate::core::identifiers::GateId;
use crate::interfaces::AuditEvent;
use crate::interfaces::AuditOutcome;
use crate::interfaces::AuditSink;
use crate::runtime::audit::EVENT_GATE_CHAIN_EVALUATED;
use crate::runtime::audit::default_audit_sink;

// ============================================================================
// SECTION: Gate Trait
// ============================================================================

/// Named validator over pipeline state `S` and configuration `C`.
pub trait Gate<S, C> {
    /// Returns the gate identifier.
    fn gate_id(&self) -> &GateId;

    /// Evaluates the gate. Must not have side effects.
    fn evaluate(&self, state: &S, config: &C) -> GateResult;
}

/// Gate backed by a closure.
pub struct FnGate<F> {
    /// Gate identifier.
    id: GateId,
    /// Evaluation function.
    func: F,
}

impl<F> FnGate<F> {
    /// Wraps a closure as a gate.
    #[must_use]
    pub fn new(id: impl Into<GateId>, func: F) -> Self {
        Self {
            id: id.into(),
            func,
        }
    }
}

impl<S, C, F> Gate<S, C> for FnGate<F>
where
    F: Fn(&S, &C) -> GateResult,
{
    fn gate_id(&self) -> &GateId {
        &self.id
    }

    fn evaluate(&self, state: &S, config: &C) -> GateResult {
        (self.func)(state, config)
    }
}

/// Boxed gate trait object.
pub type BoxedGate<S, C> = Box<dyn Gate<S, C> + Send + Sync>;

// ============================================================================
// SECTION: Gate Registry
// ============================================================================

/// Available gates keyed by id, used to assemble chains from configuration.
pub struct GateRegistry<S, C> {
    /// Registered gates.
    gates: BTreeMap<GateId, BoxedGate<S, C>>,
}

impl<S, C> Default for GateRegistry<S, C> {
    fn default() -> Self {
        Self {
            gates: BTreeMap::new(),
        }
    }
}

impl<S, C> GateRegistry<S, C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gate.
    ///
    /// # Errors
    ///
    /// Returns [`GateChainError::DuplicateGate`] when the id is taken.
    pub fn register(&mut self, gate: BoxedGate<S, C>) -> Result<(), GateChainError> {
        let id = gate.gate_id().clone();
        if self.gates.contains_key(&id) {
            return Err(GateChainError::DuplicateGate(id));
        }
        self.gates.insert(id, gate);
        Ok(())
    }

    /// Returns the registered ids in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<GateId> {
        self.gates.keys().cloned().collect()
    }
}

// ============================================================================
// SECTION: Gate Chain
// ============================================================================

/// Ordered chain of gates.
///
/// # Invariants
/// - At least one gate.
/// - Gate ids are unique.
pub struct GateChain<S, C> {
    /// Gates in execution order.
    gates: Vec<BoxedGate<S, C>>,
    /// Audit sink for chain evaluations.
    audit: Arc<dyn AuditSink>,
}

impl<S, C> GateChain<S, C> {
    /// Builds a chain that runs `gates` in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`GateChainError::Empty`] for an empty list or
    /// [`GateChainError::DuplicateGate`] when two gates share an id.
    pub fn new(gates: Vec<BoxedGate<S, C>>) -> Result<Self, GateChainError> {
        if gates.is_empty() {
            return Err(GateChainError::Empty);
        }
        let mut seen = BTreeSet::new();
        for gate in &gates {
            if !seen.insert(gate.gate_id().clone()) {
                return Err(GateChainError::DuplicateGate(gate.gate_id().clone()));
            }
        }
        Ok(Self {
            gates,
            audit: default_audit_sink(),
        })
    }

    /// Builds a chain from configured gate ids, taking gates from `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`GateChainError::UnknownGate`] when an id is not registered,
    /// [`GateChainError::DuplicateGate`] when an id repeats, or
    /// [`GateChainError::Empty`] for an empty order.
    pub fn from_order(
        order: &[GateId],
        mut registry: GateRegistry<S, C>,
    ) -> Result<Self, GateChainError> {
        let mut gates = Vec::with_capacity(order.len());
        let mut seen = BTreeSet::new();
        for id in order {
            if !seen.insert(id.clone()) {
                return Err(GateChainError::DuplicateGate(id.clone()));
            }
            let gate =
                registry.gates.remove(id).ok_or_else(|| GateChainError::UnknownGate(id.clone()))?;
            gates.push(gate);
        }
        Self::new(gates)
    }

    /// Routes evaluation events to an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the gate ids in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<GateId> {
        self.gates.iter().map(|gate| gate.gate_id().clone()).collect()
    }

    /// Evaluates every gate in order and aggregates the results.
    #[must_use]
    pub fn run(&self, state: &S, config: &C) -> GateChainResult {
        let mut gate_results = Vec::with_capacity(self.gates.len());
        let mut first_failure = None;
        let mut total_violations = 0usize;
        for gate in &self.gates {
            let mut result = gate.evaluate(state, config);
            result.gate_id = gate.gate_id().clone();
            if !result.violations.is_empty() {
                result.verdict = GateVerdict::Fail;
            }
            total_violations = total_violations.saturating_add(result.violations.len());
            if result.verdict == GateVerdict::Fail && first_failure.is_none() {
                first_failure = Some(result.gate_id.clone());
            }
            gate_results.push(result);
        }
        let verdict = if first_failure.is_some() { GateVerdict::Fail } else { GateVerdict::Pass };
        let chain = GateChainResult {
            verdict,
            gate_results,
            first_failure,
            total_violations,
        };
        self.audit.record(&chain_event(&chain));
        chain
    }
}

/// Builds the audit event for a chain evaluation.
fn chain_event(chain: &GateChainResult) -> AuditEvent {
    let subject = chain.first_failure.as_ref().map_or("chain", GateId::as_str);
    let outcome =
        if chain.verdict.is_pass() { AuditOutcome::Success } else { AuditOutcome::Failure };
    AuditEvent::new(EVENT_GATE_CHAIN_EVALUATED, subject, outcome).with_detail(format!(
        "{} gates, {} violations",
        chain.gate_results.len(),
        chain.total_violations
    ))
}

/// Convenience for building a boxed closure gate.
#[must_use]
pub fn fn_gate<S, C, F>(id: impl Into<GateId>, func: F) -> BoxedGate<S, C>
where
    F: Fn(&S, &C) -> GateResult + Send + Sync + 'static,
{
    Box::new(FnGate::new(id, func))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate chain construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateChainError {
    /// A chain needs at least one gate.
    #[error("gate chain is empty")]
    Empty,
    /// Two gates share an id.
    #[error("duplicate gate id: {0}")]
    DuplicateGate(GateId),
    /// A configured id has no registered gate.
    #[error("unknown gate id: {0}")]
    UnknownGate(GateId),
}
