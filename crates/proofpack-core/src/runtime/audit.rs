// crates/proofpack-core/src/runtime/audit.rs
// ============================================================================
// Module: Proof-Pack Audit Sinks
// Description: JSON-lines audit sinks for boundary services.
// Purpose: Route audit events to stderr, a file, memory, or nowhere.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Boundary services (writer, verifier, gate chain, baseline service) emit one
//! [`AuditEvent`] per operation. Events serialize as a single JSON line so a
//! deployment can route them into any log pipeline. Sink failures are
//! swallowed: auditing never changes the outcome of the audited operation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::interfaces::AuditEvent;
use crate::interfaces::AuditSink;

// ============================================================================
// SECTION: Event Names
// ============================================================================

/// A proof-pack was written.
pub const EVENT_PROOFPACK_WRITTEN: &str = "proofpack_written";
/// A proof-pack was verified.
pub const EVENT_PROOFPACK_VERIFIED: &str = "proofpack_verified";
/// A gate chain was evaluated.
pub const EVENT_GATE_CHAIN_EVALUATED: &str = "gate_chain_evaluated";
/// A baseline was registered.
pub const EVENT_BASELINE_REGISTERED: &str = "baseline_registered";
/// A baseline registration was refused.
pub const EVENT_BASELINE_REJECTED: &str = "baseline_rejected";
/// A baseline integrity check ran.
pub const EVENT_BASELINE_INTEGRITY_CHECKED: &str = "baseline_integrity_checked";
/// A baseline certification ran.
pub const EVENT_BASELINE_CERTIFIED: &str = "baseline_certified";

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Returns the names of the recorded events.
    #[must_use]
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(|event| event.event).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Returns the default sink used when a service is not given one.
#[must_use]
pub fn default_audit_sink() -> Arc<dyn AuditSink> {
    Arc::new(NoopAuditSink)
}
