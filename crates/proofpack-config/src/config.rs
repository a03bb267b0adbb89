// crates/proofpack-config/src/config.rs
// ============================================================================
// Module: Proof-Pack Configuration
// Description: TOML configuration model, loader, and validation.
// Purpose: Turn `proofpack.toml` into validated runtime settings.
// Dependencies: proofpack-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! [`ProofPackConfig::load`] resolves the config path, reads it under a size
//! limit, parses TOML, and validates every section before returning. Invalid
//! configuration never reaches callers: unknown keys, blank or duplicate gate
//! ids, unordered drift thresholds, zero limits, and unsafe baseline roots are
//! all rejected.
//!
//! Path resolution order: explicit argument, then `PROOFPACK_CONFIG`, then
//! `proofpack.toml` in the working directory. Only the implicit default may
//! be absent, in which case the built-in defaults apply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use proofpack_core::AuditSink;
use proofpack_core::FileAuditSink;
use proofpack_core::GateId;
use proofpack_core::NoopAuditSink;
use proofpack_core::NumericDriftThresholds;
use proofpack_core::ProofPackLimits;
use proofpack_core::StderrAuditSink;
use proofpack_core::runtime::baseline::DEFAULT_BASELINE_ROOT;
use proofpack_core::validate_relative_path;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Config file name used when no path is supplied.
pub const DEFAULT_CONFIG_NAME: &str = "proofpack.toml";
/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "PROOFPACK_CONFIG";
/// Maximum config file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total length of the config path.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of one config path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file is not valid TOML for the model.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config parsed but failed validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProofPackConfig {
    /// Verification settings.
    pub verify: VerifyConfig,
    /// Size and count limits.
    pub limits: LimitsConfig,
    /// Gate chain order.
    pub gates: Option<GatesConfig>,
    /// Drift thresholds.
    pub drift: DriftConfig,
    /// Baseline registry settings.
    pub baselines: BaselinesConfig,
    /// Audit logging settings.
    pub audit: AuditConfig,
}

/// `[verify]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyConfig {
    /// Run the canonical-form, sidecar, and Merkle tree file checks.
    pub strict: bool,
}

/// `[limits]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size of a single artifact in bytes.
    pub max_artifact_bytes: usize,
    /// Maximum size of `manifest.json` in bytes.
    pub max_manifest_bytes: usize,
    /// Maximum number of artifacts per run.
    pub max_artifacts: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = ProofPackLimits::default();
        Self {
            max_artifact_bytes: limits.max_artifact_bytes,
            max_manifest_bytes: limits.max_manifest_bytes,
            max_artifacts: limits.max_artifacts,
        }
    }
}

impl LimitsConfig {
    /// Converts the section into runtime limits.
    #[must_use]
    pub const fn to_limits(&self) -> ProofPackLimits {
        ProofPackLimits {
            max_artifacts: self.max_artifacts,
            max_artifact_bytes: self.max_artifact_bytes,
            max_manifest_bytes: self.max_manifest_bytes,
        }
    }
}

/// `[gates]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatesConfig {
    /// Gate ids in evaluation order.
    pub order: Vec<GateId>,
}

/// `[drift]` section.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriftConfig {
    /// Numeric thresholds, validated while parsing.
    pub numeric: Option<NumericDriftThresholds>,
}

/// `[baselines]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselinesConfig {
    /// Store-relative registry root.
    pub root: String,
}

impl Default for BaselinesConfig {
    fn default() -> Self {
        Self {
            root: DEFAULT_BASELINE_ROOT.to_string(),
        }
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to `path`.
    File,
}

/// `[audit]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink kind.
    pub sink: AuditSinkKind,
    /// Log file for the `file` sink.
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened, or
    /// [`ConfigError::Invalid`] when the `file` sink has no path.
    pub fn build_sink(&self) -> Result<Arc<dyn AuditSink>, ConfigError> {
        match self.sink {
            AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
            AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
            AuditSinkKind::File => {
                let path = self.path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("audit.path is required for the file sink".to_string())
                })?;
                let sink = FileAuditSink::new(path).map_err(|err| {
                    ConfigError::Io(format!("audit log {}: {err}", path.display()))
                })?;
                Ok(Arc::new(sink))
            }
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ProofPackConfig {
    /// Loads and validates configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is unusable, the file cannot be
    /// read, or the contents fail to parse or validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, std::env::var_os(CONFIG_ENV_VAR));
        validate_path(&resolved)?;
        match read_config_file(&resolved) {
            Ok(content) => Self::from_toml_str(&content),
            Err(ReadFailure::Missing) if !explicit => Ok(Self::default()),
            Err(ReadFailure::Missing) => {
                Err(ConfigError::Io(format!("config file not found: {}", resolved.display())))
            }
            Err(ReadFailure::Config(err)) => Err(err),
        }
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or invalid threshold
    /// records, and [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first failing field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("limits.max_artifact_bytes", self.limits.max_artifact_bytes),
            ("limits.max_manifest_bytes", self.limits.max_manifest_bytes),
            ("limits.max_artifacts", self.limits.max_artifacts),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
        }

        if let Some(gates) = &self.gates {
            if gates.order.is_empty() {
                return Err(ConfigError::Invalid("gates.order must not be empty".to_string()));
            }
            let mut seen = BTreeSet::new();
            for gate in &gates.order {
                if gate.as_str().trim().is_empty() {
                    return Err(ConfigError::Invalid("gates.order contains a blank id".to_string()));
                }
                if !seen.insert(gate.as_str()) {
                    return Err(ConfigError::Invalid(format!(
                        "gates.order contains duplicate id: {gate}"
                    )));
                }
            }
        }

        validate_relative_path(&self.baselines.root)
            .map_err(|err| ConfigError::Invalid(format!("baselines.root: {err}")))?;

        match (self.audit.sink, &self.audit.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::None | AuditSinkKind::Stderr, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid with the file sink".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Returns the configured gate order; empty when `[gates]` is absent.
    #[must_use]
    pub fn gate_order(&self) -> &[GateId] {
        match &self.gates {
            Some(gates) => &gates.order,
            None => &[],
        }
    }

    /// Returns the configured numeric drift thresholds.
    #[must_use]
    pub const fn numeric_thresholds(&self) -> Option<&NumericDriftThresholds> {
        self.drift.numeric.as_ref()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Failure while reading the config file.
enum ReadFailure {
    /// The file does not exist.
    Missing,
    /// Any other failure.
    Config(ConfigError),
}

/// Resolves the config path and reports whether it was named explicitly.
fn resolve_path(path: Option<&Path>, env_value: Option<OsString>) -> (PathBuf, bool) {
    if let Some(path) = path {
        return (path.to_path_buf(), true);
    }
    match env_value {
        Some(value) if !value.is_empty() => (PathBuf::from(value), true),
        _ => (PathBuf::from(DEFAULT_CONFIG_NAME), false),
    }
}

/// Rejects config paths that exceed length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH)
    {
        return Err(ConfigError::Invalid("config path component too long".to_string()));
    }
    Ok(())
}

/// Reads the config file as UTF-8 under the size limit.
fn read_config_file(path: &Path) -> Result<String, ReadFailure> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ReadFailure::Missing
        } else {
            ReadFailure::Config(ConfigError::Io(format!("{}: {err}", path.display())))
        }
    })?;
    let mut bytes = Vec::new();
    let limit = u64::try_from(MAX_CONFIG_FILE_SIZE).unwrap_or(u64::MAX).saturating_add(1);
    file.take(limit).read_to_end(&mut bytes).map_err(|err| {
        ReadFailure::Config(ConfigError::Io(format!("{}: {err}", path.display())))
    })?;
    if bytes.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ReadFailure::Config(ConfigError::Invalid(
            "config file exceeds size limit".to_string(),
        )));
    }
    String::from_utf8(bytes).map_err(|_| {
        ReadFailure::Config(ConfigError::Invalid("config file must be utf-8".to_string()))
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
