// crates/proofpack-core/src/core/identifiers.rs
// ============================================================================
// Module: Proof-Pack Identifiers
// Description: Opaque identifiers for runs, stages, gates, intents, and baselines.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Run, stage, gate, and intent identifiers are opaque string wrappers; stage
//! names are checked where they become path segments (the proof-pack writer).
//! [`BaselineVersion`] is the exception: it always names a directory in the
//! baseline store, so it is validated on construction and deserialization.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Declares an opaque string identifier with the shared accessor set.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

opaque_id!(
    /// Pipeline run identifier recorded in every manifest.
    RunId
);

opaque_id!(
    /// Pipeline stage name; artifacts live under `<stage>/`.
    StageId
);

opaque_id!(
    /// Gate identifier within a gate chain.
    GateId
);

opaque_id!(
    /// Intent identifier; baseline intents live under `intent_<id>/`.
    IntentId
);

// ============================================================================
// SECTION: Baseline Version
// ============================================================================

/// Maximum length of a baseline version string.
pub const MAX_BASELINE_VERSION_LENGTH: usize = 128;

/// Baseline version label, usable as a single directory name.
///
/// # Invariants
/// - Non-empty, at most [`MAX_BASELINE_VERSION_LENGTH`] bytes.
/// - Characters restricted to `[A-Za-z0-9._-]`.
/// - Never `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaselineVersion(String);

impl BaselineVersion {
    /// Parses and validates a baseline version.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError::InvalidBaselineVersion`] when the value is
    /// not a safe directory name.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        let invalid = |reason| IdentifierError::InvalidBaselineVersion {
            value: value.to_string(),
            reason,
        };
        if value.is_empty() {
            return Err(invalid("version is empty"));
        }
        if value.len() > MAX_BASELINE_VERSION_LENGTH {
            return Err(invalid("version exceeds length limit"));
        }
        if value == "." || value == ".." {
            return Err(invalid("version must not be a relative directory marker"));
        }
        let allowed = |byte: u8| byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-');
        if !value.bytes().all(allowed) {
            return Err(invalid("version may only contain [A-Za-z0-9._-]"));
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaselineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for BaselineVersion {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BaselineVersion> for String {
    fn from(value: BaselineVersion) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Baseline version is not a safe directory name.
    #[error("invalid baseline version {value:?}: {reason}")]
    InvalidBaselineVersion {
        /// Offending value.
        value: String,
        /// Reason the value was rejected.
        reason: &'static str,
    },
}
