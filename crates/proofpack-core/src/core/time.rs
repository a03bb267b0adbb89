// crates/proofpack-core/src/core/time.rs
// ============================================================================
// Module: Proof-Pack Time Model
// Description: RFC 3339 timestamps embedded in manifests and baselines.
// Purpose: Keep generated artifacts replayable by never reading the clock.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Manifests and baseline records carry explicit creation times. The core
//! never reads wall-clock time; hosts supply a [`Timestamp`] so that the same
//! inputs always produce the same bytes and hashes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Canonical RFC 3339 timestamp string.
///
/// # Invariants
/// - The stored string parses as RFC 3339.
/// - Values constructed from a date-time are rendered in UTC.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    /// Parses and validates an RFC 3339 timestamp, keeping its original text.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Invalid`] when the value is not RFC 3339.
    pub fn parse(value: &str) -> Result<Self, TimeError> {
        OffsetDateTime::parse(value, &Rfc3339).map_err(|err| TimeError::Invalid {
            value: value.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self(value.to_string()))
    }

    /// Builds a UTC timestamp from a date-time value.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::Format`] when the date-time cannot be rendered.
    pub fn from_datetime(value: OffsetDateTime) -> Result<Self, TimeError> {
        let utc = value.to_offset(time::UtcOffset::UTC);
        utc.format(&Rfc3339).map(Self).map_err(|err| TimeError::Format(err.to_string()))
    }

    /// Builds a UTC timestamp from unix epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimeError::OutOfRange`] when the value is outside the
    /// representable range.
    pub fn from_unix_millis(millis: i64) -> Result<Self, TimeError> {
        let nanos = i128::from(millis) * 1_000_000;
        let value = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimeError::OutOfRange(millis))?;
        Self::from_datetime(value)
    }

    /// Returns the timestamp string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// Timestamp text is not RFC 3339.
    #[error("invalid timestamp {value:?}: {reason}")]
    Invalid {
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// Unix milliseconds outside the supported range.
    #[error("timestamp out of range: {0} ms")]
    OutOfRange(i64),
    /// Date-time could not be formatted.
    #[error("timestamp formatting failed: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn unix_millis_render_in_utc() {
        let stamp = Timestamp::from_unix_millis(0).unwrap();
        assert_eq!(stamp.as_str(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn parse_rejects_non_rfc3339() {
        assert!(Timestamp::parse("yesterday").is_err());
        assert!(Timestamp::parse("2024-01-01T00:00:00Z").is_ok());
    }
}
