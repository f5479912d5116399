//! Minute-resolution bin timestamps
//!
//! Market data arrives in one-minute bins; every timestamp in the
//! processing pipeline is aligned to a minute boundary. `BinTimestamp`
//! rejects sub-minute components at construction so contiguity checks
//! downstream can compare exact minutes without tolerance windows.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Interval between consecutive market-data bins.
pub const BIN_INTERVAL_MINUTES: i64 = 1;

/// Errors constructing a bin timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("timestamp {0} is not aligned to a minute boundary")]
    NotMinuteAligned(String),

    #[error("unparseable timestamp {value:?}: {reason}")]
    Unparseable { value: String, reason: String },
}

/// A minute-aligned UTC timestamp identifying one market-data bin.
///
/// Ordering and equality are by instant; the serde representation is an
/// ISO-8601 string (e.g. "2024-01-02T14:31:00Z").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinTimestamp(DateTime<Utc>);

impl BinTimestamp {
    /// Create from a UTC datetime, rejecting sub-minute components.
    pub fn new(dt: DateTime<Utc>) -> Result<Self, TimeError> {
        if dt.second() != 0 || dt.nanosecond() != 0 {
            return Err(TimeError::NotMinuteAligned(dt.to_rfc3339()));
        }
        Ok(Self(dt))
    }

    /// Create from a UTC datetime, truncating to the minute boundary.
    pub fn floor(dt: DateTime<Utc>) -> Self {
        let truncated = dt
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(dt);
        Self(truncated)
    }

    /// Parse an ISO-8601 timestamp string at minute resolution.
    ///
    /// Accepts both "2024-01-02T14:31:00Z" and the zone-less
    /// "2024-01-02T14:31:00" (interpreted as UTC).
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                    .map(|naive| Utc.from_utc_datetime(&naive))
            })
            .map_err(|e| TimeError::Unparseable {
                value: s.to_string(),
                reason: e.to_string(),
            })?;
        Self::new(dt)
    }

    /// The next bin slot (exactly one minute later).
    pub fn succ(&self) -> Self {
        Self(self.0 + Duration::minutes(BIN_INTERVAL_MINUTES))
    }

    /// The previous bin slot (exactly one minute earlier).
    pub fn pred(&self) -> Self {
        Self(self.0 - Duration::minutes(BIN_INTERVAL_MINUTES))
    }

    /// Signed whole minutes from `self` to `other`.
    pub fn minutes_until(&self, other: BinTimestamp) -> i64 {
        (other.0 - self.0).num_minutes()
    }

    /// Inner chrono datetime.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for BinTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl TryFrom<String> for BinTimestamp {
    type Error = TimeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        BinTimestamp::parse(&s)
    }
}

impl From<BinTimestamp> for String {
    fn from(ts: BinTimestamp) -> String {
        ts.to_string()
    }
}
