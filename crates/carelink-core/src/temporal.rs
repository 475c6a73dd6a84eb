//! # Temporal Types
//!
//! [`Timestamp`] is a UTC-only instant truncated to seconds precision. The
//! timeline hash chain digests the ISO 8601 rendering, so every instant must
//! have exactly one textual form: `YYYY-MM-DDTHH:MM:SSZ`.
//!
//! [`Watermark`] describes the store state a read-side aggregation was
//! computed from.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Offsets other than `Z` are converted to UTC.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TimestampError(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// The inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Time elapsed from `earlier` to `self`. Negative if `earlier` is later.
    pub fn since(&self, earlier: &Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// Shift by a signed duration. Saturates to `self` on overflow.
    pub fn plus(&self, delta: Duration) -> Self {
        self.0
            .checked_add_signed(delta)
            .map(Self)
            .unwrap_or(*self)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TimestampError(String);

/// The snapshot a read-side aggregation was computed from.
///
/// Readers tolerate eventual consistency; the watermark tells a caller how
/// fresh the figures are. `last_updated` is the newest write visible in the
/// snapshot and `records` the number of records aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub observed_at: Timestamp,
    pub last_updated: Option<Timestamp>,
    pub records: usize,
}

impl Watermark {
    /// Build a watermark from the `updated_at` stamps of the aggregated records.
    pub fn from_updates<I>(updates: I) -> Self
    where
        I: IntoIterator<Item = Timestamp>,
    {
        let mut records = 0;
        let mut last_updated: Option<Timestamp> = None;
        for ts in updates {
            records += 1;
            last_updated = Some(match last_updated {
                Some(prev) if prev >= ts => prev,
                _ => ts,
            });
        }
        Self {
            observed_at: Timestamp::now(),
            last_updated,
            records,
        }
    }
}
