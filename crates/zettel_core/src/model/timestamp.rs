//! ISO-8601 timestamp helpers shared by persisted records.
//!
//! Timestamps are written as UTC with millisecond precision
//! (`2023-05-15T10:30:00.000Z`). Reads also accept offset-less date-times
//! and bare dates, both taken as UTC.

use chrono::{DateTime, DurationRound, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

/// UTC instant used for every `createdAt`/`updatedAt` field.
pub type Timestamp = DateTime<Utc>;

/// Formats a timestamp the way it is persisted.
pub fn format_iso8601(value: &Timestamp) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Offset-less layouts tried after RFC 3339, in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses an ISO-8601 timestamp into UTC. Returns `None` on malformed input.
///
/// Tries RFC 3339 first, then date-times without an offset, then a bare
/// `YYYY-MM-DD` at midnight. Offset-less values are read as UTC.
pub fn parse_iso8601(value: &str) -> Option<Timestamp> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Drops sub-millisecond precision so values survive a persist/load cycle.
pub fn truncate_to_millis(value: Timestamp) -> Timestamp {
    value
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(value)
}

pub fn serialize<S>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_iso8601(value))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_iso8601(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp `{raw}`")))
}

/// `serde(with = ...)` adapter for optional timestamps.
pub mod option {
    use super::{format_iso8601, parse_iso8601, Timestamp};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_some(&format_iso8601(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse_iso8601(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp `{raw}`"))),
            None => Ok(None),
        }
    }
}
