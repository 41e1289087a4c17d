//! ISO-8601 timestamp handling for wire payloads.
//!
//! Contest data files are written by more than one producer; some emit full
//! RFC 3339 (`2024-03-01T10:00:00Z`), others a bare local-free form
//! (`2024-03-01T10:00:00`). Bare timestamps are taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse an ISO-8601 timestamp, accepting RFC 3339 or a bare
/// `YYYY-MM-DDTHH:MM:SS` form (assumed UTC).
pub fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Render a timestamp in the canonical wire form (RFC 3339, seconds, UTC).
pub fn to_iso8601(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Serde adapter: timestamp as an ISO-8601 string, lenient on input.
pub mod serde_iso8601 {
    use super::{parse_iso8601, to_iso8601};
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&to_iso8601(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        parse_iso8601(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
    }
}

/// Serde adapter for `Option<DateTime<Utc>>`: empty or missing strings map to
/// `None` rather than failing the whole document.
pub mod serde_iso8601_opt {
    use super::{parse_iso8601, to_iso8601};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => ser.serialize_str(&to_iso8601(dt)),
            None => ser.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(de)?;
        Ok(raw.as_deref().and_then(parse_iso8601))
    }
}
