//! ISO 8601 timestamps as `Option<DateTime<Utc>>`.
//!
//! A value that fails to parse is logged and read as `None` rather than
//! failing the whole document.
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Event {
//!     #[serde(default, with = "apikit::adapters::iso8601")]
//!     created: Option<DateTime<Utc>>,
//! }
//!
//! let event: Event = serde_json::from_str(r#"{"created":"yesterday"}"#).unwrap();
//! assert!(event.created.is_none());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

type SerializeResult<S> = Result<<S as Serializer>::Ok, <S as Serializer>::Error>;

pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> SerializeResult<S>
where
    S: Serializer,
{
    match value {
        Some(at) => serializer.serialize_str(&format(at)),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let parsed = parse(&raw);
        if parsed.is_none() {
            tracing::warn!(value = %raw, "Ignoring unparseable ISO 8601 timestamp");
        }
        parsed
    }))
}

/// `2018-03-07T09:05:03Z`, with milliseconds only when present.
pub fn format(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Accepts full timestamps with an offset, timestamps without one (read as
/// UTC), and bare dates (midnight UTC).
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
