//! Session records as stored by the VR client.
//!
//! A record is an untrusted JSON object. The athlete's answers live either
//! at the top level or under a nested `data` object, depending on which
//! client version uploaded it.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single uploaded training session.
pub type SessionRecord = Map<String, Value>;

/// Key of the nested payload object written by newer clients.
pub const DATA_KEY: &str = "data";
/// Key the prediction is stored under when a record is returned to callers.
pub const REGULATION_KEY: &str = "emotional_regulation";
/// Upload timestamp used to order sessions within a day.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// The object holding the athlete's answers: `data` when it is an object,
/// otherwise the record itself.
pub fn payload(record: &SessionRecord) -> &SessionRecord {
    match record.get(DATA_KEY) {
        Some(Value::Object(inner)) => inner,
        _ => record,
    }
}

/// Upload timestamp as a string, `""` when absent or not a string.
pub fn timestamp(record: &SessionRecord) -> &str {
    record
        .get(TIMESTAMP_KEY)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

#[derive(Debug, Error)]
#[error("invalid session date {input:?}: expected YYYY-MM-DD")]
pub struct SessionDateError {
    pub input: String,
}

/// Parse a `YYYY-MM-DD` session date.
pub fn parse_session_date(s: &str) -> Result<NaiveDate, SessionDateError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| SessionDateError {
        input: s.to_string(),
    })
}
