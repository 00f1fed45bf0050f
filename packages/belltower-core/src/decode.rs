//! Lenient decoding for notification records.
//!
//! Records come from the server and from caches written by older clients.
//! Sparse or `null` fields fall back to their defaults, and a record that
//! still cannot be decoded is dropped on its own instead of failing the
//! whole list.

use crate::Notification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Missing and `null` both become `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 服务器可能返回数字 id
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "notification id must be a string or number, got {other}"
        ))),
    }
}

pub(crate) fn unknown_timestamp() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// RFC 3339 strings or epoch milliseconds. Anything else sorts as the
/// oldest possible record.
pub(crate) fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    Ok(parsed.unwrap_or_else(unknown_timestamp))
}

/// Decodes each element on its own. Returns the records that decoded and
/// how many were dropped.
pub fn decode_notifications(values: Vec<Value>) -> (Vec<Notification>, usize) {
    let total = values.len();
    let decoded: Vec<Notification> = values
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect();
    let dropped = total - decoded.len();
    (decoded, dropped)
}

pub(crate) fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Notification>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(decode_notifications(values.unwrap_or_default()).0)
}
