//! Per-table SQLite operations, implemented as inherent methods on `Database`.

pub mod agents;
pub mod companies;
pub mod tasks;
pub mod users;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use std::str::FromStr;

/// Parse an RFC 3339 column into UTC.
pub(crate) fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a text column through `FromStr` (roles, statuses).
pub(crate) fn parse_enum<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a JSON text column.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: String) -> rusqlite::Result<T> {
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
