//! Shared row/domain conversion helpers. Columns store milliseconds since
//! the Unix epoch; JSON columns hold the nested value types so the store
//! layer stays the single serialization boundary.

use chrono::{DateTime, Utc};

pub(crate) fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn opt_to_millis(dt: Option<DateTime<Utc>>) -> Option<i64> {
    dt.map(to_millis)
}

pub(crate) fn opt_from_millis(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.map(from_millis)
}
