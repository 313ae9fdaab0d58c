use chrono::{DateTime, Local, Utc};

/// Milliseconds since the UNIX epoch
pub fn timestamp_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Inverse of [`timestamp_millis`]; `None` past the range chrono can represent.
pub fn datetime_from_millis(millis: u64) -> Option<DateTime<Utc>> {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Local wall-clock stamp used in exported file names, e.g. `20240131_235959`
pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}
