use std::convert::TryFrom;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::db::models::SessionStatus;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

/// Legacy rows may hold NULL or negative numbers; both read as zero.
pub fn to_u64_lenient(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

pub fn to_u32_lenient(value: Option<i64>) -> u32 {
    value.and_then(|v| u32::try_from(v).ok()).unwrap_or(0)
}

/// Unreadable timestamps become `None` instead of failing the whole read.
pub fn parse_optional_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
    value.and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

pub fn format_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn parse_status(value: &str) -> Result<SessionStatus> {
    match value {
        "COMPLETED" | "TAMAMLANDI" => Ok(SessionStatus::Completed),
        "ABANDONED" | "YARIDA KALDI" => Ok(SessionStatus::Abandoned),
        other => Err(anyhow!("unknown session status {other}")),
    }
}
