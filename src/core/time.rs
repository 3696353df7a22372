//! Hour-bucket helpers on the fixed UTC+8 civil calendar.
//!
//! Measurements are keyed by the epoch second at the top of their hour as seen
//! from Asia/Shanghai, which has no daylight saving, so a fixed offset suffices.

use chrono::{DateTime, DurationRound, FixedOffset, TimeDelta, Utc};
use ulid::Ulid;

use crate::core::error::{AqhiError, Result};

pub const HOUR_SECS: i64 = 3600;

/// UTC offset of the civil calendar hour buckets are aligned to.
pub const TZ_OFFSET_SECS: i32 = 8 * 3600;

pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(TZ_OFFSET_SECS).expect("UTC+8 is within chrono's offset range")
}

fn to_civil(epoch_secs: i64) -> Result<DateTime<FixedOffset>> {
    DateTime::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.with_timezone(&civil_offset()))
        .ok_or_else(|| AqhiError::ValidationError(format!("timestamp out of range: {}", epoch_secs)))
}

/// Floor `epoch_secs` to the start of its hour in the civil calendar.
pub fn truncate_to_hour(epoch_secs: i64) -> Result<i64> {
    let civil = to_civil(epoch_secs)?;
    let floored = civil
        .duration_trunc(TimeDelta::hours(1))
        .map_err(|e| AqhiError::ValidationError(format!("cannot truncate {}: {}", epoch_secs, e)))?;
    Ok(floored.timestamp())
}

/// The truncated hour containing "now".
pub fn current_hour() -> Result<i64> {
    truncate_to_hour(Utc::now().timestamp())
}

/// RFC 3339 rendering with the civil offset, e.g. `2025-03-01T09:00:00+08:00`.
pub fn format_hour(epoch_secs: i64) -> Result<String> {
    Ok(to_civil(epoch_secs)?.to_rfc3339())
}

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    format!("{}Z", Utc::now().timestamp())
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}
