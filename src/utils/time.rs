use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
pub const MILLIS_PER_DAY: i64 = 24 * 60 * MILLIS_PER_MINUTE;

pub fn offset_from_minutes(minutes: i32) -> AppResult<FixedOffset> {
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        AppError::validation_with_details("UTC offset out of range", json!({ "minutes": minutes }))
    })
}

pub fn to_datetime(millis: i64, offset: &FixedOffset) -> AppResult<DateTime<FixedOffset>> {
    DateTime::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(offset))
        .ok_or_else(|| {
            AppError::validation_with_details("timestamp out of range", json!({ "millis": millis }))
        })
}

pub fn parse_datetime(value: &str) -> AppResult<i64> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|err| {
            AppError::validation_with_details(
                "invalid datetime format",
                json!({ "value": value, "error": err.to_string() }),
            )
        })
}

pub fn format_millis(millis: i64, offset: &FixedOffset) -> AppResult<String> {
    Ok(to_datetime(millis, offset)?.to_rfc3339())
}

pub fn minutes_to_millis(minutes: i64) -> AppResult<i64> {
    minutes
        .checked_mul(MILLIS_PER_MINUTE)
        .ok_or_else(|| AppError::validation("duration out of range"))
}

/// Midnight (in `offset`) of the day containing `millis`.
pub fn start_of_day(millis: i64, offset: &FixedOffset) -> AppResult<i64> {
    let local = to_datetime(millis, offset)?;
    let midnight = local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| AppError::validation("midnight must be representable"))?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| AppError::validation("ambiguous local midnight"))
}

/// First midnight that is not before `millis`.
pub fn midnight_at_or_after(millis: i64, offset: &FixedOffset) -> AppResult<i64> {
    let floor = start_of_day(millis, offset)?;
    if floor == millis {
        Ok(floor)
    } else {
        Ok(floor + MILLIS_PER_DAY)
    }
}

pub fn at_time_of_day(day_start: i64, time: NaiveTime) -> i64 {
    day_start
        + i64::from(time.num_seconds_from_midnight()) * MILLIS_PER_SECOND
        + i64::from(time.nanosecond() / 1_000_000)
}
