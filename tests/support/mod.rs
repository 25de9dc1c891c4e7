#![allow(dead_code)]

use planet_lib::error::AppResult;
use planet_lib::models::event::Event;
use planet_lib::models::settings::CalendarSettings;
use planet_lib::services::calendar_engine::CalendarEngine;
use planet_lib::utils::time::{self, MILLIS_PER_MINUTE};

pub const MINUTE: i64 = MILLIS_PER_MINUTE;
pub const HOUR: i64 = 60 * MINUTE;
pub const SPACING: i64 = CalendarSettings::RECOMMENDED_SPACING_MILLIS;

/// Milliseconds for a UTC wall-clock time such as `"2021-05-13 14:00"`.
pub fn at(wall_clock: &str) -> i64 {
    let rfc3339 = format!("{}:00Z", wall_clock.replacen(' ', "T", 1));
    time::parse_datetime(&rfc3339).expect("valid test timestamp")
}

/// Calendar starting at the given wall-clock time with the recommended spacing.
pub fn setup_calendar(origin: &str) -> AppResult<CalendarEngine> {
    CalendarEngine::new(at(origin), &CalendarSettings::with_spacing(SPACING))
}

/// Panics if any two events, in start order, are closer than `spacing`.
pub fn assert_spaced(events: &[Event], spacing: i64) {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|event| event.start_time());
    for pair in sorted.windows(2) {
        let gap = pair[1].start_time() - pair[0].end_time();
        assert!(
            gap >= spacing,
            "'{}' and '{}' are only {gap} ms apart",
            pair[0].title(),
            pair[1].title()
        );
    }
}
