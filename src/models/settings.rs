use serde::{Deserialize, Serialize};

use crate::utils::time::MILLIS_PER_MINUTE;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarSettings {
    /// Minimum gap kept between placed items.
    pub spacing_millis: i64,
    /// Length of the calendar window, counted from the origin's midnight.
    pub horizon_days: u32,
    /// Offset in which midnights and all-day events are computed.
    pub utc_offset_minutes: i32,
}

impl CalendarSettings {
    pub const MIN_SPACING_MILLIS: i64 = 1_000;
    pub const RECOMMENDED_SPACING_MILLIS: i64 = 15 * MILLIS_PER_MINUTE;
    pub const DEFAULT_HORIZON_DAYS: u32 = 30;

    pub fn with_spacing(spacing_millis: i64) -> Self {
        Self {
            spacing_millis,
            ..Self::default()
        }
    }

    /// Spacing as the engine uses it, never below the one-second floor.
    pub fn effective_spacing(&self) -> i64 {
        self.spacing_millis.max(Self::MIN_SPACING_MILLIS)
    }
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            spacing_millis: Self::MIN_SPACING_MILLIS,
            horizon_days: Self::DEFAULT_HORIZON_DAYS,
            utc_offset_minutes: 0,
        }
    }
}
