use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Closed time interval `[start, end]` in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub struct TimeInterval {
    start: i64,
    end: i64,
}

impl TimeInterval {
    pub fn new(start: i64, end: i64) -> AppResult<Self> {
        if end < start {
            return Err(AppError::invalid_interval(start, end));
        }
        Ok(Self { start, end })
    }

    /// Caller guarantees `start <= end`.
    pub(crate) fn from_ordered(start: i64, end: i64) -> Self {
        debug_assert!(start <= end, "interval bounds out of order");
        Self { start, end }
    }

    /// Degenerate interval used to key an entry by a single instant.
    pub fn point(at: i64) -> Self {
        Self { start: at, end: at }
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Saturates for spans wider than `i64::MAX`.
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive at both ends: touching intervals overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// True when this interval ends strictly before `other` starts.
    pub fn is_before(&self, other: &TimeInterval) -> bool {
        self.end < other.start
    }

    pub fn contains_instant(&self, at: i64) -> bool {
        self.start <= at && at <= self.end
    }

    /// Smallest interval covering both.
    pub fn span(&self, other: &TimeInterval) -> TimeInterval {
        TimeInterval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawInterval {
    start: i64,
    end: i64,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = AppError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl From<TimeInterval> for RawInterval {
    fn from(interval: TimeInterval) -> Self {
        RawInterval {
            start: interval.start,
            end: interval.end,
        }
    }
}
