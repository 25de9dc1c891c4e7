use chrono::{FixedOffset, NaiveTime};
use tracing::debug;

use crate::error::AppResult;
use crate::models::interval::TimeInterval;
use crate::models::priority::Priority;
use crate::services::interval_store::IntervalStore;
use crate::utils::time::{self, MILLIS_PER_DAY};

/// Named constraint group shared by tasks through their tag name.
///
/// Forbidden intervals are never used for placing the tag's tasks; preferred
/// intervals are searched before the rest of the calendar. Intervals inside
/// one store may overlap.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    priority: Priority,
    forbidden: IntervalStore<()>,
    preferred: IntervalStore<()>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::default(),
            forbidden: IntervalStore::new(),
            preferred: IntervalStore::new(),
        }
    }

    pub fn with_priority(mut self, priority: u8) -> AppResult<Self> {
        self.set_priority(priority)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u8) -> AppResult<()> {
        self.priority = Priority::new(priority)?;
        Ok(())
    }

    pub fn add_forbidden_interval(&mut self, from: i64, until: i64) -> AppResult<()> {
        let interval = TimeInterval::new(from, until)?;
        self.forbidden.insert(interval);
        Ok(())
    }

    pub fn add_preferred_interval(&mut self, from: i64, until: i64) -> AppResult<()> {
        let interval = TimeInterval::new(from, until)?;
        self.preferred.insert(interval);
        Ok(())
    }

    /// Adds `from..until` (time of day in `offset`) on every day touched by
    /// `window`. Returns how many intervals were added.
    pub fn add_daily_forbidden_window(
        &mut self,
        window: &TimeInterval,
        from: NaiveTime,
        until: NaiveTime,
        offset: &FixedOffset,
    ) -> AppResult<usize> {
        let intervals = daily_intervals(window, from, until, offset)?;
        let added = intervals.len();
        intervals.into_iter().for_each(|interval| self.forbidden.insert(interval));
        debug!(target: "planet::tag", tag = %self.name, added, "daily forbidden window added");
        Ok(added)
    }

    pub fn add_daily_preferred_window(
        &mut self,
        window: &TimeInterval,
        from: NaiveTime,
        until: NaiveTime,
        offset: &FixedOffset,
    ) -> AppResult<usize> {
        let intervals = daily_intervals(window, from, until, offset)?;
        let added = intervals.len();
        intervals.into_iter().for_each(|interval| self.preferred.insert(interval));
        debug!(target: "planet::tag", tag = %self.name, added, "daily preferred window added");
        Ok(added)
    }

    pub fn forbidden_intervals(&self) -> Vec<TimeInterval> {
        self.forbidden.intervals().collect()
    }

    pub fn preferred_intervals(&self) -> Vec<TimeInterval> {
        self.preferred.intervals().collect()
    }

    pub fn forbidden_store(&self) -> &IntervalStore<()> {
        &self.forbidden
    }

    pub fn preferred_store(&self) -> &IntervalStore<()> {
        &self.preferred
    }

    pub fn has_preferred_intervals(&self) -> bool {
        !self.preferred.is_empty()
    }

    pub fn forbidden_collisions(&self, range: &TimeInterval) -> Vec<TimeInterval> {
        self.forbidden.overlap(range).map(|(hit, _)| hit).collect()
    }

    pub fn preferred_collisions(&self, range: &TimeInterval) -> Vec<TimeInterval> {
        self.preferred.overlap(range).map(|(hit, _)| hit).collect()
    }

    /// True when `range` touches at least one forbidden interval.
    pub fn is_interval_forbidden(&self, range: &TimeInterval) -> bool {
        self.forbidden.overlaps_any(range)
    }

    /// True when `range` touches at least one preferred interval.
    pub fn is_interval_preferred(&self, range: &TimeInterval) -> bool {
        self.preferred.overlaps_any(range)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tag {}

fn daily_intervals(
    window: &TimeInterval,
    from: NaiveTime,
    until: NaiveTime,
    offset: &FixedOffset,
) -> AppResult<Vec<TimeInterval>> {
    let mut intervals = Vec::new();
    let mut day_start = time::start_of_day(window.start(), offset)?;
    if until <= from {
        // The previous night spills into the first day.
        day_start -= MILLIS_PER_DAY;
    }
    while day_start <= window.end() {
        let start = time::at_time_of_day(day_start, from);
        let mut end = time::at_time_of_day(day_start, until);
        if end <= start {
            end += MILLIS_PER_DAY;
        }
        intervals.push(TimeInterval::new(start, end)?);
        day_start += MILLIS_PER_DAY;
    }
    Ok(intervals)
}
