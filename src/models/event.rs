use std::fmt;

use chrono::FixedOffset;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::interval::TimeInterval;
use crate::models::priority::Priority;
use crate::models::task::Task;
use crate::models::{normalize_tag_name, NO_TITLE};
use crate::utils::time::{self, MILLIS_PER_DAY};

/// A span of calendar time, either added directly or produced by placing a task.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    id: Uuid,
    title: String,
    pub description: String,
    pub location: String,
    start_time: i64,
    end_time: i64,
    all_day: bool,
    /// Caller's marker for whether the slot may be shared. Placement does
    /// not read it: every stored event occupies its span. Overlaps are made
    /// on purpose through `CalendarEngine::force_insert_event`.
    pub exclusive: bool,
    reminder_minutes: Option<u32>,
    priority: Priority,
    tag_name: Option<String>,
    task_id: Option<Uuid>,
}

impl Event {
    pub fn new(title: impl Into<String>, start_time: i64, end_time: i64) -> AppResult<Self> {
        TimeInterval::new(start_time, end_time)?;
        Ok(Self {
            id: Uuid::new_v4(),
            title: normalize_title(title.into()),
            description: String::new(),
            location: String::new(),
            start_time,
            end_time,
            all_day: false,
            exclusive: true,
            reminder_minutes: None,
            priority: Priority::default(),
            tag_name: None,
            task_id: None,
        })
    }

    /// Event produced by placing `task` at `[start_time, end_time]`.
    pub fn for_task(task: &Task, start_time: i64, end_time: i64) -> AppResult<Self> {
        let mut event = Event::new(task.title(), start_time, end_time)?;
        event.description = task.description.clone();
        event.location = task.location.clone();
        event.exclusive = task.exclusive;
        event.reminder_minutes = task.reminder_minutes();
        event.priority = task.priority();
        event.tag_name = task.tag_name().map(str::to_string);
        event.task_id = Some(task.id());
        Ok(event)
    }

    /// Construction-time validity check, without building an event.
    pub fn validate(reminder_minutes: i64, start_time: i64, end_time: i64) -> AppResult<()> {
        if reminder_minutes < -1 {
            return Err(AppError::validation(
                "reminder is a number of minutes, -1 for no reminder",
            ));
        }
        if start_time < 0 {
            return Err(AppError::validation("start time cannot be negative"));
        }
        TimeInterval::new(start_time, end_time).map(|_| ())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = normalize_title(title.into());
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_ordered(self.start_time, self.end_time)
    }

    pub fn duration_millis(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Moves the event so it starts at `start_time`, keeping its duration.
    pub fn set_start_time(&mut self, start_time: i64) -> AppResult<()> {
        if start_time < 0 {
            return Err(AppError::validation("start time cannot be negative"));
        }
        let duration = self.duration_millis();
        let end_time = start_time
            .checked_add(duration)
            .ok_or_else(|| AppError::validation("end time out of range"))?;
        self.start_time = start_time;
        self.end_time = end_time;
        Ok(())
    }

    pub fn set_end_time(&mut self, end_time: i64) -> AppResult<()> {
        TimeInterval::new(self.start_time, end_time)?;
        self.end_time = end_time;
        Ok(())
    }

    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    /// Setting the flag snaps the event to whole days in `offset`: the start
    /// moves back to its midnight, the end forward to the next midnight. An
    /// event that would collapse to nothing keeps one full day.
    pub fn set_all_day(&mut self, all_day: bool, offset: &FixedOffset) -> AppResult<()> {
        if all_day {
            let start_time = time::start_of_day(self.start_time, offset)?;
            let mut end_time = time::midnight_at_or_after(self.end_time, offset)?;
            if end_time == start_time {
                end_time += MILLIS_PER_DAY;
            }
            self.start_time = start_time;
            self.end_time = end_time;
        }
        self.all_day = all_day;
        Ok(())
    }

    pub fn reminder_minutes(&self) -> Option<u32> {
        self.reminder_minutes
    }

    /// Negative values clear the reminder.
    pub fn set_reminder(&mut self, minutes: i64) {
        self.reminder_minutes = u32::try_from(minutes).ok();
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: u8) -> AppResult<()> {
        self.priority = Priority::new(priority)?;
        Ok(())
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.tag_name.as_deref()
    }

    pub fn set_tag_name(&mut self, tag_name: Option<&str>) {
        self.tag_name = normalize_tag_name(tag_name);
    }

    /// The task this event was placed for, if any.
    pub fn task_id(&self) -> Option<Uuid> {
        self.task_id
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} - {}] priority {}",
            self.title, self.start_time, self.end_time, self.priority
        )?;
        if let Some(tag) = &self.tag_name {
            write!(f, " tagged {tag}")?;
        }
        Ok(())
    }
}

fn normalize_title(title: String) -> String {
    if title.trim().is_empty() {
        NO_TITLE.to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn millis(day: u32, hour: u32, minute: u32) -> i64 {
        NaiveDate::from_ymd_opt(2021, 5, day)
            .expect("valid date")
            .and_hms_opt(hour, minute, 0)
            .expect("valid time")
            .and_utc()
            .timestamp_millis()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).expect("utc")
    }

    #[test]
    fn empty_title_falls_back_to_placeholder() -> AppResult<()> {
        let mut event = Event::new("", millis(16, 6, 0), millis(16, 18, 0))?;
        assert_eq!(event.title(), NO_TITLE);
        event.set_title("Lecture");
        assert_eq!(event.title(), "Lecture");
        event.set_title("   ");
        assert_eq!(event.title(), NO_TITLE);
        Ok(())
    }

    #[test]
    fn end_before_start_is_rejected() -> AppResult<()> {
        assert!(Event::new("bad", millis(16, 6, 0), millis(16, 5, 0)).is_err());

        let mut event = Event::new("ok", millis(16, 6, 0), millis(16, 18, 0))?;
        assert!(event.set_end_time(millis(16, 5, 0)).is_err());
        assert_eq!(event.end_time(), millis(16, 18, 0));
        Ok(())
    }

    #[test]
    fn moving_the_start_keeps_the_duration() -> AppResult<()> {
        let mut event = Event::new("move", millis(16, 6, 0), millis(16, 7, 0))?;
        event.set_start_time(millis(16, 15, 0))?;
        assert_eq!(event.end_time(), millis(16, 16, 0));
        assert!(event.set_start_time(-1).is_err());
        assert_eq!(event.start_time(), millis(16, 15, 0));
        Ok(())
    }

    #[test]
    fn all_day_snaps_to_whole_days() -> AppResult<()> {
        let mut event = Event::new("day", millis(16, 6, 0), millis(16, 7, 0))?;
        event.set_all_day(true, &utc())?;
        assert!(event.is_all_day());
        assert_eq!(event.start_time(), millis(16, 0, 0));
        assert_eq!(event.end_time(), millis(17, 0, 0));

        let mut trip = Event::new("trip", millis(13, 14, 0), millis(14, 12, 0))?;
        trip.set_all_day(true, &utc())?;
        assert_eq!(trip.start_time(), millis(13, 0, 0));
        assert_eq!(trip.end_time(), millis(15, 0, 0));

        let mut instant = Event::new("instant", millis(20, 0, 0), millis(20, 0, 0))?;
        instant.set_all_day(true, &utc())?;
        assert_eq!(instant.end_time(), millis(21, 0, 0));
        Ok(())
    }

    #[test]
    fn negative_reminder_clears_it() -> AppResult<()> {
        let mut event = Event::new("r", millis(16, 6, 0), millis(16, 7, 0))?;
        event.set_reminder(10);
        assert_eq!(event.reminder_minutes(), Some(10));
        event.set_reminder(-10);
        assert_eq!(event.reminder_minutes(), None);
        assert!(event.set_priority(0).is_err());
        assert_eq!(event.priority().value(), 5);
        Ok(())
    }

    #[test]
    fn validate_checks_reminder_and_bounds() {
        assert!(Event::validate(-1, 0, 10).is_ok());
        assert!(Event::validate(-2, 0, 10).is_err());
        assert!(Event::validate(5, 10, 0).is_err());
        assert!(Event::validate(5, -10, 0).is_err());
    }
}
