use std::fmt;

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::priority::Priority;
use crate::models::{normalize_tag_name, NO_TITLE};
use crate::utils::time::MILLIS_PER_MINUTE;

pub const DEFAULT_SESSION_MINUTES: u32 = 60;
pub const MIN_SESSION_MINUTES: u32 = 15;

/// Work of a known duration waiting to be placed on the calendar.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: Uuid,
    title: String,
    pub description: String,
    pub location: String,
    /// Copied onto the placed event; not used by placement.
    pub exclusive: bool,
    deadline: i64,
    duration_minutes: u32,
    priority: Priority,
    tag_name: Option<String>,
    max_session_minutes: u32,
    max_divisions: u32,
    reminder_minutes: Option<u32>,
}

impl Task {
    /// Builds a single-session task. The session limit defaults to an hour,
    /// or to the whole duration when the task is longer than that.
    pub fn new(title: impl Into<String>, deadline: i64, duration_minutes: u32) -> AppResult<Self> {
        if deadline < 0 {
            return Err(AppError::validation("deadline cannot be negative"));
        }
        if duration_minutes == 0 {
            return Err(AppError::validation("task duration must be positive"));
        }

        let title = title.into();
        Ok(Self {
            id: Uuid::new_v4(),
            title: if title.trim().is_empty() {
                NO_TITLE.to_string()
            } else {
                title
            },
            description: String::new(),
            location: String::new(),
            exclusive: true,
            deadline,
            duration_minutes,
            priority: Priority::default(),
            tag_name: None,
            max_session_minutes: duration_minutes.max(DEFAULT_SESSION_MINUTES),
            max_divisions: 1,
            reminder_minutes: None,
        })
    }

    pub fn with_tag(mut self, tag_name: &str) -> Self {
        self.set_tag_name(Some(tag_name));
        self
    }

    pub fn with_priority(mut self, priority: u8) -> AppResult<Self> {
        self.set_priority(priority)?;
        Ok(self)
    }

    /// Full validity predicate over raw inputs, as received from a caller.
    pub fn validate(
        reminder_minutes: i64,
        priority: u8,
        deadline: i64,
        duration_minutes: i64,
        max_session_minutes: i64,
        max_divisions: i64,
    ) -> AppResult<()> {
        if reminder_minutes < -1 {
            return Err(AppError::validation(
                "reminder is a number of minutes, -1 for no reminder",
            ));
        }
        Priority::new(priority)?;
        if deadline < 0 {
            return Err(AppError::validation("deadline cannot be negative"));
        }
        if duration_minutes <= 0 {
            return Err(AppError::validation("task duration must be positive"));
        }
        if max_divisions < 1 {
            return Err(AppError::validation(
                "at least one session of the task must be allowed",
            ));
        }
        if max_session_minutes < i64::from(MIN_SESSION_MINUTES) {
            return Err(AppError::validation(
                "maximal session time has to be at least 15 minutes",
            ));
        }
        ensure_attainable(duration_minutes, max_session_minutes, max_divisions)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn deadline(&self) -> i64 {
        self.deadline
    }

    pub fn set_deadline(&mut self, deadline: i64) -> AppResult<()> {
        if deadline < 0 {
            return Err(AppError::validation("deadline cannot be negative"));
        }
        self.deadline = deadline;
        Ok(())
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    pub fn duration_millis(&self) -> i64 {
        i64::from(self.duration_minutes) * MILLIS_PER_MINUTE
    }

    pub fn set_duration_minutes(&mut self, duration_minutes: u32) -> AppResult<()> {
        if duration_minutes == 0 {
            return Err(AppError::validation("task duration must be positive"));
        }
        ensure_attainable(
            i64::from(duration_minutes),
            i64::from(self.max_session_minutes),
            i64::from(self.max_divisions),
        )?;
        self.duration_minutes = duration_minutes;
        Ok(())
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

    /// `None`, an empty name and the `NoTag` sentinel all mean "untagged".
    pub fn set_tag_name(&mut self, tag_name: Option<&str>) {
        self.tag_name = normalize_tag_name(tag_name);
    }

    pub fn max_session_minutes(&self) -> u32 {
        self.max_session_minutes
    }

    pub fn set_max_session_minutes(&mut self, minutes: u32) -> AppResult<()> {
        if minutes < MIN_SESSION_MINUTES {
            return Err(AppError::validation(
                "maximal session time has to be at least 15 minutes",
            ));
        }
        ensure_attainable(
            i64::from(self.duration_minutes),
            i64::from(minutes),
            i64::from(self.max_divisions),
        )?;
        self.max_session_minutes = minutes;
        Ok(())
    }

    pub fn max_divisions(&self) -> u32 {
        self.max_divisions
    }

    pub fn set_max_divisions(&mut self, divisions: u32) -> AppResult<()> {
        if divisions < 1 {
            return Err(AppError::validation(
                "at least one session of the task must be allowed",
            ));
        }
        ensure_attainable(
            i64::from(self.duration_minutes),
            i64::from(self.max_session_minutes),
            i64::from(divisions),
        )?;
        self.max_divisions = divisions;
        Ok(())
    }

    pub fn reminder_minutes(&self) -> Option<u32> {
        self.reminder_minutes
    }

    pub fn set_reminder(&mut self, minutes: i64) {
        self.reminder_minutes = u32::try_from(minutes).ok();
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} min, priority {}, due {})",
            self.title, self.duration_minutes, self.priority, self.deadline
        )
    }
}

fn ensure_attainable(duration: i64, max_session: i64, max_divisions: i64) -> AppResult<()> {
    if max_session.saturating_mul(max_divisions) < duration {
        return Err(AppError::validation_with_details(
            "duration is unattainable under the session constraints",
            json!({
                "durationMinutes": duration,
                "maxSessionMinutes": max_session,
                "maxDivisions": max_divisions,
            }),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NO_TAG;

    #[test]
    fn new_task_has_defaults_that_satisfy_the_session_invariant() -> AppResult<()> {
        let short = Task::new("short", 0, 30)?;
        assert_eq!(short.max_session_minutes(), 60);
        assert_eq!(short.max_divisions(), 1);
        assert_eq!(short.priority().value(), 5);
        assert_eq!(short.tag_name(), None);

        let long = Task::new("long", 0, 300)?;
        assert_eq!(long.max_session_minutes(), 300);
        Ok(())
    }

    #[test]
    fn rejects_invalid_construction_inputs() {
        assert!(Task::new("t", -1, 30).is_err());
        assert!(Task::new("t", 0, 0).is_err());
    }

    #[test]
    fn setters_keep_duration_attainable() -> AppResult<()> {
        let mut task = Task::new("t", 0, 90)?;
        assert!(task.set_max_session_minutes(10).is_err());
        assert!(task.set_max_session_minutes(45).is_err());
        task.set_max_divisions(2)?;
        task.set_max_session_minutes(45)?;
        assert!(task.set_max_divisions(1).is_err());
        assert!(task.set_duration_minutes(91).is_err());
        task.set_duration_minutes(60)?;
        assert_eq!(task.duration_millis(), 60 * MILLIS_PER_MINUTE);
        Ok(())
    }

    #[test]
    fn validate_mirrors_the_field_rules() {
        assert!(Task::validate(-1, 5, 0, 60, 60, 1).is_ok());
        assert!(Task::validate(-2, 5, 0, 60, 60, 1).is_err());
        assert!(Task::validate(-1, 11, 0, 60, 60, 1).is_err());
        assert!(Task::validate(-1, 5, -1, 60, 60, 1).is_err());
        assert!(Task::validate(-1, 5, 0, 0, 60, 1).is_err());
        assert!(Task::validate(-1, 5, 0, 60, 60, 0).is_err());
        assert!(Task::validate(-1, 5, 0, 60, 14, 5).is_err());
        assert!(Task::validate(-1, 5, 0, 120, 60, 1).is_err());
        assert!(Task::validate(-1, 5, 0, 120, 60, 2).is_ok());
    }

    #[test]
    fn no_tag_sentinel_means_untagged() -> AppResult<()> {
        let task = Task::new("t", 0, 30)?.with_tag(NO_TAG);
        assert_eq!(task.tag_name(), None);
        let task = task.with_tag("sport").with_priority(8)?;
        assert_eq!(task.tag_name(), Some("sport"));
        assert_eq!(task.priority().value(), 8);
        Ok(())
    }
}
