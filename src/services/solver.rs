use std::cmp::Reverse;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::event::Event;
use crate::models::task::Task;
use crate::services::calendar_engine::CalendarEngine;

/// Events created for one task of a batch.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedTask {
    pub task_id: Uuid,
    pub title: String,
    pub events: Vec<Event>,
}

/// Result of `add_tasks`. `halted_on` names the first task that found no
/// room; tasks ordered after it were not attempted.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub placed: Vec<PlacedTask>,
    pub halted_on: Option<Uuid>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.halted_on.is_none()
    }

    /// Every event created by the batch, in placement order.
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.placed.iter().flat_map(|placed| placed.events.iter())
    }
}

/// Orders `tasks` for placement: higher tag priority first, then higher
/// task priority. Equal keys keep their input order. Every task must name a
/// tag registered in `calendar`.
pub fn sort_tasks<'a>(tasks: &'a [Task], calendar: &CalendarEngine) -> AppResult<Vec<&'a Task>> {
    let mut keyed = tasks
        .iter()
        .map(|task| {
            let tag = calendar.resolve_tag_strict(task.tag_name())?;
            Ok((tag.priority(), task))
        })
        .collect::<AppResult<Vec<_>>>()?;

    keyed.sort_by_key(|(tag_priority, task)| (Reverse(*tag_priority), Reverse(task.priority())));
    Ok(keyed.into_iter().map(|(_, task)| task).collect())
}

/// Greedily places `tasks` in `sort_tasks` order and stops at the first one
/// that does not fit. Earlier placements stay in the calendar.
///
/// Fails before touching the calendar if any task has an unknown tag.
pub fn add_tasks(tasks: &[Task], calendar: &mut CalendarEngine) -> AppResult<BatchOutcome> {
    let ordered = sort_tasks(tasks, calendar)?;
    info!(target: "planet::solver", tasks = ordered.len(), "placing batch");

    let mut outcome = BatchOutcome::default();
    for task in ordered {
        let events = calendar.insert_task(task);
        if events.is_empty() {
            warn!(
                target: "planet::solver",
                task = %task.title(),
                placed = outcome.placed.len(),
                "no room left, batch halted"
            );
            outcome.halted_on = Some(task.id());
            break;
        }

        debug!(target: "planet::solver", task = %task.title(), events = events.len(), "task placed");
        outcome.placed.push(PlacedTask {
            task_id: task.id(),
            title: task.title().to_string(),
            events,
        });
    }

    Ok(outcome)
}
