use std::collections::BTreeMap;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::event::Event;
use crate::models::interval::TimeInterval;
use crate::models::settings::CalendarSettings;
use crate::models::tag::Tag;
use crate::models::task::Task;
use crate::models::NO_TAG;
use crate::services::free_time::{merge_overlapping, FreeTime};
use crate::services::interval_store::IntervalStore;
use crate::utils::time::{self, MILLIS_PER_DAY};

/// How `CalendarEngine::insert_task_with` searches for room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlacementStrategy {
    /// The tag's preferred intervals first, then the whole calendar.
    #[default]
    PreferredThenGeneral,
    /// Only the tag's preferred intervals; nothing for untagged tasks.
    PreferredOnly,
    /// The whole calendar, skipping the tag's forbidden intervals.
    GeneralOnly,
    /// Reserved for splitting a task into several sessions. Not implemented.
    Split,
}

/// A bounded calendar window holding occupied time and the tags that
/// constrain task placement.
///
/// Events (direct or produced by placing a task) are kept in one
/// `IntervalStore` ordered by start. Tags are owned here and looked up by
/// name; tasks only ever carry the name.
#[derive(Debug, Clone)]
pub struct CalendarEngine {
    start_time: i64,
    end_time: i64,
    spacing: i64,
    offset: FixedOffset,
    occupied: IntervalStore<Event>,
    tags: BTreeMap<String, Tag>,
}

impl CalendarEngine {
    /// The window starts at midnight (in the configured offset) of the day
    /// containing `origin_millis`.
    pub fn new(origin_millis: i64, settings: &CalendarSettings) -> AppResult<Self> {
        let offset = time::offset_from_minutes(settings.utc_offset_minutes)?;
        let start_time = time::start_of_day(origin_millis, &offset)?;
        let end_time = i64::from(settings.horizon_days)
            .checked_mul(MILLIS_PER_DAY)
            .and_then(|horizon| start_time.checked_add(horizon))
            .ok_or_else(|| AppError::validation("calendar horizon out of range"))?;

        info!(
            target: "planet::calendar",
            start_time,
            end_time,
            spacing = settings.effective_spacing(),
            "calendar created"
        );

        Ok(Self {
            start_time,
            end_time,
            spacing: settings.effective_spacing(),
            offset,
            occupied: IntervalStore::new(),
            tags: BTreeMap::new(),
        })
    }

    /// Builds a calendar and registers `tags` and `events` in that order.
    /// Events that fall outside the window or repeat an existing entry are
    /// skipped; `NoTag` tags are ignored and later tags replace earlier ones
    /// with the same name.
    pub fn with_initial(
        origin_millis: i64,
        spacing_millis: i64,
        events: Vec<Event>,
        tags: Vec<Tag>,
    ) -> AppResult<Self> {
        let mut engine = Self::new(origin_millis, &CalendarSettings::with_spacing(spacing_millis))?;

        for tag in tags {
            if tag.name() == NO_TAG {
                continue;
            }
            engine.upsert_tag(tag);
        }

        for event in events {
            let title = event.title().to_string();
            if let Err(err) = engine.insert_event(event) {
                warn!(target: "planet::calendar", %title, error = %err, "initial event skipped");
            }
        }

        Ok(engine)
    }

    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    pub fn window(&self) -> TimeInterval {
        TimeInterval::from_ordered(self.start_time, self.end_time)
    }

    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    pub fn offset(&self) -> &FixedOffset {
        &self.offset
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    pub fn is_valid_date(&self, time: i64) -> bool {
        self.start_time <= time && time <= self.end_time
    }

    fn ensure_in_window(&self, interval: &TimeInterval) -> AppResult<()> {
        for time in [interval.start(), interval.end()] {
            if !self.is_valid_date(time) {
                return Err(AppError::out_of_window(time, self.start_time, self.end_time));
            }
        }
        Ok(())
    }

    // ---- occupancy -------------------------------------------------------

    /// Events whose span intersects `range`, inclusive at both ends.
    pub fn collisions(&self, range: &TimeInterval) -> Vec<&Event> {
        self.occupied.overlap(range).map(|(_, event)| event).collect()
    }

    pub fn is_interval_available(&self, range: &TimeInterval) -> bool {
        !self.occupied.overlaps_any(range)
    }

    /// All occupied entries in ascending start order.
    pub fn events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.occupied.iter().map(|(_, event)| event)
    }

    /// Inserts `event` unless the same event is already stored at its start.
    pub fn insert_event(&mut self, event: Event) -> AppResult<()> {
        let interval = event.interval();
        self.ensure_in_window(&interval)?;
        if self.occupied.contains(&interval, &event) {
            return Err(AppError::duplicate(format!(
                "event '{}' is already in the calendar",
                event.title()
            )));
        }

        debug!(target: "planet::calendar", title = %event.title(), start = interval.start(), end = interval.end(), "event inserted");
        self.occupied.add(interval, event);
        Ok(())
    }

    /// Inserts `event` even if an equal entry exists; overlaps are allowed.
    pub fn force_insert_event(&mut self, event: Event) -> AppResult<()> {
        let interval = event.interval();
        self.ensure_in_window(&interval)?;

        debug!(target: "planet::calendar", title = %event.title(), start = interval.start(), end = interval.end(), "event force-inserted");
        self.occupied.add(interval, event);
        Ok(())
    }

    /// Removes one stored copy of `event`. Returns whether it was found.
    pub fn remove_event(&mut self, event: &Event) -> bool {
        let removed = self.occupied.remove(&event.interval(), event);
        if removed {
            debug!(target: "planet::calendar", title = %event.title(), "event removed");
        }
        removed
    }

    /// Lazy sequence of free intervals across the window. Holding it keeps
    /// the calendar borrowed, so it cannot outlive a later mutation.
    pub fn free_time(&self) -> FreeTime<impl Iterator<Item = TimeInterval> + '_> {
        FreeTime::new(self.occupied.intervals(), self.window(), self.spacing)
    }

    // ---- tags ------------------------------------------------------------

    pub fn contains_tag(&self, tag_name: &str) -> bool {
        self.tags.contains_key(tag_name)
    }

    /// Registers `tag`; fails if the name is taken or is the `NoTag` sentinel.
    pub fn add_tag(&mut self, tag: Tag) -> AppResult<()> {
        if tag.name() == NO_TAG || tag.name().trim().is_empty() {
            return Err(AppError::validation(format!(
                "'{}' cannot be used as a tag name",
                tag.name()
            )));
        }
        if self.tags.contains_key(tag.name()) {
            return Err(AppError::duplicate(format!(
                "tag '{}' already exists",
                tag.name()
            )));
        }
        debug!(target: "planet::tag", tag = %tag.name(), priority = tag.priority().value(), "tag added");
        self.tags.insert(tag.name().to_string(), tag);
        Ok(())
    }

    /// Inserts `tag`, replacing any tag of the same name. Returns the old one.
    pub fn upsert_tag(&mut self, tag: Tag) -> Option<Tag> {
        debug!(target: "planet::tag", tag = %tag.name(), priority = tag.priority().value(), "tag upserted");
        self.tags.insert(tag.name().to_string(), tag)
    }

    pub fn remove_tag(&mut self, tag_name: &str) -> Option<Tag> {
        self.tags.remove(tag_name)
    }

    pub fn tag(&self, tag_name: &str) -> Option<&Tag> {
        self.tags.get(tag_name)
    }

    pub fn tag_mut(&mut self, tag_name: &str) -> Option<&mut Tag> {
        self.tags.get_mut(tag_name)
    }

    /// Names in ascending order.
    pub fn tag_names(&self) -> Vec<String> {
        self.tags.keys().cloned().collect()
    }

    pub fn tags(&self) -> Vec<&Tag> {
        self.tags.values().collect()
    }

    /// Direct placement lookup: a missing or unknown name means "untagged".
    pub fn resolve_tag_lenient(&self, tag_name: Option<&str>) -> Option<&Tag> {
        let tag_name = tag_name?;
        let tag = self.tags.get(tag_name);
        if tag.is_none() && tag_name != NO_TAG {
            debug!(target: "planet::tag", tag = %tag_name, "unknown tag treated as untagged");
        }
        tag
    }

    /// Batch lookup: a missing or unknown name is an error.
    pub fn resolve_tag_strict(&self, tag_name: Option<&str>) -> AppResult<&Tag> {
        let tag_name = tag_name.unwrap_or(NO_TAG);
        self.tags
            .get(tag_name)
            .ok_or_else(|| AppError::unknown_tag(tag_name))
    }

    /// `false` for unknown tags.
    pub fn is_interval_tagged_forbidden(&self, tag_name: &str, range: &TimeInterval) -> bool {
        self.tags
            .get(tag_name)
            .map_or(false, |tag| tag.is_interval_forbidden(range))
    }

    /// `false` for unknown tags.
    pub fn is_interval_tagged_preferred(&self, tag_name: &str, range: &TimeInterval) -> bool {
        self.tags
            .get(tag_name)
            .map_or(false, |tag| tag.is_interval_preferred(range))
    }

    // ---- placement -------------------------------------------------------

    /// Places `task` in its tag's preferred time if possible, otherwise in
    /// the first free time its tag does not forbid. Returns the created
    /// events; empty when nothing fits, in which case nothing changed.
    pub fn insert_task(&mut self, task: &Task) -> Vec<Event> {
        self.insert_task_or_empty(task, PlacementStrategy::PreferredThenGeneral)
    }

    /// Places `task` only inside its tag's preferred intervals.
    pub fn preferred_insert_task(&mut self, task: &Task) -> Vec<Event> {
        self.insert_task_or_empty(task, PlacementStrategy::PreferredOnly)
    }

    pub fn insert_task_with(
        &mut self,
        task: &Task,
        strategy: PlacementStrategy,
    ) -> AppResult<Vec<Event>> {
        let Some(slot) = self.locate(task, strategy)? else {
            debug!(target: "planet::calendar", task = %task.title(), ?strategy, "no room for task");
            return Ok(Vec::new());
        };

        let event = Event::for_task(task, slot.start(), slot.end())?;
        debug!(
            target: "planet::calendar",
            task = %task.title(),
            start = slot.start(),
            end = slot.end(),
            ?strategy,
            "task placed"
        );
        self.occupied.add(slot, event.clone());
        Ok(vec![event])
    }

    fn insert_task_or_empty(&mut self, task: &Task, strategy: PlacementStrategy) -> Vec<Event> {
        match self.insert_task_with(task, strategy) {
            Ok(events) => events,
            Err(err) => {
                warn!(target: "planet::calendar", task = %task.title(), error = %err, "task placement failed");
                Vec::new()
            }
        }
    }

    fn locate(&self, task: &Task, strategy: PlacementStrategy) -> AppResult<Option<TimeInterval>> {
        let desired = task.duration_millis().saturating_add(self.spacing);
        let tag = self.resolve_tag_lenient(task.tag_name());

        let slot = match strategy {
            PlacementStrategy::PreferredThenGeneral => tag
                .and_then(|tag| self.locate_preferred(tag, desired))
                .or_else(|| self.locate_general(tag, desired)),
            PlacementStrategy::PreferredOnly => {
                tag.and_then(|tag| self.locate_preferred(tag, desired))
            }
            PlacementStrategy::GeneralOnly => self.locate_general(tag, desired),
            PlacementStrategy::Split => {
                return Err(AppError::unsupported(
                    "splitting a task into several sessions is not implemented",
                ))
            }
        };
        Ok(slot)
    }

    fn locate_preferred(&self, tag: &Tag, desired: i64) -> Option<TimeInterval> {
        if !tag.has_preferred_intervals() {
            return None;
        }
        self.first_fit(tag.preferred_store().intervals(), desired, |window| {
            merge_overlapping(self.occupied.overlap(window).map(|(hit, _)| hit)).next()
        })
    }

    fn locate_general(&self, tag: Option<&Tag>, desired: i64) -> Option<TimeInterval> {
        match tag {
            Some(tag) => self.first_fit(self.free_time(), desired, |window| {
                merge_overlapping(tag.forbidden_store().overlap(window).map(|(hit, _)| hit)).next()
            }),
            None => self.first_fit(self.free_time(), desired, |_| None),
        }
    }

    /// Walks `candidates` in order and returns the first slot of length
    /// `desired` starting at the candidate's spaced start. The slot must
    /// stay inside the candidate and the window, end strictly before the
    /// first collision reported for the candidate, and leave `spacing`
    /// before the next occupied entry. A candidate that fails is dropped
    /// whole; later starts inside it are not tried.
    fn first_fit<I, F>(&self, candidates: I, desired: i64, first_collision: F) -> Option<TimeInterval>
    where
        I: Iterator<Item = TimeInterval>,
        F: Fn(&TimeInterval) -> Option<TimeInterval>,
    {
        for candidate in candidates {
            let start = self.spaced_start(&candidate);
            let Some(slot_end) = start
                .checked_add(desired)
                .filter(|end| *end <= candidate.end())
            else {
                continue;
            };

            let slot = TimeInterval::from_ordered(start, slot_end);
            if !self.is_valid_date(slot.start()) || !self.is_valid_date(slot.end()) {
                continue;
            }

            if let Some(collision) = first_collision(&candidate) {
                if !slot.is_before(&collision) {
                    continue;
                }
            }
            if self.has_trailing_blocker(&slot) {
                continue;
            }
            return Some(slot);
        }
        None
    }

    /// Whether an occupied entry starts less than `spacing` after `slot` ends.
    fn has_trailing_blocker(&self, slot: &TimeInterval) -> bool {
        let clearance_end = slot.end().saturating_add(self.spacing - 1);
        self.occupied
            .overlaps_any(&TimeInterval::from_ordered(slot.end(), clearance_end))
    }

    /// Earliest start in `candidate` keeping `spacing` after any occupied
    /// entry that ends within `spacing` before the candidate (or runs into it).
    pub fn spaced_start(&self, candidate: &TimeInterval) -> i64 {
        let lookback = TimeInterval::from_ordered(
            candidate.start().saturating_sub(self.spacing),
            candidate.start(),
        );
        let latest_end = self
            .occupied
            .overlap(&lookback)
            .map(|(hit, _)| hit.end())
            .fold(lookback.start(), i64::max);
        latest_end.saturating_add(self.spacing)
    }
}
