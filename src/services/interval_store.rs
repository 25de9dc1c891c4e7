use std::collections::BTreeMap;

use crate::models::interval::TimeInterval;

/// Ordered multiset of closed intervals, each carrying a payload.
///
/// Entries are kept in a `BTreeMap` keyed by `(start, end)`, so in-order
/// iteration is ascending by start with ties broken by end, and entries
/// sharing the same bounds keep their insertion order. Overlap queries scan
/// only the keys whose start lies in `[range.start - max_span, range.end]`,
/// where `max_span` is the widest interval ever stored.
#[derive(Debug, Clone)]
pub struct IntervalStore<T> {
    entries: BTreeMap<(i64, i64), Vec<T>>,
    len: usize,
    max_span: i64,
}

impl<T> Default for IntervalStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            len: 0,
            max_span: 0,
        }
    }
}

impl<T> IntervalStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts unconditionally; duplicates are allowed.
    pub fn add(&mut self, interval: TimeInterval, payload: T) {
        self.max_span = self.max_span.max(interval.duration());
        self.entries
            .entry((interval.start(), interval.end()))
            .or_default()
            .push(payload);
        self.len += 1;
    }

    /// Every stored entry whose span intersects `range`, inclusive at both
    /// ends, in ascending start order.
    pub fn overlap<'a>(
        &'a self,
        range: &TimeInterval,
    ) -> impl Iterator<Item = (TimeInterval, &'a T)> + 'a {
        let lower = range.start().saturating_sub(self.max_span);
        let query_start = range.start();
        self.entries
            .range((lower, i64::MIN)..=(range.end(), i64::MAX))
            .filter(move |((_, end), _)| *end >= query_start)
            .flat_map(|(&(start, end), payloads)| {
                let interval = TimeInterval::from_ordered(start, end);
                payloads.iter().map(move |payload| (interval, payload))
            })
    }

    pub fn overlaps_any(&self, range: &TimeInterval) -> bool {
        self.overlap(range).next().is_some()
    }

    /// Lazy in-order walk; calling it again restarts from the first entry.
    pub fn iter(&self) -> impl Iterator<Item = (TimeInterval, &T)> + '_ {
        self.entries.iter().flat_map(|(&(start, end), payloads)| {
            let interval = TimeInterval::from_ordered(start, end);
            payloads.iter().map(move |payload| (interval, payload))
        })
    }

    pub fn intervals(&self) -> impl Iterator<Item = TimeInterval> + '_ {
        self.iter().map(|(interval, _)| interval)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
        self.max_span = 0;
    }
}

impl<T: PartialEq> IntervalStore<T> {
    /// Removes one entry equal in bounds and payload. Returns whether one was found.
    pub fn remove(&mut self, interval: &TimeInterval, payload: &T) -> bool {
        let key = (interval.start(), interval.end());
        let Some(payloads) = self.entries.get_mut(&key) else {
            return false;
        };
        let Some(position) = payloads.iter().position(|stored| stored == payload) else {
            return false;
        };

        payloads.remove(position);
        if payloads.is_empty() {
            self.entries.remove(&key);
        }
        self.len -= 1;
        if self.len == 0 {
            self.max_span = 0;
        }
        true
    }

    pub fn contains(&self, interval: &TimeInterval, payload: &T) -> bool {
        self.entries
            .get(&(interval.start(), interval.end()))
            .map_or(false, |payloads| payloads.contains(payload))
    }
}

impl IntervalStore<()> {
    pub fn insert(&mut self, interval: TimeInterval) {
        self.add(interval, ());
    }
}
