use std::iter::{FusedIterator, Peekable};

use crate::models::interval::TimeInterval;

/// Smallest gap left between a free interval and the occupied span after it.
pub const MIN_SPACING_UNIT_MILLIS: i64 = 1_000;

/// Merges consecutive intervals of a start-ordered sequence whenever the next
/// one does not start strictly after the current span ends.
pub struct Merged<I: Iterator<Item = TimeInterval>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = TimeInterval>> Iterator for Merged<I> {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        let mut current = self.inner.next()?;
        while let Some(next) = self.inner.peek() {
            if current.is_before(next) {
                break;
            }
            current = current.span(next);
            self.inner.next();
        }
        Some(current)
    }
}

impl<I: Iterator<Item = TimeInterval>> FusedIterator for Merged<I> {}

pub fn merge_overlapping<I>(intervals: I) -> Merged<I::IntoIter>
where
    I: IntoIterator<Item = TimeInterval>,
{
    Merged {
        inner: intervals.into_iter().peekable(),
    }
}

/// Lazy complement of the occupied intervals within a calendar window.
///
/// Single pass and not restartable. The occupied sequence is usually borrowed
/// from a store, which keeps that store immutable for as long as this
/// iterator is alive.
pub struct FreeTime<I: Iterator<Item = TimeInterval>> {
    occupied: Merged<I>,
    free_from: i64,
    horizon: i64,
    spacing: i64,
    finished: bool,
}

impl<I: Iterator<Item = TimeInterval>> FreeTime<I> {
    /// `occupied` must be ordered by start.
    pub fn new<O>(occupied: O, window: TimeInterval, spacing: i64) -> Self
    where
        O: IntoIterator<Item = TimeInterval, IntoIter = I>,
    {
        Self {
            occupied: merge_overlapping(occupied),
            free_from: window.start().saturating_add(spacing),
            horizon: window.end(),
            spacing,
            finished: false,
        }
    }
}

impl<I: Iterator<Item = TimeInterval>> Iterator for FreeTime<I> {
    type Item = TimeInterval;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.occupied.next() {
                Some(span) => {
                    let from = self.free_from;
                    let gap_end = span.start().saturating_sub(MIN_SPACING_UNIT_MILLIS);
                    self.free_from = from.max(span.end().saturating_add(self.spacing));
                    if gap_end > from {
                        return Some(TimeInterval::from_ordered(from, gap_end));
                    }
                }
                None => {
                    self.finished = true;
                    if self.free_from < self.horizon {
                        return Some(TimeInterval::from_ordered(self.free_from, self.horizon));
                    }
                }
            }
        }
        None
    }
}

impl<I: Iterator<Item = TimeInterval>> FusedIterator for FreeTime<I> {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn interval(start: i64, end: i64) -> TimeInterval {
        TimeInterval::new(start, end).expect("valid interval")
    }

    #[test]
    fn merges_touching_and_nested_spans() {
        let merged: Vec<TimeInterval> = merge_overlapping(vec![
            interval(0, 10),
            interval(10, 15),
            interval(12, 13),
            interval(16, 20),
        ])
        .collect();
        assert_eq!(merged, vec![interval(0, 15), interval(16, 20)]);
    }

    #[test]
    fn empty_calendar_is_one_free_interval() {
        let free: Vec<TimeInterval> =
            FreeTime::new(Vec::new(), interval(0, 100_000), 5_000).collect();
        assert_eq!(free, vec![interval(5_000, 100_000)]);
    }

    #[test]
    fn gaps_respect_spacing_on_both_sides() {
        let occupied = vec![interval(20_000, 30_000), interval(25_000, 40_000)];
        let free: Vec<TimeInterval> =
            FreeTime::new(occupied, interval(0, 100_000), 5_000).collect();
        assert_eq!(
            free,
            vec![interval(5_000, 19_000), interval(45_000, 100_000)]
        );
    }

    #[test]
    fn occupied_span_at_the_window_start_still_advances_the_cursor() {
        let occupied = vec![interval(0, 10_000), interval(30_000, 31_000)];
        let free: Vec<TimeInterval> =
            FreeTime::new(occupied, interval(0, 50_000), 2_000).collect();
        assert_eq!(
            free,
            vec![interval(12_000, 29_000), interval(33_000, 50_000)]
        );
    }

    #[test]
    fn spans_closer_than_spacing_leave_no_gap() {
        let occupied = vec![interval(10_000, 20_000), interval(23_000, 30_000)];
        let free: Vec<TimeInterval> =
            FreeTime::new(occupied, interval(0, 50_000), 5_000).collect();
        assert_eq!(
            free,
            vec![interval(5_000, 9_000), interval(35_000, 50_000)]
        );
    }

    #[test]
    fn span_reaching_the_end_of_time_does_not_overflow() {
        let occupied = vec![interval(50_000, i64::MAX)];
        let free: Vec<TimeInterval> =
            FreeTime::new(occupied, interval(0, 100_000), 5_000).collect();
        assert_eq!(free, vec![interval(5_000, 49_000)]);
    }

    proptest! {
        #[test]
        fn every_instant_outside_occupied_reach_is_free(
            raw in proptest::collection::vec((0i64..1_000_000, 0i64..50_000), 0..40),
            spacing in 1_000i64..20_000,
        ) {
            let mut occupied: Vec<TimeInterval> = raw
                .iter()
                .map(|(start, len)| TimeInterval::new(*start, start + len).expect("ordered"))
                .collect();
            occupied.sort();
            let window = TimeInterval::new(0, 1_100_000).expect("ordered");

            let free: Vec<TimeInterval> = FreeTime::new(occupied.clone(), window, spacing).collect();

            // An occupied span keeps `[start - unit, end + spacing)` out of free time.
            let reserved = |at: i64| {
                occupied.iter().any(|busy| {
                    busy.start() - MIN_SPACING_UNIT_MILLIS <= at && at < busy.end() + spacing
                })
            };
            let strictly_inside = |at: i64| {
                occupied.iter().any(|busy| {
                    busy.start() - MIN_SPACING_UNIT_MILLIS < at && at < busy.end() + spacing
                })
            };

            let mut at = window.start() + spacing;
            while at < window.end() {
                let is_free = free.iter().any(|gap| gap.contains_instant(at));
                if !reserved(at) {
                    prop_assert!(is_free, "instant {} missing from free time", at);
                }
                if is_free {
                    prop_assert!(!strictly_inside(at), "instant {} is free but reserved", at);
                }
                at += 997;
            }
        }

        #[test]
        fn free_intervals_never_touch_occupied_time(
            raw in proptest::collection::vec((0i64..1_000_000, 0i64..50_000), 0..40),
            spacing in 1_000i64..20_000,
        ) {
            let mut occupied: Vec<TimeInterval> = raw
                .iter()
                .map(|(start, len)| TimeInterval::new(*start, start + len).expect("ordered"))
                .collect();
            occupied.sort();
            let window = TimeInterval::new(0, 1_100_000).expect("ordered");

            let free: Vec<TimeInterval> = FreeTime::new(occupied.clone(), window, spacing).collect();

            for pair in free.windows(2) {
                prop_assert!(pair[0].end() < pair[1].start());
            }
            for gap in &free {
                prop_assert!(gap.start() >= window.start() + spacing);
                prop_assert!(gap.end() <= window.end());
                for busy in &occupied {
                    prop_assert!(!gap.overlaps(busy));
                    if busy.end() < gap.start() {
                        prop_assert!(gap.start() - busy.end() >= spacing);
                    }
                }
            }
        }
    }
}
