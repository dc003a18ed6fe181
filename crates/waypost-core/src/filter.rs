//! Day plus time-of-day window filtering.
//!
//! A record matches a [`TimeWindow`] when its local calendar day equals the
//! window's date and its local minute of the day falls inside `[start, end]`.
//! When `start > end` the minute range wraps past midnight, but the day test
//! still pins matches to the selected date: the early segment of an
//! overnight window only matches records dated on the selected day itself,
//! never on the following one.

use waypost_types::{LocationRecord, TimeOfDay, TimeWindow};

use crate::zone::DisplayZone;

/// Whether `minute` (minutes since midnight) falls inside `[start, end]`.
///
/// Both bounds are inclusive. A window with `start > end` spans midnight
/// and matches `minute >= start` or `minute <= end`.
pub fn minute_in_window(minute: u16, start: TimeOfDay, end: TimeOfDay) -> bool {
    let (start, end) = (start.minutes(), end.minutes());
    if start <= end {
        (start..=end).contains(&minute)
    } else {
        minute >= start || minute <= end
    }
}

/// Pure history filter, reading each timestamp in a [`DisplayZone`].
///
/// The zone's offset is resolved per record, at that record's instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowFilter {
    zone: DisplayZone,
}

impl WindowFilter {
    /// A filter reading timestamps in `zone`, or at a fixed offset.
    pub fn new(zone: impl Into<DisplayZone>) -> Self {
        Self { zone: zone.into() }
    }

    /// A filter at UTC.
    pub fn utc() -> Self {
        Self::new(DisplayZone::UTC)
    }

    /// A filter in the system time zone.
    pub fn local() -> Self {
        Self::new(DisplayZone::Local)
    }

    pub fn zone(&self) -> DisplayZone {
        self.zone
    }

    /// Whether a single record falls inside `window`.
    pub fn matches(&self, record: &LocationRecord, window: &TimeWindow) -> bool {
        let offset = self.zone.offset_at(record.timestamp);
        record.local_date(offset) == window.date
            && minute_in_window(record.local_minute_of_day(offset), window.start, window.end)
    }

    /// The records of `history` inside `window`, in input order.
    pub fn apply(&self, history: &[LocationRecord], window: &TimeWindow) -> Vec<LocationRecord> {
        history
            .iter()
            .filter(|r| self.matches(r, window))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;
    use time::OffsetDateTime;
    use time::macros::{date, datetime, offset};
    use waypost_types::{OperatorId, RecordId};

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn record(id: &str, ts: OffsetDateTime) -> LocationRecord {
        LocationRecord {
            id: RecordId::new(id),
            timestamp: ts,
            latitude: 10.0,
            longitude: 20.0,
            accuracy: None,
            altitude: None,
            tracker_id: OperatorId::new("op"),
        }
    }

    fn ids(records: &[LocationRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_same_day_window() {
        let history = vec![
            record("evening", datetime!(2024-06-01 20:30 UTC)),
            record("morning", datetime!(2024-06-01 08:00 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-06-01), tod("19:00"), tod("21:00"));
        let out = WindowFilter::utc().apply(&history, &window);
        assert_eq!(ids(&out), ["evening"]);
    }

    #[test]
    fn test_overnight_window_pins_selected_date() {
        let history = vec![
            record("late", datetime!(2024-06-01 23:00 UTC)),
            record("next_day", datetime!(2024-06-02 01:00 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-06-01), tod("22:00"), tod("02:00"));
        let out = WindowFilter::utc().apply(&history, &window);
        assert_eq!(ids(&out), ["late"]);
    }

    #[test]
    fn test_overnight_early_segment_on_selected_date() {
        let history = vec![
            record("early", datetime!(2024-06-01 01:30 UTC)),
            record("noon", datetime!(2024-06-01 12:00 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-06-01), tod("22:00"), tod("02:00"));
        let out = WindowFilter::utc().apply(&history, &window);
        assert_eq!(ids(&out), ["early"]);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let history = vec![
            record("before", datetime!(2024-06-01 18:59:59 UTC)),
            record("start", datetime!(2024-06-01 19:00 UTC)),
            record("end", datetime!(2024-06-01 21:00:45 UTC)),
            record("after", datetime!(2024-06-01 21:01 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-06-01), tod("19:00"), tod("21:00"));
        let out = WindowFilter::utc().apply(&history, &window);
        assert_eq!(ids(&out), ["start", "end"]);
    }

    #[test]
    fn test_single_minute_window() {
        assert!(minute_in_window(600, tod("10:00"), tod("10:00")));
        assert!(!minute_in_window(601, tod("10:00"), tod("10:00")));
    }

    #[test]
    fn test_minute_in_window_wraps() {
        let (start, end) = (tod("22:00"), tod("02:00"));
        assert!(minute_in_window(22 * 60, start, end));
        assert!(minute_in_window(23 * 60 + 59, start, end));
        assert!(minute_in_window(0, start, end));
        assert!(minute_in_window(2 * 60, start, end));
        assert!(!minute_in_window(2 * 60 + 1, start, end));
        assert!(!minute_in_window(12 * 60, start, end));
    }

    #[test]
    fn test_offset_shifts_day_and_minute() {
        // 2024-06-02 01:30 UTC is 2024-06-01 20:30 at -05:00.
        let history = vec![record("r", datetime!(2024-06-02 01:30 UTC))];
        let window = TimeWindow::new(date!(2024-06-01), tod("19:00"), tod("21:00"));

        assert!(WindowFilter::utc().apply(&history, &window).is_empty());
        let out = WindowFilter::new(offset!(-5)).apply(&history, &window);
        assert_eq!(ids(&out), ["r"]);
    }

    #[test]
    fn test_winter_record_uses_winter_offset() {
        // 2024-01-16 04:30 UTC is 2024-01-15 20:30 PST.
        let history = vec![
            record("winter", datetime!(2024-01-16 04:30 UTC)),
            record("summer", datetime!(2024-06-16 03:30 UTC)),
        ];
        let filter = WindowFilter::new(Los_Angeles);

        let january = TimeWindow::new(date!(2024-01-15), tod("19:00"), tod("21:00"));
        assert_eq!(ids(&filter.apply(&history, &january)), ["winter"]);

        // The June record is 20:30 PDT on 2024-06-15.
        let june = TimeWindow::new(date!(2024-06-15), tod("20:30"), tod("20:30"));
        assert_eq!(ids(&filter.apply(&history, &june)), ["summer"]);
    }

    #[test]
    fn test_window_across_spring_forward() {
        // Clocks in Los Angeles jump from 02:00 to 03:00 on 2024-03-10.
        let history = vec![
            record("before", datetime!(2024-03-10 09:45 UTC)),
            record("after", datetime!(2024-03-10 10:15 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-03-10), tod("01:30"), tod("03:30"));
        let out = WindowFilter::new(Los_Angeles).apply(&history, &window);
        assert_eq!(ids(&out), ["before", "after"]);

        let early = TimeWindow::new(date!(2024-03-10), tod("01:45"), tod("01:45"));
        let out = WindowFilter::new(Los_Angeles).apply(&history, &early);
        assert_eq!(ids(&out), ["before"]);
    }

    #[test]
    fn test_repeated_hour_matches_both_records() {
        let history = vec![
            record("pdt", datetime!(2024-11-03 08:30 UTC)),
            record("pst", datetime!(2024-11-03 09:30 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-11-03), tod("01:00"), tod("01:59"));
        let out = WindowFilter::new(Los_Angeles).apply(&history, &window);
        assert_eq!(ids(&out), ["pdt", "pst"]);
    }

    #[test]
    fn test_no_matches_is_empty() {
        let history = vec![record("r", datetime!(2024-06-01 12:00 UTC))];
        let window = TimeWindow::new(date!(2024-07-04), tod("00:00"), tod("23:59"));
        assert!(WindowFilter::utc().apply(&history, &window).is_empty());
        assert!(WindowFilter::utc().apply(&[], &window).is_empty());
    }

    #[test]
    fn test_output_keeps_input_order() {
        let history = vec![
            record("a", datetime!(2024-06-01 19:10 UTC)),
            record("b", datetime!(2024-06-01 19:20 UTC)),
            record("c", datetime!(2024-06-01 22:00 UTC)),
            record("d", datetime!(2024-06-01 20:00 UTC)),
        ];
        let window = TimeWindow::new(date!(2024-06-01), tod("19:00"), tod("21:00"));
        let out = WindowFilter::utc().apply(&history, &window);
        assert_eq!(ids(&out), ["a", "b", "d"]);
    }
}
