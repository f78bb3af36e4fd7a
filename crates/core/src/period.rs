use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ReconcileError;

/// Inclusive span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    /// Builds a range from bounds already known to be ordered. Use
    /// [`DateRange::try_new`] for anything that came from a caller.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start <= end, "inverted range {start} > {end}");
        DateRange { start, end }
    }

    pub fn try_new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReconcileError> {
        if start > end {
            return Err(ReconcileError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Converts epoch-millisecond bounds to the UTC calendar days they fall on.
    pub fn from_epoch_millis(start_ms: i64, end_ms: i64) -> Result<Self, ReconcileError> {
        let start = day_of_millis(start_ms)?;
        let end = day_of_millis(end_ms)?;
        Self::try_new(start, end)
    }

    pub fn start_millis(self) -> i64 {
        millis_of_day(self.start)
    }

    pub fn end_millis(self) -> i64 {
        millis_of_day(self.end)
    }

    /// Whole days between the bounds; a single-day range spans zero days.
    pub fn days(self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn covers(self, other: DateRange) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Intersection with `bounds`, or `None` when the two are disjoint.
    pub fn clamp_to(self, bounds: DateRange) -> Option<DateRange> {
        let start = self.start.max(bounds.start);
        let end = self.end.min(bounds.end);
        (start <= end).then_some(DateRange { start, end })
    }

    /// True when merging the two ranges leaves no uncovered day between them.
    pub fn overlaps_or_touches(self, other: DateRange) -> bool {
        shift_days(self.end, 1) >= other.start && shift_days(other.end, 1) >= self.start
    }

    pub fn union(self, other: DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Moves `date` by `days`, saturating at the calendar limits chrono supports.
pub fn shift_days(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(Duration::days(days))
        .unwrap_or(if days < 0 { NaiveDate::MIN } else { NaiveDate::MAX })
}

fn day_of_millis(ms: i64) -> Result<NaiveDate, ReconcileError> {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| ReconcileError::Validation(format!("timestamp {ms} is out of range")))
}

fn millis_of_day(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}
