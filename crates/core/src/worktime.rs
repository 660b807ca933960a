#![forbid(unsafe_code)]

use crate::dates::local_date;
use std::collections::BTreeSet;
use time::{Date, Duration, OffsetDateTime, Weekday};

pub const HOURS_PER_WORKDAY: f64 = 8.0;

/// Weekday-based workday calendar with explicit overrides.
///
/// Holidays win over make-up workdays, and both win over the Monday–Friday rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkCalendar {
    holidays: BTreeSet<Date>,
    workdays: BTreeSet<Date>,
}

impl WorkCalendar {
    pub fn new(
        holidays: impl IntoIterator<Item = Date>,
        workdays: impl IntoIterator<Item = Date>,
    ) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
            workdays: workdays.into_iter().collect(),
        }
    }

    pub fn is_workday(&self, date: Date) -> bool {
        if self.holidays.contains(&date) {
            return false;
        }
        if self.workdays.contains(&date) {
            return true;
        }
        !matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
    }

    /// Inclusive count; zero when either bound is missing or the range is inverted.
    pub fn count_workdays(&self, start: Option<Date>, end: Option<Date>) -> u32 {
        let (Some(start), Some(end)) = (start, end) else {
            return 0;
        };
        if end < start {
            return 0;
        }
        let mut days = 0u32;
        let mut current = start;
        loop {
            if self.is_workday(current) {
                days += 1;
            }
            if current >= end {
                break;
            }
            current = match current.checked_add(Duration::DAY) {
                Some(next) => next,
                None => break,
            };
        }
        days
    }

    pub fn estimated_hours(&self, start: Option<Date>, end: Option<Date>) -> f64 {
        f64::from(self.count_workdays(start, end)) * HOURS_PER_WORKDAY
    }

    pub fn actual_hours(&self, start: Option<Date>, completed_at: Option<OffsetDateTime>) -> f64 {
        let Some(completed_at) = completed_at else {
            return 0.0;
        };
        f64::from(self.count_workdays(start, Some(local_date(completed_at)))) * HOURS_PER_WORKDAY
    }

    /// Estimate as stored on a work item: a zero estimate is recorded as unset.
    pub fn estimate_or_none(&self, start: Option<Date>, end: Option<Date>) -> Option<f64> {
        let hours = self.estimated_hours(start, end);
        if hours > 0.0 { Some(hours) } else { None }
    }
}
