#![forbid(unsafe_code)]

use crate::dates::format_date;
use thiserror::Error;
use time::Date;

/// Scheduled execution range of a work item; either bound may be open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlannedWindow {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ScheduleViolation {
    #[error("planned end date {end} is earlier than planned start date {start}")]
    EndBeforeStart { start: String, end: String },
    #[error(
        "child window must lie within parent window: child [{child_start}, {child_end}] is outside parent [{parent_start}, {parent_end}]"
    )]
    OutsideParent {
        child_start: String,
        child_end: String,
        parent_start: String,
        parent_end: String,
    },
    #[error(
        "parent window must cover all child windows: parent [{parent_start}, {parent_end}] does not cover children [{children_start}, {children_end}]"
    )]
    DoesNotCoverChildren {
        parent_start: String,
        parent_end: String,
        children_start: String,
        children_end: String,
    },
}

impl PlannedWindow {
    pub fn new(start: Option<Date>, end: Option<Date>) -> Self {
        Self { start, end }
    }

    pub fn bounds(&self) -> Option<(Date, Date)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn validate_order(&self) -> Result<(), ScheduleViolation> {
        if let Some((start, end)) = self.bounds()
            && end < start
        {
            return Err(ScheduleViolation::EndBeforeStart {
                start: format_date(start),
                end: format_date(end),
            });
        }
        Ok(())
    }

    /// Containment is only enforced when both windows are fully specified.
    pub fn check_within(&self, parent: &PlannedWindow) -> Result<(), ScheduleViolation> {
        let (Some((child_start, child_end)), Some((parent_start, parent_end))) =
            (self.bounds(), parent.bounds())
        else {
            return Ok(());
        };
        if child_start < parent_start || child_end > parent_end {
            return Err(ScheduleViolation::OutsideParent {
                child_start: format_date(child_start),
                child_end: format_date(child_end),
                parent_start: format_date(parent_start),
                parent_end: format_date(parent_end),
            });
        }
        Ok(())
    }

    pub fn check_covers(&self, children: &ChildrenSpan) -> Result<(), ScheduleViolation> {
        let Some((start, end)) = self.bounds() else {
            return Ok(());
        };
        if start > children.start || end < children.end {
            return Err(ScheduleViolation::DoesNotCoverChildren {
                parent_start: format_date(start),
                parent_end: format_date(end),
                children_start: format_date(children.start),
                children_end: format_date(children.end),
            });
        }
        Ok(())
    }
}

/// Union of child windows: earliest planned start and latest planned end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildrenSpan {
    pub start: Date,
    pub end: Date,
}

impl ChildrenSpan {
    /// Starts and ends are collected independently; `None` unless both sides have at least one date.
    pub fn of<'a>(children: impl IntoIterator<Item = &'a PlannedWindow>) -> Option<Self> {
        let mut start: Option<Date> = None;
        let mut end: Option<Date> = None;
        for child in children {
            if let Some(s) = child.start {
                start = Some(start.map_or(s, |cur| cur.min(s)));
            }
            if let Some(e) = child.end {
                end = Some(end.map_or(e, |cur| cur.max(e)));
            }
        }
        Some(Self {
            start: start?,
            end: end?,
        })
    }
}
