#![forbid(unsafe_code)]

//! Status changes and their completion side effects.
//!
//! Direct updates, sibling sync and cascades all funnel through [`apply_status`], so the
//! done/undone bookkeeping cannot drift between the three paths. Any status may follow any
//! other; a stricter transition graph would live here.

use crate::model::WorkItemStatus;
use crate::schedule::PlannedWindow;
use crate::worktime::WorkCalendar;
use time::{Date, OffsetDateTime};

/// The slice of a work item that a status change reads and writes.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionFields {
    pub status: WorkItemStatus,
    pub start_date: Option<Date>,
    pub planned: PlannedWindow,
    pub completed_at: Option<OffsetDateTime>,
    pub actual_hours: Option<f64>,
    pub estimated_hours: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    pub calendar: &'a WorkCalendar,
    pub now: OffsetDateTime,
    /// Caller-supplied completion time; wins over `now` when entering `done`.
    pub completed_at: Option<OffsetDateTime>,
}

/// Leaving `done` for active work clears the completion record.
pub fn reopens(from: WorkItemStatus, to: WorkItemStatus) -> bool {
    from == WorkItemStatus::Done && matches!(to, WorkItemStatus::Todo | WorkItemStatus::Doing)
}

pub fn apply_status(fields: &mut CompletionFields, target: WorkItemStatus, ctx: &TransitionContext<'_>) {
    let from = fields.status;
    if target == WorkItemStatus::Done {
        let kept = if from == WorkItemStatus::Done {
            fields.completed_at
        } else {
            None
        };
        let completed_at = ctx.completed_at.or(kept).unwrap_or(ctx.now);
        fields.completed_at = Some(completed_at);
        let actual_start = fields.start_date.or(fields.planned.start);
        fields.actual_hours = Some(ctx.calendar.actual_hours(actual_start, Some(completed_at)));
        if fields.estimated_hours.is_none() {
            fields.estimated_hours = ctx
                .calendar
                .estimate_or_none(fields.planned.start, fields.planned.end);
        }
    } else if reopens(from, target) {
        fields.completed_at = None;
        fields.actual_hours = None;
    }
    fields.status = target;
}
