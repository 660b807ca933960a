#![forbid(unsafe_code)]

use super::UserRef;
use pm_core::lifecycle::CompletionFields;
use pm_core::model::{Priority, WorkItemKind, WorkItemStatus};
use pm_core::schedule::PlannedWindow;
use time::{Date, OffsetDateTime};

#[derive(Clone, Debug, PartialEq)]
pub struct WorkItemRow {
    pub id: i64,
    pub code: String,
    pub kind: WorkItemKind,
    pub project_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkItemStatus,
    pub priority: Priority,
    pub label_path: Option<String>,
    pub assignee_id: Option<i64>,
    pub creator_id: i64,
    pub start_date: Option<Date>,
    pub planned_start_date: Option<Date>,
    pub planned_end_date: Option<Date>,
    pub completed_at: Option<OffsetDateTime>,
    pub actual_hours: Option<f64>,
    pub estimated_hours: Option<f64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub deleted_at_ms: Option<i64>,
}

impl WorkItemRow {
    pub fn planned_window(&self) -> PlannedWindow {
        PlannedWindow::new(self.planned_start_date, self.planned_end_date)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }

    pub fn completion_fields(&self) -> CompletionFields {
        CompletionFields {
            status: self.status,
            start_date: self.start_date,
            planned: self.planned_window(),
            completed_at: self.completed_at,
            actual_hours: self.actual_hours,
            estimated_hours: self.estimated_hours,
        }
    }

    pub fn set_completion_fields(&mut self, fields: CompletionFields) {
        self.status = fields.status;
        self.start_date = fields.start_date;
        self.planned_start_date = fields.planned.start;
        self.planned_end_date = fields.planned.end;
        self.completed_at = fields.completed_at;
        self.actual_hours = fields.actual_hours;
        self.estimated_hours = fields.estimated_hours;
    }
}

#[derive(Clone, Debug)]
pub struct WorkItemCreateRequest {
    pub project_id: i64,
    pub kind: WorkItemKind,
    pub parent_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: WorkItemStatus,
    pub priority: Priority,
    pub label_path: Option<String>,
    pub assignee: UserRef,
    pub start_date: Option<Date>,
    pub planned_start_date: Option<Date>,
    pub planned_end_date: Option<Date>,
}

/// Partial update; `Some(None)` clears a nullable field.
#[derive(Clone, Debug, Default)]
pub struct WorkItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<WorkItemStatus>,
    pub priority: Option<Priority>,
    pub label_path: Option<Option<String>>,
    /// `Some(None)` unassigns unless a lookup is also given; an unresolved lookup changes nothing.
    pub assignee_id: Option<Option<i64>>,
    pub assignee_lookup: Option<String>,
    pub creator_id: Option<i64>,
    pub creator_lookup: Option<String>,
    pub start_date: Option<Option<Date>>,
    pub planned_start_date: Option<Option<Date>>,
    pub planned_end_date: Option<Option<Date>>,
    /// Only honoured when the update enters `done`.
    pub completed_at: Option<OffsetDateTime>,
}

impl WorkItemPatch {
    pub fn touches_planned_window(&self) -> bool {
        self.planned_start_date.is_some() || self.planned_end_date.is_some()
    }
}

/// A parent JOB whose status followed its TASK children.
#[derive(Clone, Debug)]
pub struct StatusSync {
    pub previous_status: WorkItemStatus,
    pub parent: WorkItemRow,
}

#[derive(Clone, Debug)]
pub struct WorkItemUpdateOutcome {
    pub before: WorkItemRow,
    pub after: WorkItemRow,
    pub synced_parent: Option<StatusSync>,
}

#[derive(Clone, Debug)]
pub struct CascadeStatusRequest {
    pub job_id: i64,
    pub status: WorkItemStatus,
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Clone, Debug)]
pub struct CascadedItem {
    pub previous_status: WorkItemStatus,
    pub item: WorkItemRow,
}

/// A live JOB with its live TASK children, both in id order.
#[derive(Clone, Debug)]
pub struct WorkItemTreeNode {
    pub job: WorkItemRow,
    pub subtasks: Vec<WorkItemRow>,
}
