#![forbid(unsafe_code)]

use super::UserRef;
use pm_core::model::{Priority, ProjectStatus};
use time::Date;

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: i64,
    pub owner_id: i64,
    pub priority: Priority,
    pub status: ProjectStatus,
    pub archived: bool,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub label_path: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub deleted_at_ms: Option<i64>,
}

impl ProjectRow {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ProjectCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub label_path: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<Option<Date>>,
    pub end_date: Option<Option<Date>>,
    pub label_path: Option<Option<String>>,
    pub creator: Option<UserRef>,
    pub owner: Option<UserRef>,
}

impl ProjectPatch {
    /// True when the patch touches nothing but ownership.
    pub fn is_owner_transfer_only(&self) -> bool {
        self.owner.is_some()
            && self.name.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.label_path.is_none()
            && self.creator.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProjectListRequest {
    pub status: Option<ProjectStatus>,
    pub archived: Option<bool>,
    pub search: Option<String>,
    pub include_deleted: bool,
    pub page: u32,
    pub size: u32,
}

#[derive(Clone, Debug)]
pub struct ProjectPage {
    pub items: Vec<ProjectRow>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectStatistics {
    pub project_id: i64,
    pub jobs: i64,
    pub tasks: i64,
    pub todo: i64,
    pub doing: i64,
    pub blocked: i64,
    pub done: i64,
    pub cancelled: i64,
}

/// Before/after images of a project update, for field-level audit.
#[derive(Clone, Debug)]
pub struct ProjectUpdateOutcome {
    pub before: ProjectRow,
    pub after: ProjectRow,
}
