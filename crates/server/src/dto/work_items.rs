#![forbid(unsafe_code)]

use super::{
    UserDirectory, date_field, iso_date, iso_timestamp, nullable, nullable_date_field,
    timestamp_field, user_ref,
};
use crate::error::ApiError;
use pm_core::dates::ms_to_rfc3339;
use pm_core::model::{Priority, WorkItemKind, WorkItemStatus};
use pm_storage::{
    CascadeStatusRequest, UserRef, WorkItemCreateRequest, WorkItemPatch, WorkItemRow,
    WorkItemTreeNode,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct WorkItemCreateBody {
    #[serde(alias = "type")]
    pub kind: String,
    pub project_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub label_path: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub assignee_prefix: Option<String>,
    #[serde(default)]
    pub assignee_email: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub planned_start_date: Option<String>,
    #[serde(default)]
    pub planned_end_date: Option<String>,
}

impl WorkItemCreateBody {
    pub(crate) fn into_request(self) -> Result<WorkItemCreateRequest, ApiError> {
        let kind = WorkItemKind::parse(self.kind.trim().to_ascii_uppercase().as_str())?;
        let status = match self.status.as_deref() {
            Some(status) => WorkItemStatus::parse(status)?,
            None => WorkItemStatus::Todo,
        };
        let priority = match self.priority.as_deref() {
            Some(priority) => Priority::parse(priority)?,
            None => Priority::default(),
        };
        Ok(WorkItemCreateRequest {
            project_id: self.project_id,
            kind,
            parent_id: self.parent_id,
            title: self.title,
            description: self.description,
            status,
            priority,
            label_path: self.label_path,
            assignee: user_ref(self.assignee_id, self.assignee_prefix, self.assignee_email)
                .unwrap_or_default(),
            start_date: date_field("start_date", self.start_date.as_deref())?,
            planned_start_date: date_field("planned_start_date", self.planned_start_date.as_deref())?,
            planned_end_date: date_field("planned_end_date", self.planned_end_date.as_deref())?,
        })
    }
}

/// Fields of a PATCH body. Derived fields (`estimated_hours`, `actual_hours`) are not accepted.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorkItemUpdateBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub label_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<i64>>,
    #[serde(default)]
    pub assignee_prefix: Option<String>,
    #[serde(default)]
    pub assignee_email: Option<String>,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub creator_prefix: Option<String>,
    #[serde(default)]
    pub creator_email: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub planned_start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub planned_end_date: Option<Option<String>>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl WorkItemUpdateBody {
    pub(crate) fn into_patch(self) -> Result<WorkItemPatch, ApiError> {
        let assignee_lookup = user_ref(None, self.assignee_prefix, self.assignee_email)
            .and_then(|r: UserRef| r.lookup);
        let creator_lookup = user_ref(None, self.creator_prefix, self.creator_email)
            .and_then(|r: UserRef| r.lookup);
        Ok(WorkItemPatch {
            title: self.title,
            description: self.description,
            status: self.status.as_deref().map(WorkItemStatus::parse).transpose()?,
            priority: self.priority.as_deref().map(Priority::parse).transpose()?,
            label_path: self.label_path,
            assignee_id: self.assignee_id,
            assignee_lookup,
            creator_id: self.creator_id,
            creator_lookup,
            start_date: nullable_date_field("start_date", self.start_date)?,
            planned_start_date: nullable_date_field("planned_start_date", self.planned_start_date)?,
            planned_end_date: nullable_date_field("planned_end_date", self.planned_end_date)?,
            completed_at: timestamp_field("completed_at", self.completed_at.as_deref())?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchUpdateItem {
    pub id: i64,
    #[serde(flatten)]
    pub fields: WorkItemUpdateBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BatchUpdateBody {
    pub items: Vec<BatchUpdateItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CascadeStatusBody {
    pub status: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl CascadeStatusBody {
    pub(crate) fn into_request(self, job_id: i64) -> Result<CascadeStatusRequest, ApiError> {
        Ok(CascadeStatusRequest {
            job_id,
            status: WorkItemStatus::parse(self.status.trim())?,
            completed_at: timestamp_field("completed_at", self.completed_at.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TreeQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NameExistsQuery {
    pub project_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

impl NameExistsQuery {
    pub(crate) fn kind(&self) -> Result<WorkItemKind, ApiError> {
        Ok(WorkItemKind::parse(
            self.kind.trim().to_ascii_uppercase().as_str(),
        )?)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct NameExistsView {
    pub exists: bool,
    pub conflict_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WorkItemView {
    pub id: i64,
    pub code: String,
    pub kind: &'static str,
    pub project_id: i64,
    pub parent_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub status: &'static str,
    pub priority: &'static str,
    pub label_path: Option<String>,
    pub assignee_id: Option<i64>,
    pub assignee_username: Option<String>,
    pub assignee_prefix: Option<String>,
    pub creator_id: i64,
    pub creator_username: Option<String>,
    pub creator_prefix: Option<String>,
    pub start_date: Option<String>,
    pub planned_start_date: Option<String>,
    pub planned_end_date: Option<String>,
    pub completed_at: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl WorkItemView {
    pub(crate) fn new(row: &WorkItemRow, users: &UserDirectory) -> Self {
        Self {
            id: row.id,
            code: row.code.clone(),
            kind: row.kind.as_str(),
            project_id: row.project_id,
            parent_id: row.parent_id,
            title: row.title.clone(),
            description: row.description.clone(),
            status: row.status.as_str(),
            priority: row.priority.as_str(),
            label_path: row.label_path.clone(),
            assignee_id: row.assignee_id,
            assignee_username: users.username(row.assignee_id),
            assignee_prefix: users.email_prefix(row.assignee_id),
            creator_id: row.creator_id,
            creator_username: users.username(Some(row.creator_id)),
            creator_prefix: users.email_prefix(Some(row.creator_id)),
            start_date: iso_date(row.start_date),
            planned_start_date: iso_date(row.planned_start_date),
            planned_end_date: iso_date(row.planned_end_date),
            completed_at: iso_timestamp(row.completed_at),
            estimated_hours: row.estimated_hours,
            actual_hours: row.actual_hours,
            created_at: ms_to_rfc3339(row.created_at_ms),
            updated_at: ms_to_rfc3339(row.updated_at_ms),
            deleted_at: row.deleted_at_ms.map(ms_to_rfc3339),
        }
    }
}

/// A JOB with its TASKs nested under `subtasks`.
#[derive(Debug, Serialize)]
pub(crate) struct WorkItemNodeView {
    #[serde(flatten)]
    pub job: WorkItemView,
    pub subtasks: Vec<WorkItemView>,
}

impl WorkItemNodeView {
    pub(crate) fn new(node: &WorkItemTreeNode, users: &UserDirectory) -> Self {
        Self {
            job: WorkItemView::new(&node.job, users),
            subtasks: node
                .subtasks
                .iter()
                .map(|task| WorkItemView::new(task, users))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemsView<T> {
    pub items: Vec<T>,
}

/// Every user id a work item response mentions.
pub(crate) fn work_item_user_ids<'a>(rows: impl IntoIterator<Item = &'a WorkItemRow>) -> Vec<i64> {
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.creator_id);
        ids.extend(row.assignee_id);
    }
    ids
}
