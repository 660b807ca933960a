#![forbid(unsafe_code)]

use super::{UserDirectory, date_field, iso_date, nullable, nullable_date_field, user_ref};
use crate::error::ApiError;
use pm_core::dates::ms_to_rfc3339;
use pm_core::model::{Priority, ProjectStatus};
use pm_storage::{
    ProjectCreateRequest, ProjectListRequest, ProjectPage, ProjectPatch, ProjectRow,
    ProjectStatistics,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectCreateBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub label_path: Option<String>,
}

impl ProjectCreateBody {
    pub(crate) fn into_request(self) -> Result<ProjectCreateRequest, ApiError> {
        Ok(ProjectCreateRequest {
            name: self.name,
            description: self.description,
            priority: match self.priority.as_deref() {
                Some(priority) => Priority::parse(priority)?,
                None => Priority::default(),
            },
            start_date: date_field("start_date", self.start_date.as_deref())?,
            end_date: date_field("end_date", self.end_date.as_deref())?,
            label_path: self.label_path,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectUpdateBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub start_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub label_path: Option<Option<String>>,
    #[serde(default)]
    pub creator_id: Option<i64>,
    #[serde(default)]
    pub creator_prefix: Option<String>,
    #[serde(default)]
    pub creator_email: Option<String>,
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub owner_prefix: Option<String>,
    #[serde(default)]
    pub owner_email: Option<String>,
}

impl ProjectUpdateBody {
    pub(crate) fn into_patch(self) -> Result<ProjectPatch, ApiError> {
        Ok(ProjectPatch {
            name: self.name,
            description: self.description,
            priority: self.priority.as_deref().map(Priority::parse).transpose()?,
            status: self.status.as_deref().map(ProjectStatus::parse).transpose()?,
            start_date: nullable_date_field("start_date", self.start_date)?,
            end_date: nullable_date_field("end_date", self.end_date)?,
            label_path: self.label_path,
            creator: user_ref(self.creator_id, self.creator_prefix, self.creator_email),
            owner: user_ref(self.owner_id, self.owner_prefix, self.owner_email),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProjectListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub archived: Option<bool>,
    #[serde(default)]
    pub include_deleted: bool,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
}

impl ProjectListQuery {
    pub(crate) fn into_request(self) -> Result<ProjectListRequest, ApiError> {
        Ok(ProjectListRequest {
            status: self.status.as_deref().map(ProjectStatus::parse).transpose()?,
            archived: self.archived,
            search: self.search,
            include_deleted: self.include_deleted,
            page: self.page.unwrap_or(1),
            size: self.size.unwrap_or(0),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IncludeDeletedQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectView {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: &'static str,
    pub status: &'static str,
    pub archived: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub label_path: Option<String>,
    pub creator_id: i64,
    pub creator_username: Option<String>,
    pub creator_prefix: Option<String>,
    pub owner_id: i64,
    pub owner_username: Option<String>,
    pub owner_prefix: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

impl ProjectView {
    pub(crate) fn new(row: &ProjectRow, users: &UserDirectory) -> Self {
        Self {
            id: row.id,
            code: row.code.clone(),
            name: row.name.clone(),
            description: row.description.clone(),
            priority: row.priority.as_str(),
            status: row.status.as_str(),
            archived: row.archived,
            start_date: iso_date(row.start_date),
            end_date: iso_date(row.end_date),
            label_path: row.label_path.clone(),
            creator_id: row.creator_id,
            creator_username: users.username(Some(row.creator_id)),
            creator_prefix: users.email_prefix(Some(row.creator_id)),
            owner_id: row.owner_id,
            owner_username: users.username(Some(row.owner_id)),
            owner_prefix: users.email_prefix(Some(row.owner_id)),
            created_at: ms_to_rfc3339(row.created_at_ms),
            updated_at: ms_to_rfc3339(row.updated_at_ms),
            deleted_at: row.deleted_at_ms.map(ms_to_rfc3339),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectPageView {
    pub items: Vec<ProjectView>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
}

impl ProjectPageView {
    pub(crate) fn new(page: &ProjectPage, users: &UserDirectory) -> Self {
        Self {
            items: page.items.iter().map(|p| ProjectView::new(p, users)).collect(),
            total: page.total,
            page: page.page,
            size: page.size,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProjectStatisticsView {
    pub project_id: i64,
    pub jobs: i64,
    pub tasks: i64,
    pub todo: i64,
    pub doing: i64,
    pub blocked: i64,
    pub done: i64,
    pub cancelled: i64,
}

impl From<ProjectStatistics> for ProjectStatisticsView {
    fn from(stats: ProjectStatistics) -> Self {
        Self {
            project_id: stats.project_id,
            jobs: stats.jobs,
            tasks: stats.tasks,
            todo: stats.todo,
            doing: stats.doing,
            blocked: stats.blocked,
            done: stats.done,
            cancelled: stats.cancelled,
        }
    }
}

pub(crate) fn project_user_ids<'a>(rows: impl IntoIterator<Item = &'a ProjectRow>) -> Vec<i64> {
    rows.into_iter()
        .flat_map(|row| [row.creator_id, row.owner_id])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_storage::UserRef;

    #[test]
    fn owner_only_body_becomes_transfer_patch() {
        let body: ProjectUpdateBody =
            serde_json::from_str(r#"{"owner_prefix":"bob"}"#).expect("parse");
        let patch = body.into_patch().expect("patch");
        assert_eq!(patch.owner, Some(UserRef::by_lookup("bob")));
        assert!(patch.is_owner_transfer_only());
    }

    #[test]
    fn list_query_defaults() {
        let request = ProjectListQuery::default().into_request().expect("request");
        assert_eq!(request.page, 1);
        assert!(!request.include_deleted);
        assert!(request.status.is_none());

        let bad = ProjectListQuery {
            status: Some("frozen".to_string()),
            ..ProjectListQuery::default()
        };
        assert!(bad.into_request().is_err());
    }
}
