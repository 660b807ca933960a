#![forbid(unsafe_code)]

use pm_core::dates::ms_to_rfc3339;
use pm_core::model::Actor;
use pm_storage::{OperationLogPage, OperationLogRow, UserRow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct UserView {
    pub id: i64,
    pub username: String,
    pub email_prefix: String,
    pub full_name: Option<String>,
}

impl From<&UserRow> for UserView {
    fn from(user: &UserRow) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email_prefix: user.email_prefix.clone(),
            full_name: user.full_name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MeView {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub email: Option<String>,
    pub email_prefix: Option<String>,
    pub full_name: Option<String>,
}

impl MeView {
    pub(crate) fn new(actor: &Actor, user: Option<&UserRow>) -> Self {
        Self {
            id: actor.id,
            username: actor.username.clone(),
            is_admin: actor.is_admin,
            email: user.and_then(|u| u.email.clone()),
            email_prefix: user.map(|u| u.email_prefix.clone()),
            full_name: user.and_then(|u| u.full_name.clone()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LogPageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OperationLogView {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub operation_type: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub operation_content: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub result_status: String,
    pub failure_reason: Option<String>,
    pub created_at: String,
}

impl From<&OperationLogRow> for OperationLogView {
    fn from(row: &OperationLogRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username.clone(),
            operation_type: row.operation_type.clone(),
            entity_type: row.entity_type.clone(),
            entity_id: row.entity_id,
            operation_content: row.content.clone(),
            field_name: row.field_name.clone(),
            old_value: row.old_value.clone(),
            new_value: row.new_value.clone(),
            result_status: row.result_status.clone(),
            failure_reason: row.failure_reason.clone(),
            created_at: ms_to_rfc3339(row.created_at_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OperationLogPageView {
    pub items: Vec<OperationLogView>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&OperationLogPage> for OperationLogPageView {
    fn from(page: &OperationLogPage) -> Self {
        Self {
            items: page.items.iter().map(OperationLogView::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}
