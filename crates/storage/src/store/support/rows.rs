#![forbid(unsafe_code)]

use super::super::types::{OperationLogRow, ProjectRow, UserRow, WorkItemRow};
use pm_core::dates::{format_date, from_ms, parse_date, to_ms};
use pm_core::model::{Priority, ProjectStatus, WorkItemKind, WorkItemStatus};
use rusqlite::Row;
use rusqlite::types::Type;
use time::{Date, OffsetDateTime};

pub(in crate::store) const WORK_ITEM_COLUMNS: &str = "id, code, kind, project_id, parent_id, title, \
     description, status, priority, label_path, assignee_id, creator_id, start_date, \
     planned_start_date, planned_end_date, completed_at_ms, actual_hours, estimated_hours, \
     created_at_ms, updated_at_ms, deleted_at_ms";

pub(in crate::store) const PROJECT_COLUMNS: &str = "id, code, name, description, creator_id, \
     owner_id, priority, status, archived, start_date, end_date, label_path, created_at_ms, \
     updated_at_ms, deleted_at_ms";

pub(in crate::store) const USER_COLUMNS: &str =
    "id, username, email_prefix, email, full_name, is_admin, is_active, created_at_ms";

pub(in crate::store) const OPERATION_LOG_COLUMNS: &str = "id, user_id, username, operation_type, \
     entity_type, entity_id, operation_content, field_name, old_value, new_value, result_status, \
     failure_reason, created_at_ms";

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed_col<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|err| conversion_error(idx, err))
}

fn date_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Date>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| parse_date("date", &value))
        .transpose()
        .map_err(|err| conversion_error(idx, err))
}

pub(in crate::store) fn date_param(value: Option<Date>) -> Option<String> {
    value.map(format_date)
}

pub(in crate::store) fn ts_param(value: Option<OffsetDateTime>) -> Option<i64> {
    value.map(to_ms)
}

pub(in crate::store) fn work_item_from_row(row: &Row<'_>) -> rusqlite::Result<WorkItemRow> {
    let completed_at_ms: Option<i64> = row.get(15)?;
    Ok(WorkItemRow {
        id: row.get(0)?,
        code: row.get(1)?,
        kind: parsed_col(row, 2, WorkItemKind::parse)?,
        project_id: row.get(3)?,
        parent_id: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        status: parsed_col(row, 7, WorkItemStatus::parse)?,
        priority: parsed_col(row, 8, Priority::parse)?,
        label_path: row.get(9)?,
        assignee_id: row.get(10)?,
        creator_id: row.get(11)?,
        start_date: date_col(row, 12)?,
        planned_start_date: date_col(row, 13)?,
        planned_end_date: date_col(row, 14)?,
        completed_at: completed_at_ms.map(from_ms),
        actual_hours: row.get(16)?,
        estimated_hours: row.get(17)?,
        created_at_ms: row.get(18)?,
        updated_at_ms: row.get(19)?,
        deleted_at_ms: row.get(20)?,
    })
}

pub(in crate::store) fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        creator_id: row.get(4)?,
        owner_id: row.get(5)?,
        priority: parsed_col(row, 6, Priority::parse)?,
        status: parsed_col(row, 7, ProjectStatus::parse)?,
        archived: row.get(8)?,
        start_date: date_col(row, 9)?,
        end_date: date_col(row, 10)?,
        label_path: row.get(11)?,
        created_at_ms: row.get(12)?,
        updated_at_ms: row.get(13)?,
        deleted_at_ms: row.get(14)?,
    })
}

pub(in crate::store) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email_prefix: row.get(2)?,
        email: row.get(3)?,
        full_name: row.get(4)?,
        is_admin: row.get(5)?,
        is_active: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}

pub(in crate::store) fn operation_log_from_row(row: &Row<'_>) -> rusqlite::Result<OperationLogRow> {
    Ok(OperationLogRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        operation_type: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        content: row.get(6)?,
        field_name: row.get(7)?,
        old_value: row.get(8)?,
        new_value: row.get(9)?,
        result_status: row.get(10)?,
        failure_reason: row.get(11)?,
        created_at_ms: row.get(12)?,
    })
}
