#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::types::ProjectRow;
use super::{PROJECT_COLUMNS, project_from_row};
use rusqlite::{Connection, OptionalExtension, params};

pub(in crate::store) fn project_by_id(conn: &Connection, id: i64) -> Result<Option<ProjectRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )
        .optional()?)
}

pub(in crate::store) fn live_project(conn: &Connection, id: i64) -> Result<ProjectRow, StoreError> {
    match project_by_id(conn, id)? {
        Some(project) if !project.is_deleted() => Ok(project),
        _ => Err(StoreError::not_found(format!("project {id}"))),
    }
}

/// Live and not archived: the precondition for every work-item mutation.
pub(in crate::store) fn writable_project(conn: &Connection, id: i64) -> Result<ProjectRow, StoreError> {
    let project = live_project(conn, id)?;
    if project.archived {
        return Err(StoreError::forbidden(format!(
            "project {} is archived",
            project.code
        )));
    }
    Ok(project)
}
