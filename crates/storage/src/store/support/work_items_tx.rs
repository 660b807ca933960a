#![forbid(unsafe_code)]

use super::super::StoreError;
use super::super::types::WorkItemRow;
use super::{WORK_ITEM_COLUMNS, date_param, ts_param, work_item_from_row};
use pm_core::model::WorkItemKind;
use rusqlite::{Connection, OptionalExtension, Transaction, params};

pub(in crate::store) fn work_item_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<WorkItemRow>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE id = ?1"),
            params![id],
            work_item_from_row,
        )
        .optional()?)
}

pub(in crate::store) fn live_work_item(conn: &Connection, id: i64) -> Result<WorkItemRow, StoreError> {
    match work_item_by_id(conn, id)? {
        Some(item) if !item.is_deleted() => Ok(item),
        _ => Err(StoreError::not_found(format!("work item {id}"))),
    }
}

pub(in crate::store) fn live_children(
    conn: &Connection,
    parent_id: i64,
) -> Result<Vec<WorkItemRow>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORK_ITEM_COLUMNS} FROM work_items \
         WHERE parent_id = ?1 AND deleted_at_ms IS NULL ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map(params![parent_id], work_item_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Id of a live item of `kind` in the project already using `title`, other than `exclude_id`.
pub(in crate::store) fn title_owner(
    conn: &Connection,
    project_id: i64,
    kind: WorkItemKind,
    title: &str,
    exclude_id: Option<i64>,
) -> Result<Option<i64>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id FROM work_items \
             WHERE project_id = ?1 AND kind = ?2 AND title = ?3 AND deleted_at_ms IS NULL \
               AND (?4 IS NULL OR id <> ?4) \
             ORDER BY id ASC LIMIT 1",
            params![project_id, kind.as_str(), title, exclude_id],
            |row| row.get(0),
        )
        .optional()?)
}

pub(in crate::store) fn insert_work_item_tx(
    tx: &Transaction<'_>,
    item: &WorkItemRow,
) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO work_items(code, kind, project_id, parent_id, title, description, status, \
           priority, label_path, assignee_id, creator_id, start_date, planned_start_date, \
           planned_end_date, completed_at_ms, actual_hours, estimated_hours, created_at_ms, \
           updated_at_ms, deleted_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, NULL)",
        params![
            item.code,
            item.kind.as_str(),
            item.project_id,
            item.parent_id,
            item.title,
            item.description,
            item.status.as_str(),
            item.priority.as_str(),
            item.label_path,
            item.assignee_id,
            item.creator_id,
            date_param(item.start_date),
            date_param(item.planned_start_date),
            date_param(item.planned_end_date),
            ts_param(item.completed_at),
            item.actual_hours,
            item.estimated_hours,
            item.created_at_ms,
            item.updated_at_ms,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

/// Writes every mutable column of `item` back to its row.
pub(in crate::store) fn write_work_item_tx(
    tx: &Transaction<'_>,
    item: &WorkItemRow,
) -> Result<(), StoreError> {
    let changed = tx.execute(
        "UPDATE work_items SET title = ?2, description = ?3, status = ?4, priority = ?5, \
           label_path = ?6, assignee_id = ?7, creator_id = ?8, start_date = ?9, \
           planned_start_date = ?10, planned_end_date = ?11, completed_at_ms = ?12, \
           actual_hours = ?13, estimated_hours = ?14, updated_at_ms = ?15, deleted_at_ms = ?16 \
         WHERE id = ?1",
        params![
            item.id,
            item.title,
            item.description,
            item.status.as_str(),
            item.priority.as_str(),
            item.label_path,
            item.assignee_id,
            item.creator_id,
            date_param(item.start_date),
            date_param(item.planned_start_date),
            date_param(item.planned_end_date),
            ts_param(item.completed_at),
            item.actual_hours,
            item.estimated_hours,
            item.updated_at_ms,
            item.deleted_at_ms,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::not_found(format!("work item {}", item.id)));
    }
    Ok(())
}
