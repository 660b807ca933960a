#![forbid(unsafe_code)]

use super::super::support::{
    WORK_ITEM_COLUMNS, title_owner, live_project, work_item_by_id, work_item_from_row,
};
use super::super::{SqliteStore, StoreError, WorkItemRow, WorkItemTreeNode};
use pm_core::ids::{CodePrefix, parse_code};
use pm_core::model::WorkItemKind;
use rusqlite::{OptionalExtension, params};
use std::collections::BTreeMap;

impl SqliteStore {
    pub fn get_work_item(&self, id: i64) -> Result<Option<WorkItemRow>, StoreError> {
        Ok(work_item_by_id(&self.conn, id)?.filter(|item| !item.is_deleted()))
    }

    /// Only well-formed `JOB-`/`TASK-` codes reach the database.
    pub fn get_work_item_by_code(&self, code: &str) -> Result<Option<WorkItemRow>, StoreError> {
        let code = code.trim();
        if !matches!(parse_code(code), Some((CodePrefix::Job | CodePrefix::Task, _))) {
            return Ok(None);
        }
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {WORK_ITEM_COLUMNS} FROM work_items WHERE code = ?1 AND deleted_at_ms IS NULL"
                ),
                params![code],
                work_item_from_row,
            )
            .optional()?)
    }

    /// JOBs of a project, each with its TASKs; both levels in id order.
    pub fn list_project_tree(
        &self,
        project_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<WorkItemTreeNode>, StoreError> {
        live_project(&self.conn, project_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WORK_ITEM_COLUMNS} FROM work_items \
             WHERE project_id = ?1 AND (?2 OR deleted_at_ms IS NULL) ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![project_id, include_deleted], work_item_from_row)?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;

        let mut nodes: Vec<WorkItemTreeNode> = Vec::new();
        let mut index: BTreeMap<i64, usize> = BTreeMap::new();
        let mut tasks = Vec::new();
        for item in items {
            match item.kind {
                WorkItemKind::Job => {
                    index.insert(item.id, nodes.len());
                    nodes.push(WorkItemTreeNode {
                        job: item,
                        subtasks: Vec::new(),
                    });
                }
                WorkItemKind::Task => tasks.push(item),
            }
        }
        for task in tasks {
            if let Some(&slot) = task.parent_id.as_ref().and_then(|parent| index.get(parent)) {
                nodes[slot].subtasks.push(task);
            }
        }
        Ok(nodes)
    }

    /// Id of a live item of `kind` in `project_id` already titled `title`, if any.
    pub fn title_conflict(
        &self,
        project_id: i64,
        kind: WorkItemKind,
        title: &str,
    ) -> Result<Option<i64>, StoreError> {
        title_owner(&self.conn, project_id, kind, title.trim(), None)
    }
}
