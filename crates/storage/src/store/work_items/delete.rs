#![forbid(unsafe_code)]

use super::super::support::{live_work_item, now_ms, work_item_by_id, write_work_item_tx, writable_project};
use super::super::{SqliteStore, StoreError, WorkItemRow, begin_write};
use pm_core::model::Actor;
use tracing::debug;

impl SqliteStore {
    /// Marks the item deleted. Children of a deleted JOB keep their own state.
    pub fn soft_delete_work_item(&mut self, actor: &Actor, id: i64) -> Result<WorkItemRow, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let mut item = live_work_item(&tx, id)?;
        writable_project(&tx, item.project_id)?;
        let now = now_ms();
        item.deleted_at_ms = Some(now);
        item.updated_at_ms = now;
        write_work_item_tx(&tx, &item)?;
        let item = work_item_by_id(&tx, id)?.ok_or_else(|| StoreError::not_found(format!("work item {id}")))?;
        tx.commit()?;
        debug!(code = %item.code, actor = %actor.username, "work item soft-deleted");
        Ok(item)
    }
}
