#![forbid(unsafe_code)]

use super::super::support::{live_children, now, work_item_by_id, write_work_item_tx, writable_project};
use super::super::{CascadeStatusRequest, CascadedItem, SqliteStore, StoreError, begin_write};
use super::transition;
use pm_core::lifecycle::TransitionContext;
use pm_core::model::{Actor, WorkItemKind};
use tracing::info;

impl SqliteStore {
    /// Sets a JOB and all of its live TASKs to one status, atomically.
    ///
    /// Each item gets its own completion bookkeeping. Parent sync is not re-run: the
    /// children already agree with the JOB afterwards.
    pub fn cascade_status(
        &mut self,
        actor: &Actor,
        request: CascadeStatusRequest,
    ) -> Result<Vec<CascadedItem>, StoreError> {
        let calendar = &self.calendar;
        let tx = begin_write(&mut self.conn)?;

        let job = work_item_by_id(&tx, request.job_id)?
            .filter(|item| !item.is_deleted() && item.kind == WorkItemKind::Job)
            .ok_or_else(|| StoreError::not_found(format!("job {}", request.job_id)))?;
        writable_project(&tx, job.project_id)?;
        let children = live_children(&tx, job.id)?;

        let ctx = TransitionContext {
            calendar,
            now: now(),
            completed_at: request.completed_at,
        };
        let mut updated = Vec::with_capacity(children.len() + 1);
        for mut item in std::iter::once(job).chain(children) {
            let previous_status = item.status;
            transition(&mut item, request.status, &ctx);
            write_work_item_tx(&tx, &item)?;
            updated.push(CascadedItem {
                previous_status,
                item,
            });
        }
        tx.commit()?;

        info!(
            job_id = request.job_id,
            status = request.status.as_str(),
            items = updated.len(),
            actor = %actor.username,
            "status cascaded"
        );
        Ok(updated)
    }
}
