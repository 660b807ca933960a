#![forbid(unsafe_code)]

use super::super::sequences::next_code_tx;
use super::super::support::{
    insert_work_item_tx, title_owner, live_work_item, now, resolve_user_ref, sanitize_html,
    work_item_by_id, writable_project,
};
use super::super::{SqliteStore, StoreError, WorkItemCreateRequest, WorkItemRow, begin_write};
use super::{normalize_title, transition};
use pm_core::dates::to_ms;
use pm_core::lifecycle::TransitionContext;
use pm_core::model::{Actor, WorkItemKind, WorkItemStatus};
use pm_core::schedule::PlannedWindow;

fn check_kind_parent(kind: WorkItemKind, parent_id: Option<i64>) -> Result<(), StoreError> {
    match (kind, parent_id) {
        (WorkItemKind::Job, Some(_)) => Err(StoreError::validation("a JOB cannot have a parent")),
        (WorkItemKind::Task, None) => Err(StoreError::validation("a TASK must have a parent JOB")),
        _ => Ok(()),
    }
}

impl SqliteStore {
    /// Creates a JOB or TASK and issues its code in the same transaction.
    pub fn create_work_item(
        &mut self,
        actor: &Actor,
        request: WorkItemCreateRequest,
    ) -> Result<WorkItemRow, StoreError> {
        let calendar = &self.calendar;
        let tx = begin_write(&mut self.conn)?;

        writable_project(&tx, request.project_id)?;
        check_kind_parent(request.kind, request.parent_id)?;
        let window = PlannedWindow::new(request.planned_start_date, request.planned_end_date);
        window.validate_order()?;

        if let Some(parent_id) = request.parent_id {
            let parent = live_work_item(&tx, parent_id)?;
            if parent.kind != WorkItemKind::Job {
                return Err(StoreError::validation(format!(
                    "parent {} is not a JOB",
                    parent.code
                )));
            }
            if parent.project_id != request.project_id {
                return Err(StoreError::validation(format!(
                    "parent {} belongs to another project",
                    parent.code
                )));
            }
            window.check_within(&parent.planned_window())?;
        }

        let title = normalize_title(&request.title)?;
        if request.kind == WorkItemKind::Job
            && title_owner(&tx, request.project_id, WorkItemKind::Job, &title, None)?.is_some()
        {
            return Err(StoreError::validation(format!(
                "a JOB titled {title:?} already exists in this project"
            )));
        }

        let assignee_id = resolve_user_ref(&tx, &request.assignee)?;
        let code = next_code_tx(&tx, request.kind.code_prefix())?;
        let now = now();
        let now_ms = to_ms(now);

        let mut item = WorkItemRow {
            id: 0,
            code,
            kind: request.kind,
            project_id: request.project_id,
            parent_id: request.parent_id,
            title,
            description: request.description.as_deref().map(sanitize_html),
            status: WorkItemStatus::Todo,
            priority: request.priority,
            label_path: request.label_path,
            assignee_id,
            creator_id: actor.id,
            start_date: request.start_date,
            planned_start_date: window.start,
            planned_end_date: window.end,
            completed_at: None,
            actual_hours: None,
            estimated_hours: calendar.estimate_or_none(window.start, window.end),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            deleted_at_ms: None,
        };
        let ctx = TransitionContext {
            calendar,
            now,
            completed_at: None,
        };
        transition(&mut item, request.status, &ctx);

        let id = insert_work_item_tx(&tx, &item)?;
        let item = work_item_by_id(&tx, id)?
            .ok_or_else(|| StoreError::not_found(format!("work item {id}")))?;
        tx.commit()?;
        Ok(item)
    }
}
