#![forbid(unsafe_code)]

use super::super::support::{
    title_owner, live_children, live_work_item, now, resolve_user_ref, sanitize_html,
    work_item_by_id, write_work_item_tx, writable_project,
};
use super::super::{
    SqliteStore, StatusSync, StoreError, UserRef, WorkItemPatch, WorkItemRow,
    WorkItemUpdateOutcome, begin_write,
};
use super::{normalize_title, transition};
use pm_core::dates::to_ms;
use pm_core::lifecycle::TransitionContext;
use pm_core::model::{Actor, WorkItemKind, WorkItemStatus};
use pm_core::schedule::{ChildrenSpan, PlannedWindow};
use pm_core::worktime::WorkCalendar;
use rusqlite::Transaction;
use time::OffsetDateTime;
use tracing::info;

fn resolve_assignee(
    tx: &Transaction<'_>,
    current: Option<i64>,
    patch: &WorkItemPatch,
) -> Result<Option<i64>, StoreError> {
    if let Some(Some(id)) = patch.assignee_id {
        return resolve_user_ref(tx, &UserRef::by_id(id));
    }
    if let Some(lookup) = patch.assignee_lookup.as_deref() {
        return Ok(resolve_user_ref(tx, &UserRef::by_lookup(lookup))?.or(current));
    }
    match patch.assignee_id {
        Some(None) => Ok(None),
        _ => Ok(current),
    }
}

fn resolve_creator(
    tx: &Transaction<'_>,
    current: i64,
    patch: &WorkItemPatch,
) -> Result<i64, StoreError> {
    if let Some(id) = patch.creator_id {
        return Ok(resolve_user_ref(tx, &UserRef::by_id(id))?.unwrap_or(current));
    }
    if let Some(lookup) = patch.creator_lookup.as_deref() {
        return Ok(resolve_user_ref(tx, &UserRef::by_lookup(lookup))?.unwrap_or(current));
    }
    Ok(current)
}

/// Order and TASK containment always hold; JOB coverage is checked only when both new
/// planned dates arrive in the same patch.
fn check_window(
    tx: &Transaction<'_>,
    item: &WorkItemRow,
    window: &PlannedWindow,
    new_bounds: bool,
) -> Result<(), StoreError> {
    window.validate_order()?;
    match item.kind {
        WorkItemKind::Task => {
            if let Some(parent_id) = item.parent_id {
                let parent = live_work_item(tx, parent_id)?;
                window.check_within(&parent.planned_window())?;
            }
        }
        WorkItemKind::Job => {
            if new_bounds && window.bounds().is_some() {
                let children = live_children(tx, item.id)?;
                let windows: Vec<PlannedWindow> =
                    children.iter().map(WorkItemRow::planned_window).collect();
                if let Some(span) = ChildrenSpan::of(windows.iter()) {
                    window.check_covers(&span)?;
                }
            }
        }
    }
    Ok(())
}

/// Moves the parent JOB to the status all of its live TASKs now share.
fn sync_parent_status_tx(
    tx: &Transaction<'_>,
    calendar: &WorkCalendar,
    task: &WorkItemRow,
    now: OffsetDateTime,
) -> Result<Option<StatusSync>, StoreError> {
    let Some(parent_id) = task.parent_id else {
        return Ok(None);
    };
    let Some(mut parent) = work_item_by_id(tx, parent_id)?
        .filter(|p| !p.is_deleted() && p.kind == WorkItemKind::Job)
    else {
        return Ok(None);
    };
    let siblings = live_children(tx, parent_id)?;
    let Some(shared) = siblings.first().map(|s| s.status) else {
        return Ok(None);
    };
    if siblings.iter().any(|s| s.status != shared) || parent.status == shared {
        return Ok(None);
    }

    let previous_status = parent.status;
    let ctx = TransitionContext {
        calendar,
        now,
        completed_at: None,
    };
    transition(&mut parent, shared, &ctx);
    write_work_item_tx(tx, &parent)?;
    info!(
        parent = %parent.code,
        from = previous_status.as_str(),
        to = shared.as_str(),
        "parent status synced from tasks"
    );
    Ok(Some(StatusSync {
        previous_status,
        parent,
    }))
}

pub(super) fn update_work_item_tx(
    tx: &Transaction<'_>,
    calendar: &WorkCalendar,
    actor: &Actor,
    id: i64,
    patch: &WorkItemPatch,
) -> Result<WorkItemUpdateOutcome, StoreError> {
    let before = live_work_item(tx, id)?;
    writable_project(tx, before.project_id)?;
    let mut item = before.clone();

    if let Some(description) = patch.description.as_ref() {
        let cleaned = description.as_deref().map(sanitize_html);
        if cleaned != before.description {
            if actor.id != before.creator_id && !actor.is_admin {
                return Err(StoreError::forbidden(
                    "only the creator or an administrator may edit the description",
                ));
            }
            item.description = cleaned;
        }
    }

    if let Some(title) = patch.title.as_deref() {
        let title = normalize_title(title)?;
        if item.kind == WorkItemKind::Job
            && title != before.title
            && title_owner(tx, item.project_id, WorkItemKind::Job, &title, Some(item.id))?.is_some()
        {
            return Err(StoreError::validation(format!(
                "a JOB titled {title:?} already exists in this project"
            )));
        }
        item.title = title;
    }
    if let Some(priority) = patch.priority {
        item.priority = priority;
    }
    if let Some(label_path) = patch.label_path.clone() {
        item.label_path = label_path;
    }
    item.assignee_id = resolve_assignee(tx, before.assignee_id, patch)?;
    item.creator_id = resolve_creator(tx, before.creator_id, patch)?;
    if let Some(start_date) = patch.start_date {
        item.start_date = start_date;
    }

    let window = PlannedWindow::new(
        patch.planned_start_date.unwrap_or(before.planned_start_date),
        patch.planned_end_date.unwrap_or(before.planned_end_date),
    );
    let new_bounds = matches!(
        (patch.planned_start_date, patch.planned_end_date),
        (Some(Some(_)), Some(Some(_)))
    );
    check_window(tx, &item, &window, new_bounds)?;
    item.planned_start_date = window.start;
    item.planned_end_date = window.end;
    if patch.touches_planned_window() {
        item.estimated_hours = calendar.estimate_or_none(window.start, window.end);
    }

    let now = now();
    if let Some(target) = patch.status {
        if target == WorkItemStatus::Done && item.assignee_id.is_none() {
            item.assignee_id = Some(actor.id);
        }
        let ctx = TransitionContext {
            calendar,
            now,
            completed_at: patch.completed_at,
        };
        transition(&mut item, target, &ctx);
    }
    item.updated_at_ms = to_ms(now);
    write_work_item_tx(tx, &item)?;

    let synced_parent = if item.kind == WorkItemKind::Task && patch.status.is_some() {
        sync_parent_status_tx(tx, calendar, &item, now)?
    } else {
        None
    };

    let after = work_item_by_id(tx, id)?.ok_or_else(|| StoreError::not_found(format!("work item {id}")))?;
    Ok(WorkItemUpdateOutcome {
        before,
        after,
        synced_parent,
    })
}

impl SqliteStore {
    /// Applies a partial update, including any parent status sync, in one transaction.
    pub fn update_work_item(
        &mut self,
        actor: &Actor,
        id: i64,
        patch: WorkItemPatch,
    ) -> Result<WorkItemUpdateOutcome, StoreError> {
        let calendar = &self.calendar;
        let tx = begin_write(&mut self.conn)?;
        let outcome = update_work_item_tx(&tx, calendar, actor, id, &patch)?;
        tx.commit()?;
        Ok(outcome)
    }

    /// Applies several updates atomically, in order; any failure rolls all of them back.
    pub fn update_work_items(
        &mut self,
        actor: &Actor,
        updates: Vec<(i64, WorkItemPatch)>,
    ) -> Result<Vec<WorkItemUpdateOutcome>, StoreError> {
        let calendar = &self.calendar;
        let tx = begin_write(&mut self.conn)?;
        let mut outcomes = Vec::with_capacity(updates.len());
        for (id, patch) in &updates {
            outcomes.push(update_work_item_tx(&tx, calendar, actor, *id, patch)?);
        }
        tx.commit()?;
        Ok(outcomes)
    }
}
