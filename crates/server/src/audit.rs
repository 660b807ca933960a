#![forbid(unsafe_code)]

//! Post-commit operation logging. Every write here is best-effort: a failure is logged and
//! dropped, never surfaced to the caller.

use pm_core::dates::format_date;
use pm_core::model::Actor;
use pm_storage::{
    CascadedItem, EntityType, OperationLogEntry, OperationType, ProjectRow, ProjectUpdateOutcome,
    SqliteStore, StoreError, WorkItemRow, WorkItemUpdateOutcome,
};
use time::Date;
use tracing::warn;

/// Who the log entries are attributed to; the display name prefers the full name.
#[derive(Clone, Debug)]
pub(crate) struct AuditActor {
    user_id: i64,
    display_name: String,
}

impl AuditActor {
    pub(crate) fn resolve(store: &SqliteStore, actor: &Actor) -> Self {
        let display_name = match store.get_user(actor.id) {
            Ok(Some(user)) => user
                .full_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(user.username),
            _ => actor.username.clone(),
        };
        Self {
            user_id: actor.id,
            display_name,
        }
    }

    fn entry(
        &self,
        operation_type: OperationType,
        entity_type: EntityType,
        entity_id: i64,
        content: impl Into<String>,
    ) -> OperationLogEntry {
        OperationLogEntry::success(
            self.user_id,
            &self.display_name,
            operation_type,
            entity_type,
            entity_id,
            content,
        )
    }
}

pub(crate) fn record(store: &mut SqliteStore, entries: &[OperationLogEntry]) {
    if let Err(err) = store.append_operation_logs(entries) {
        warn!(error = %err, entries = entries.len(), "operation log write dropped");
    }
}

#[derive(Debug, PartialEq)]
struct FieldChange {
    name: &'static str,
    old: Option<String>,
    new: Option<String>,
}

#[derive(Default)]
struct Changes(Vec<FieldChange>);

impl Changes {
    fn track<T: PartialEq>(
        &mut self,
        name: &'static str,
        old: &T,
        new: &T,
        render: impl Fn(&T) -> Option<String>,
    ) {
        if old != new {
            self.0.push(FieldChange {
                name,
                old: render(old),
                new: render(new),
            });
        }
    }
}

fn text(value: &Option<String>) -> Option<String> {
    value.clone()
}

fn date(value: &Option<Date>) -> Option<String> {
    value.map(format_date)
}

fn number<T: ToString>(value: &Option<T>) -> Option<String> {
    value.as_ref().map(ToString::to_string)
}

fn work_item_changes(before: &WorkItemRow, after: &WorkItemRow) -> Vec<FieldChange> {
    let mut changes = Changes::default();
    changes.track("title", &before.title, &after.title, |v| Some(v.clone()));
    changes.track("description", &before.description, &after.description, text);
    changes.track("status", &before.status, &after.status, |v| {
        Some(v.as_str().to_string())
    });
    changes.track("priority", &before.priority, &after.priority, |v| {
        Some(v.as_str().to_string())
    });
    changes.track("label_path", &before.label_path, &after.label_path, text);
    changes.track("assignee_id", &before.assignee_id, &after.assignee_id, number);
    changes.track("creator_id", &before.creator_id, &after.creator_id, |v| {
        Some(v.to_string())
    });
    changes.track("start_date", &before.start_date, &after.start_date, date);
    changes.track(
        "planned_start_date",
        &before.planned_start_date,
        &after.planned_start_date,
        date,
    );
    changes.track(
        "planned_end_date",
        &before.planned_end_date,
        &after.planned_end_date,
        date,
    );
    changes.track("completed_at", &before.completed_at, &after.completed_at, |v| {
        v.map(|ts| pm_core::dates::ms_to_rfc3339(pm_core::dates::to_ms(ts)))
    });
    changes.track("estimated_hours", &before.estimated_hours, &after.estimated_hours, number);
    changes.track("actual_hours", &before.actual_hours, &after.actual_hours, number);
    changes.0
}

fn project_changes(before: &ProjectRow, after: &ProjectRow) -> Vec<FieldChange> {
    let mut changes = Changes::default();
    changes.track("name", &before.name, &after.name, |v| Some(v.clone()));
    changes.track("description", &before.description, &after.description, text);
    changes.track("priority", &before.priority, &after.priority, |v| {
        Some(v.as_str().to_string())
    });
    changes.track("status", &before.status, &after.status, |v| {
        Some(v.as_str().to_string())
    });
    changes.track("start_date", &before.start_date, &after.start_date, date);
    changes.track("end_date", &before.end_date, &after.end_date, date);
    changes.track("label_path", &before.label_path, &after.label_path, text);
    changes.track("creator_id", &before.creator_id, &after.creator_id, |v| {
        Some(v.to_string())
    });
    changes.track("owner_id", &before.owner_id, &after.owner_id, |v| Some(v.to_string()));
    changes.0
}

fn describe(item: &WorkItemRow) -> String {
    format!("{} {}: {}", item.kind.as_str(), item.code, item.title)
}

pub(crate) fn work_item_created(who: &AuditActor, item: &WorkItemRow) -> Vec<OperationLogEntry> {
    vec![who.entry(
        OperationType::CreateWorkItem,
        EntityType::WorkItem,
        item.id,
        format!("created {}", describe(item)),
    )]
}

/// One entry per changed field (or one coarse entry), plus the parent sync if any.
pub(crate) fn work_item_updated(
    who: &AuditActor,
    outcome: &WorkItemUpdateOutcome,
) -> Vec<OperationLogEntry> {
    let after = &outcome.after;
    let changes = work_item_changes(&outcome.before, after);
    let mut entries: Vec<OperationLogEntry> = if changes.is_empty() {
        vec![who.entry(
            OperationType::UpdateWorkItem,
            EntityType::WorkItem,
            after.id,
            format!("updated {} (no field changed)", describe(after)),
        )]
    } else {
        changes
            .into_iter()
            .map(|change| {
                who.entry(
                    OperationType::UpdateWorkItem,
                    EntityType::WorkItem,
                    after.id,
                    format!("updated {} of {}", change.name, describe(after)),
                )
                .with_field(change.name, change.old, change.new)
            })
            .collect()
    };
    if let Some(sync) = outcome.synced_parent.as_ref() {
        entries.push(
            who.entry(
                OperationType::StatusSync,
                EntityType::WorkItem,
                sync.parent.id,
                format!(
                    "{} followed its tasks to {}",
                    describe(&sync.parent),
                    sync.parent.status.as_str()
                ),
            )
            .with_field(
                "status",
                Some(sync.previous_status.as_str().to_string()),
                Some(sync.parent.status.as_str().to_string()),
            ),
        );
    }
    entries
}

pub(crate) fn work_items_cascaded(who: &AuditActor, items: &[CascadedItem]) -> Vec<OperationLogEntry> {
    items
        .iter()
        .map(|cascaded| {
            who.entry(
                OperationType::StatusCascade,
                EntityType::WorkItem,
                cascaded.item.id,
                format!(
                    "cascaded status {} to {}",
                    cascaded.item.status.as_str(),
                    describe(&cascaded.item)
                ),
            )
            .with_field(
                "status",
                Some(cascaded.previous_status.as_str().to_string()),
                Some(cascaded.item.status.as_str().to_string()),
            )
        })
        .collect()
}

pub(crate) fn work_item_deleted(who: &AuditActor, item: &WorkItemRow) -> Vec<OperationLogEntry> {
    vec![who.entry(
        OperationType::DeleteWorkItem,
        EntityType::WorkItem,
        item.id,
        format!("deleted {}", describe(item)),
    )]
}

/// `entity_id` is 0 for a create that never produced a row.
pub(crate) fn failed(
    who: &AuditActor,
    operation_type: OperationType,
    entity_type: EntityType,
    entity_id: i64,
    err: &StoreError,
) -> Vec<OperationLogEntry> {
    let reason = if err.is_internal() {
        "internal error".to_string()
    } else {
        err.to_string()
    };
    vec![who
        .entry(
            operation_type,
            entity_type,
            entity_id,
            format!("{} failed", operation_type.as_str()),
        )
        .failed(reason)]
}

pub(crate) fn project_event(
    who: &AuditActor,
    operation_type: OperationType,
    project: &ProjectRow,
) -> Vec<OperationLogEntry> {
    let verb = match operation_type {
        OperationType::CreateProject => "created",
        OperationType::ArchiveProject => "archived",
        OperationType::UnarchiveProject => "unarchived",
        OperationType::DeleteProject => "deleted",
        OperationType::RestoreProject => "restored",
        _ => "updated",
    };
    vec![who.entry(
        operation_type,
        EntityType::Project,
        project.id,
        format!("{verb} project {}: {}", project.code, project.name),
    )]
}

pub(crate) fn project_updated(
    who: &AuditActor,
    outcome: &ProjectUpdateOutcome,
) -> Vec<OperationLogEntry> {
    let after = &outcome.after;
    let changes = project_changes(&outcome.before, after);
    if changes.is_empty() {
        return project_event(who, OperationType::UpdateProject, after);
    }
    changes
        .into_iter()
        .map(|change| {
            who.entry(
                OperationType::UpdateProject,
                EntityType::Project,
                after.id,
                format!("updated {} of project {}", change.name, after.code),
            )
            .with_field(change.name, change.old, change.new)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_core::model::{Priority, WorkItemKind, WorkItemStatus};
    use pm_storage::StatusSync;
    use time::macros::date;

    fn row() -> WorkItemRow {
        WorkItemRow {
            id: 2,
            code: "TASK-0001".to_string(),
            kind: WorkItemKind::Task,
            project_id: 1,
            parent_id: Some(1),
            title: "Wire up".to_string(),
            description: None,
            status: WorkItemStatus::Todo,
            priority: Priority::Medium,
            label_path: None,
            assignee_id: None,
            creator_id: 7,
            start_date: None,
            planned_start_date: Some(date!(2025 - 11 - 10)),
            planned_end_date: Some(date!(2025 - 11 - 14)),
            completed_at: None,
            actual_hours: None,
            estimated_hours: Some(40.0),
            created_at_ms: 0,
            updated_at_ms: 0,
            deleted_at_ms: None,
        }
    }

    fn who() -> AuditActor {
        AuditActor {
            user_id: 7,
            display_name: "Alice A.".to_string(),
        }
    }

    #[test]
    fn update_writes_one_entry_per_changed_field() {
        let before = row();
        let mut after = before.clone();
        after.status = WorkItemStatus::Doing;
        after.planned_end_date = Some(date!(2025 - 11 - 12));
        after.estimated_hours = Some(24.0);

        let entries = work_item_updated(
            &who(),
            &WorkItemUpdateOutcome {
                before,
                after,
                synced_parent: None,
            },
        );
        let fields: Vec<_> = entries
            .iter()
            .map(|e| e.field_name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(fields, ["status", "planned_end_date", "estimated_hours"]);
        assert_eq!(entries[1].old_value.as_deref(), Some("2025-11-14"));
        assert_eq!(entries[1].new_value.as_deref(), Some("2025-11-12"));
        assert!(entries.iter().all(|e| e.username == "Alice A."));
    }

    #[test]
    fn unchanged_update_writes_a_coarse_entry_and_sync_is_logged() {
        let before = row();
        let mut parent = row();
        parent.id = 1;
        parent.kind = WorkItemKind::Job;
        parent.status = WorkItemStatus::Done;
        let entries = work_item_updated(
            &who(),
            &WorkItemUpdateOutcome {
                before: before.clone(),
                after: before,
                synced_parent: Some(StatusSync {
                    previous_status: WorkItemStatus::Doing,
                    parent,
                }),
            },
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].field_name, None);
        assert_eq!(entries[1].operation_type, OperationType::StatusSync);
        assert_eq!(entries[1].entity_id, 1);
        assert_eq!(entries[1].old_value.as_deref(), Some("doing"));
        assert_eq!(entries[1].new_value.as_deref(), Some("done"));
    }

    #[test]
    fn failure_reasons_hide_store_internals() {
        let rejected = failed(
            &who(),
            OperationType::UpdateWorkItem,
            EntityType::WorkItem,
            2,
            &StoreError::validation("end before start"),
        );
        assert_eq!(
            rejected[0].failure_reason.as_deref(),
            Some("validation failed: end before start")
        );

        let broken = failed(
            &who(),
            OperationType::UpdateWorkItem,
            EntityType::WorkItem,
            2,
            &StoreError::Io(std::io::Error::other("disk gone")),
        );
        assert_eq!(broken[0].failure_reason.as_deref(), Some("internal error"));
    }
}
