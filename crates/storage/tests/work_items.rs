#![forbid(unsafe_code)]

use pm_core::model::{Actor, Priority, WorkItemKind, WorkItemStatus};
use pm_storage::{
    CascadeStatusRequest, NewUser, ProjectCreateRequest, ProjectRow, SqliteStore, StoreError,
    UserRef, WorkItemCreateRequest, WorkItemPatch, WorkItemRow,
};
use time::macros::{date, datetime};
use time::Date;

struct Fixture {
    store: SqliteStore,
    owner: Actor,
    other: Actor,
    admin: Actor,
    project: ProjectRow,
    _dir: tempfile::TempDir,
}

fn user(store: &mut SqliteStore, name: &str, is_admin: bool) -> Actor {
    store
        .create_user(NewUser {
            username: name.to_string(),
            email: Some(format!("{name}@example.com")),
            full_name: None,
            is_admin,
        })
        .expect("create user")
        .actor()
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");
    let owner = user(&mut store, "alice", false);
    let other = user(&mut store, "bob", false);
    let admin = user(&mut store, "root", true);
    let project = store
        .create_project(
            &owner,
            ProjectCreateRequest {
                name: "Apollo".to_string(),
                description: None,
                priority: Priority::High,
                start_date: None,
                end_date: None,
                label_path: None,
            },
        )
        .expect("create project");
    Fixture {
        store,
        owner,
        other,
        admin,
        project,
        _dir: dir,
    }
}

fn job_request(project_id: i64, title: &str, window: Option<(Date, Date)>) -> WorkItemCreateRequest {
    WorkItemCreateRequest {
        project_id,
        kind: WorkItemKind::Job,
        parent_id: None,
        title: title.to_string(),
        description: None,
        status: WorkItemStatus::Todo,
        priority: Priority::Medium,
        label_path: None,
        assignee: UserRef::default(),
        start_date: None,
        planned_start_date: window.map(|w| w.0),
        planned_end_date: window.map(|w| w.1),
    }
}

fn task_request(
    project_id: i64,
    parent_id: i64,
    title: &str,
    window: Option<(Date, Date)>,
) -> WorkItemCreateRequest {
    WorkItemCreateRequest {
        kind: WorkItemKind::Task,
        parent_id: Some(parent_id),
        ..job_request(project_id, title, window)
    }
}

fn status_patch(status: WorkItemStatus) -> WorkItemPatch {
    WorkItemPatch {
        status: Some(status),
        ..WorkItemPatch::default()
    }
}

fn window_patch(start: Date, end: Date) -> WorkItemPatch {
    WorkItemPatch {
        planned_start_date: Some(Some(start)),
        planned_end_date: Some(Some(end)),
        ..WorkItemPatch::default()
    }
}

fn job_with_tasks(f: &mut Fixture, tasks: usize) -> (WorkItemRow, Vec<WorkItemRow>) {
    let job = f
        .store
        .create_work_item(
            &f.owner,
            job_request(
                f.project.id,
                "Launch",
                Some((date!(2025 - 11 - 10), date!(2025 - 11 - 20))),
            ),
        )
        .expect("create job");
    let children = (0..tasks)
        .map(|i| {
            f.store
                .create_work_item(
                    &f.owner,
                    task_request(f.project.id, job.id, &format!("step {i}"), None),
                )
                .expect("create task")
        })
        .collect();
    (job, children)
}

fn expect_validation(result: Result<impl std::fmt::Debug, StoreError>, needle: &str) {
    match result {
        Err(StoreError::Validation(msg)) => assert!(msg.contains(needle), "message: {msg}"),
        other => panic!("expected Validation containing {needle:?}, got {other:?}"),
    }
}

fn expect_forbidden(result: Result<impl std::fmt::Debug, StoreError>) {
    match result {
        Err(StoreError::Forbidden(_)) => {}
        other => panic!("expected Forbidden, got {other:?}"),
    }
}

#[test]
fn create_issues_codes_and_estimates() {
    let mut f = fixture();
    let job = f
        .store
        .create_work_item(
            &f.owner,
            job_request(
                f.project.id,
                "Launch",
                Some((date!(2025 - 11 - 10), date!(2025 - 11 - 14))),
            ),
        )
        .expect("create job");
    assert_eq!(job.code, "JOB-0001");
    assert_eq!(job.creator_id, f.owner.id);
    assert_eq!(job.estimated_hours, Some(40.0));

    let weekend = f
        .store
        .create_work_item(
            &f.owner,
            task_request(
                f.project.id,
                job.id,
                "weekend",
                Some((date!(2025 - 11 - 15), date!(2025 - 11 - 16))),
            ),
        )
        .expect_err("weekend task lies outside the job window");
    assert!(matches!(weekend, StoreError::Validation(_)));

    let task = f
        .store
        .create_work_item(&f.owner, task_request(f.project.id, job.id, "unplanned", None))
        .expect("create task");
    assert_eq!(task.code, "TASK-0001");
    assert_eq!(task.estimated_hours, None);
}

#[test]
fn kind_and_parent_must_agree() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 1);

    let mut orphan_job = job_request(f.project.id, "Nested", None);
    orphan_job.parent_id = Some(job.id);
    expect_validation(f.store.create_work_item(&f.owner, orphan_job), "JOB cannot have a parent");

    let mut parentless = task_request(f.project.id, job.id, "Loose", None);
    parentless.parent_id = None;
    expect_validation(f.store.create_work_item(&f.owner, parentless), "TASK must have a parent");

    expect_validation(
        f.store
            .create_work_item(&f.owner, task_request(f.project.id, tasks[0].id, "Grandchild", None)),
        "is not a JOB",
    );

    match f
        .store
        .create_work_item(&f.owner, task_request(f.project.id, 9_999, "Ghost", None))
    {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn child_window_must_lie_within_parent() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);

    expect_validation(
        f.store.create_work_item(
            &f.owner,
            task_request(
                f.project.id,
                job.id,
                "late",
                Some((date!(2025 - 11 - 21), date!(2025 - 11 - 22))),
            ),
        ),
        "child window must lie within parent window",
    );
    let task = f
        .store
        .create_work_item(
            &f.owner,
            task_request(
                f.project.id,
                job.id,
                "inside",
                Some((date!(2025 - 11 - 12), date!(2025 - 11 - 14))),
            ),
        )
        .expect("inside window");

    expect_validation(
        f.store.update_work_item(
            &f.owner,
            task.id,
            window_patch(date!(2025 - 11 - 21), date!(2025 - 11 - 22)),
        ),
        "child window must lie within parent window",
    );
    expect_validation(
        f.store.update_work_item(
            &f.owner,
            task.id,
            window_patch(date!(2025 - 11 - 14), date!(2025 - 11 - 12)),
        ),
        "earlier than planned start",
    );
}

#[test]
fn job_window_cannot_shrink_below_its_tasks() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);
    f.store
        .create_work_item(
            &f.owner,
            task_request(
                f.project.id,
                job.id,
                "middle",
                Some((date!(2025 - 11 - 15), date!(2025 - 11 - 18))),
            ),
        )
        .expect("task");

    expect_validation(
        f.store.update_work_item(
            &f.owner,
            job.id,
            window_patch(date!(2025 - 11 - 13), date!(2025 - 11 - 14)),
        ),
        "parent window must cover all child windows",
    );

    let widened = f
        .store
        .update_work_item(
            &f.owner,
            job.id,
            window_patch(date!(2025 - 11 - 03), date!(2025 - 11 - 21)),
        )
        .expect("widen");
    assert_eq!(widened.after.planned_start_date, Some(date!(2025 - 11 - 03)));
    assert_eq!(widened.after.estimated_hours, Some(120.0));
}

#[test]
fn job_coverage_is_checked_only_when_both_dates_change() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);
    let mut early = task_request(f.project.id, job.id, "early", None);
    early.planned_start_date = Some(date!(2025 - 11 - 01));
    f.store.create_work_item(&f.owner, early).expect("start-only task");
    f.store
        .create_work_item(
            &f.owner,
            task_request(
                f.project.id,
                job.id,
                "inside",
                Some((date!(2025 - 11 - 12), date!(2025 - 11 - 14))),
            ),
        )
        .expect("task");

    let doing = f
        .store
        .update_work_item(&f.owner, job.id, status_patch(WorkItemStatus::Doing))
        .expect("status-only update");
    assert_eq!(doing.after.status, WorkItemStatus::Doing);

    let retitled = f
        .store
        .update_work_item(
            &f.owner,
            job.id,
            WorkItemPatch {
                title: Some("Launch v2".to_string()),
                planned_end_date: Some(Some(date!(2025 - 11 - 21))),
                ..WorkItemPatch::default()
            },
        )
        .expect("single date change");
    assert_eq!(retitled.after.planned_end_date, Some(date!(2025 - 11 - 21)));

    expect_validation(
        f.store.update_work_item(
            &f.owner,
            job.id,
            window_patch(date!(2025 - 11 - 10), date!(2025 - 11 - 21)),
        ),
        "parent window must cover all child windows",
    );
}

#[test]
fn duplicate_job_titles_are_rejected() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);
    expect_validation(
        f.store
            .create_work_item(&f.owner, job_request(f.project.id, "Launch", None)),
        "already exists",
    );
    assert_eq!(
        f.store
            .title_conflict(f.project.id, WorkItemKind::Job, " Launch ")
            .expect("lookup"),
        Some(job.id)
    );
    assert_eq!(
        f.store
            .title_conflict(f.project.id, WorkItemKind::Task, "Launch")
            .expect("lookup"),
        None
    );

    let second = f
        .store
        .create_work_item(&f.owner, job_request(f.project.id, "Follow-up", None))
        .expect("second job");
    let rename = WorkItemPatch {
        title: Some("Launch".to_string()),
        ..WorkItemPatch::default()
    };
    expect_validation(
        f.store.update_work_item(&f.owner, second.id, rename),
        "already exists",
    );
}

#[test]
fn completing_and_reopening_maintain_completion_fields() {
    let mut f = fixture();
    let (_, tasks) = job_with_tasks(&mut f, 2);
    let task = &tasks[0];

    let done = f
        .store
        .update_work_item(
            &f.other,
            task.id,
            WorkItemPatch {
                status: Some(WorkItemStatus::Done),
                start_date: Some(Some(date!(2025 - 11 - 10))),
                completed_at: Some(datetime!(2025-11-12 17:00 +8)),
                ..WorkItemPatch::default()
            },
        )
        .expect("complete");
    assert_eq!(done.after.status, WorkItemStatus::Done);
    assert_eq!(done.after.completed_at, Some(datetime!(2025-11-12 17:00 +8)));
    assert_eq!(done.after.actual_hours, Some(24.0));
    assert_eq!(done.after.assignee_id, Some(f.other.id));

    let reopened = f
        .store
        .update_work_item(&f.other, task.id, status_patch(WorkItemStatus::Doing))
        .expect("reopen");
    assert_eq!(reopened.after.completed_at, None);
    assert_eq!(reopened.after.actual_hours, None);
    assert_eq!(reopened.after.assignee_id, Some(f.other.id));
}

#[test]
fn repeated_done_update_defaults_a_cleared_assignee() {
    let mut f = fixture();
    let (_, tasks) = job_with_tasks(&mut f, 1);
    let task = &tasks[0];
    f.store
        .update_work_item(&f.owner, task.id, status_patch(WorkItemStatus::Done))
        .expect("complete");

    let redone = f
        .store
        .update_work_item(
            &f.other,
            task.id,
            WorkItemPatch {
                status: Some(WorkItemStatus::Done),
                assignee_id: Some(None),
                ..WorkItemPatch::default()
            },
        )
        .expect("done again");
    assert_eq!(redone.after.assignee_id, Some(f.other.id));

    let kept = f
        .store
        .update_work_item(&f.admin, task.id, status_patch(WorkItemStatus::Done))
        .expect("done with assignee");
    assert_eq!(kept.after.assignee_id, Some(f.other.id));
}

#[test]
fn parent_follows_when_all_tasks_agree() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 2);

    let first = f
        .store
        .update_work_item(&f.owner, tasks[0].id, status_patch(WorkItemStatus::Done))
        .expect("first done");
    assert!(first.synced_parent.is_none());
    assert_eq!(
        f.store.get_work_item(job.id).expect("get").expect("job").status,
        WorkItemStatus::Todo
    );

    let second = f
        .store
        .update_work_item(&f.owner, tasks[1].id, status_patch(WorkItemStatus::Done))
        .expect("second done");
    let sync = second.synced_parent.expect("parent synced");
    assert_eq!(sync.previous_status, WorkItemStatus::Todo);
    assert_eq!(sync.parent.id, job.id);
    assert_eq!(sync.parent.status, WorkItemStatus::Done);
    assert!(sync.parent.completed_at.is_some());
    assert!(sync.parent.actual_hours.is_some_and(|hours| hours > 0.0));

    let reverted = f
        .store
        .update_work_item(&f.owner, tasks[0].id, status_patch(WorkItemStatus::Todo))
        .expect("revert one task");
    assert!(reverted.synced_parent.is_none());
    let job_now = f.store.get_work_item(job.id).expect("get").expect("job");
    assert_eq!(job_now.status, WorkItemStatus::Done);
    assert!(job_now.completed_at.is_some());
}

#[test]
fn deleted_siblings_do_not_block_sync() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 2);
    f.store
        .soft_delete_work_item(&f.owner, tasks[1].id)
        .expect("delete sibling");
    let outcome = f
        .store
        .update_work_item(&f.owner, tasks[0].id, status_patch(WorkItemStatus::Blocked))
        .expect("block");
    let sync = outcome.synced_parent.expect("synced");
    assert_eq!(sync.parent.id, job.id);
    assert_eq!(sync.parent.status, WorkItemStatus::Blocked);
}

#[test]
fn cascade_sets_job_and_children() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 3);
    f.store
        .soft_delete_work_item(&f.owner, tasks[2].id)
        .expect("delete one task");

    let updated = f
        .store
        .cascade_status(
            &f.owner,
            CascadeStatusRequest {
                job_id: job.id,
                status: WorkItemStatus::Done,
                completed_at: Some(datetime!(2025-11-14 12:00 UTC)),
            },
        )
        .expect("cascade");
    assert_eq!(updated.len(), 3);
    assert_eq!(updated[0].item.id, job.id);
    for entry in &updated {
        assert_eq!(entry.previous_status, WorkItemStatus::Todo);
        assert_eq!(entry.item.status, WorkItemStatus::Done);
        assert_eq!(entry.item.completed_at, Some(datetime!(2025-11-14 12:00 UTC)));
    }
    assert_eq!(updated[0].item.actual_hours, Some(40.0));
    assert_eq!(updated[1].item.actual_hours, Some(0.0));

    let skipped = f
        .store
        .get_work_item(tasks[2].id)
        .expect("get");
    assert!(skipped.is_none());
}

#[test]
fn cascade_is_all_or_nothing() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 2);
    f.store
        .connection()
        .execute_batch(&format!(
            "CREATE TEMP TRIGGER fail_second_task BEFORE UPDATE OF status ON work_items \
             WHEN NEW.id = {} AND NEW.status = 'done' \
             BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
            tasks[1].id
        ))
        .expect("install trigger");

    let err = f
        .store
        .cascade_status(
            &f.owner,
            CascadeStatusRequest {
                job_id: job.id,
                status: WorkItemStatus::Done,
                completed_at: None,
            },
        )
        .expect_err("cascade must fail");
    assert!(matches!(err, StoreError::Sql(_)), "{err:?}");

    for id in [job.id, tasks[0].id, tasks[1].id] {
        let item = f.store.get_work_item(id).expect("get").expect("item");
        assert_eq!(item.status, WorkItemStatus::Todo, "{} kept new status", item.code);
        assert_eq!(item.completed_at, None);
    }
}

#[test]
fn cascade_requires_a_live_job() {
    let mut f = fixture();
    let (_, tasks) = job_with_tasks(&mut f, 1);
    match f.store.cascade_status(
        &f.owner,
        CascadeStatusRequest {
            job_id: tasks[0].id,
            status: WorkItemStatus::Done,
            completed_at: None,
        },
    ) {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn batch_update_rolls_back_on_any_failure() {
    let mut f = fixture();
    let (_, tasks) = job_with_tasks(&mut f, 2);
    let rename = WorkItemPatch {
        title: Some("renamed".to_string()),
        ..WorkItemPatch::default()
    };
    let escape = window_patch(date!(2025 - 12 - 01), date!(2025 - 12 - 02));

    expect_validation(
        f.store
            .update_work_items(&f.owner, vec![(tasks[0].id, rename.clone()), (tasks[1].id, escape)]),
        "child window must lie within parent window",
    );
    let untouched = f.store.get_work_item(tasks[0].id).expect("get").expect("task");
    assert_eq!(untouched.title, "step 0");

    let outcomes = f
        .store
        .update_work_items(
            &f.owner,
            vec![
                (tasks[0].id, rename),
                (tasks[1].id, status_patch(WorkItemStatus::Doing)),
            ],
        )
        .expect("batch");
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].after.title, "renamed");
    assert_eq!(outcomes[1].after.status, WorkItemStatus::Doing);
}

#[test]
fn archived_project_rejects_every_write() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 1);
    f.store
        .archive_project(f.project.id, &f.owner)
        .expect("archive");

    expect_forbidden(
        f.store
            .create_work_item(&f.admin, job_request(f.project.id, "Late", None)),
    );
    expect_forbidden(f.store.update_work_item(
        &f.admin,
        tasks[0].id,
        status_patch(WorkItemStatus::Done),
    ));
    expect_forbidden(f.store.soft_delete_work_item(&f.owner, tasks[0].id));
    expect_forbidden(f.store.cascade_status(
        &f.owner,
        CascadeStatusRequest {
            job_id: job.id,
            status: WorkItemStatus::Done,
            completed_at: None,
        },
    ));
}

#[test]
fn description_edits_are_limited_to_creator_and_admins() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);
    let patch = |text: &str| WorkItemPatch {
        description: Some(Some(text.to_string())),
        ..WorkItemPatch::default()
    };

    expect_forbidden(f.store.update_work_item(&f.other, job.id, patch("hijack")));

    let by_creator = f
        .store
        .update_work_item(&f.owner, job.id, patch("<p onclick=\"x()\">plan</p><script>1</script>"))
        .expect("creator edit");
    assert_eq!(by_creator.after.description.as_deref(), Some("<p>plan</p>"));

    let unchanged = f
        .store
        .update_work_item(&f.other, job.id, patch("<p>plan</p>"))
        .expect("resending the same text is not an edit");
    assert_eq!(unchanged.after.description.as_deref(), Some("<p>plan</p>"));

    let by_admin = f
        .store
        .update_work_item(&f.admin, job.id, patch("admin note"))
        .expect("admin edit");
    assert_eq!(by_admin.after.description.as_deref(), Some("admin note"));
}

#[test]
fn assignee_resolution_by_id_and_lookup() {
    let mut f = fixture();
    let (job, _) = job_with_tasks(&mut f, 0);

    let mut by_email = task_request(f.project.id, job.id, "mail", None);
    by_email.assignee = UserRef::by_lookup("bob@elsewhere.org");
    let task = f.store.create_work_item(&f.owner, by_email).expect("create");
    assert_eq!(task.assignee_id, Some(f.other.id));

    let mut unknown = task_request(f.project.id, job.id, "nobody", None);
    unknown.assignee = UserRef::by_lookup("carol");
    let task2 = f.store.create_work_item(&f.owner, unknown).expect("create");
    assert_eq!(task2.assignee_id, None);

    let mut bad_id = task_request(f.project.id, job.id, "bad", None);
    bad_id.assignee = UserRef::by_id(9_999);
    expect_validation(f.store.create_work_item(&f.owner, bad_id), "does not exist");

    let kept = f
        .store
        .update_work_item(
            &f.owner,
            task.id,
            WorkItemPatch {
                assignee_lookup: Some("carol".to_string()),
                ..WorkItemPatch::default()
            },
        )
        .expect("unresolved lookup");
    assert_eq!(kept.after.assignee_id, Some(f.other.id));

    let reassigned = f
        .store
        .update_work_item(
            &f.owner,
            task.id,
            WorkItemPatch {
                assignee_lookup: Some("root".to_string()),
                creator_lookup: Some("bob".to_string()),
                ..WorkItemPatch::default()
            },
        )
        .expect("lookup");
    assert_eq!(reassigned.after.assignee_id, Some(f.admin.id));
    assert_eq!(reassigned.after.creator_id, f.other.id);

    let cleared = f
        .store
        .update_work_item(
            &f.owner,
            task.id,
            WorkItemPatch {
                assignee_id: Some(None),
                ..WorkItemPatch::default()
            },
        )
        .expect("unassign");
    assert_eq!(cleared.after.assignee_id, None);
}

#[test]
fn soft_deleting_a_job_leaves_its_tasks() {
    let mut f = fixture();
    let (job, tasks) = job_with_tasks(&mut f, 2);
    let deleted = f
        .store
        .soft_delete_work_item(&f.owner, job.id)
        .expect("delete job");
    assert!(deleted.deleted_at_ms.is_some());
    assert_eq!(deleted.status, WorkItemStatus::Todo);

    for task in &tasks {
        let live = f.store.get_work_item(task.id).expect("get").expect("task survives");
        assert!(live.deleted_at_ms.is_none());
    }
    match f.store.soft_delete_work_item(&f.owner, job.id) {
        Err(StoreError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }

    assert!(f.store.list_project_tree(f.project.id, false).expect("tree").is_empty());
    let with_deleted = f.store.list_project_tree(f.project.id, true).expect("tree");
    assert_eq!(with_deleted.len(), 1);
    assert_eq!(with_deleted[0].subtasks.len(), 2);
}

#[test]
fn project_tree_nests_tasks_under_jobs() {
    let mut f = fixture();
    let (first, _) = job_with_tasks(&mut f, 2);
    let second = f
        .store
        .create_work_item(&f.owner, job_request(f.project.id, "Second", None))
        .expect("second job");
    f.store
        .create_work_item(&f.owner, task_request(f.project.id, second.id, "only", None))
        .expect("task");

    let tree = f.store.list_project_tree(f.project.id, false).expect("tree");
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].job.id, first.id);
    assert_eq!(
        tree[0].subtasks.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
        vec!["step 0", "step 1"]
    );
    assert_eq!(tree[1].subtasks.len(), 1);

    let by_code = f
        .store
        .get_work_item_by_code(&format!(" {} ", second.code))
        .expect("by code")
        .expect("found");
    assert_eq!(by_code.id, second.id);
    for malformed in ["PRO-0001", "JOB-2", "job-0002", "JOB-00x2"] {
        assert!(
            f.store.get_work_item_by_code(malformed).expect("lookup").is_none(),
            "{malformed}"
        );
    }
}
