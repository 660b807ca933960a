#![forbid(unsafe_code)]

use pm_core::model::{Priority, WorkItemKind, WorkItemStatus};
use pm_storage::{
    NewUser, ProjectCreateRequest, SqliteStore, StoreError, UserRef, WorkItemCreateRequest,
};
use std::collections::BTreeSet;
use std::thread;

fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

#[test]
fn codes_are_zero_padded_and_sequential_per_prefix() {
    let (_dir, mut store) = open_store();
    assert_eq!(store.next_code("JOB").expect("job 1"), "JOB-0001");
    assert_eq!(store.next_code("JOB").expect("job 2"), "JOB-0002");
    assert_eq!(store.next_code("TASK").expect("task 1"), "TASK-0001");
    assert_eq!(store.peek_next_value("JOB").expect("peek"), 3);
    assert_eq!(store.peek_next_value("PRO").expect("peek"), 1);
}

#[test]
fn unknown_prefix_is_an_invalid_argument() {
    let (_dir, mut store) = open_store();
    match store.next_code("BUG") {
        Err(StoreError::InvalidArgument(msg)) => assert!(msg.contains("BUG"), "{msg}"),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
    assert!(matches!(
        store.peek_next_value("job"),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn reset_sequence_sets_the_next_value() {
    let (_dir, mut store) = open_store();
    store.reset_sequence("TASK", 9999).expect("reset");
    assert_eq!(store.next_code("TASK").expect("task"), "TASK-9999");
    assert_eq!(store.next_code("TASK").expect("task"), "TASK-10000");
    assert!(matches!(
        store.reset_sequence("TASK", 0),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn concurrent_issuance_never_repeats_a_code() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 25;

    let dir = tempfile::tempdir().expect("temp dir");
    let before = SqliteStore::open(dir.path())
        .expect("open store")
        .peek_next_value("JOB")
        .expect("peek");

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                let mut store = SqliteStore::open(&path).expect("open store in thread");
                (0..PER_THREAD)
                    .map(|_| store.next_code("JOB").expect("issue code"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut codes = BTreeSet::new();
    for handle in handles {
        for code in handle.join().expect("thread") {
            assert!(codes.insert(code.clone()), "duplicate code {code}");
        }
    }
    assert_eq!(codes.len(), THREADS * PER_THREAD);

    let after = SqliteStore::open(dir.path())
        .expect("reopen")
        .peek_next_value("JOB")
        .expect("peek");
    assert_eq!(after - before, (THREADS * PER_THREAD) as i64);
}

#[test]
fn failed_create_does_not_consume_a_code() {
    let (_dir, mut store) = open_store();
    let owner = store
        .create_user(NewUser {
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            full_name: None,
            is_admin: false,
        })
        .expect("user")
        .actor();
    let project = store
        .create_project(
            &owner,
            ProjectCreateRequest {
                name: "Apollo".to_string(),
                description: None,
                priority: Priority::Medium,
                start_date: None,
                end_date: None,
                label_path: None,
            },
        )
        .expect("project");
    store
        .connection()
        .execute_batch(
            "CREATE TEMP TRIGGER reject_boom BEFORE INSERT ON work_items \
             WHEN NEW.title = 'boom' BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
        )
        .expect("install trigger");

    let request = |title: &str| WorkItemCreateRequest {
        project_id: project.id,
        kind: WorkItemKind::Job,
        parent_id: None,
        title: title.to_string(),
        description: None,
        status: WorkItemStatus::Todo,
        priority: Priority::Medium,
        label_path: None,
        assignee: UserRef::default(),
        start_date: None,
        planned_start_date: None,
        planned_end_date: None,
    };
    let err = store
        .create_work_item(&owner, request("boom"))
        .expect_err("insert must fail");
    assert!(matches!(err, StoreError::Sql(_)), "{err:?}");

    let job = store.create_work_item(&owner, request("real")).expect("job");
    assert_eq!(job.code, "JOB-0001");
}
