#![forbid(unsafe_code)]

use pm_storage::{
    EntityType, NewUser, OperationLogEntry, OperationType, SqliteStore, StoreError,
};

fn open_store() -> (tempfile::TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

fn new_user(name: &str, email: Option<&str>) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: email.map(str::to_string),
        full_name: None,
        is_admin: false,
    }
}

#[test]
fn sessions_resolve_to_actors() {
    let (_dir, mut store) = open_store();
    let alice = store
        .create_user(new_user("alice", Some("alice.w@example.com")))
        .expect("create");
    assert_eq!(alice.email_prefix, "alice.w");

    store.register_session(alice.id, "secret-token").expect("register");
    let actor = store
        .resolve_session("secret-token")
        .expect("resolve")
        .expect("known token");
    assert_eq!(actor.id, alice.id);
    assert_eq!(actor.username, "alice");
    assert!(!actor.is_admin);
    assert!(store.resolve_session("other").expect("resolve").is_none());

    let stored: String = store
        .connection()
        .query_row("SELECT token_sha256 FROM sessions", [], |row| row.get(0))
        .expect("session row");
    assert_ne!(stored, "secret-token");
    assert_eq!(stored.len(), 64);

    assert!(store.revoke_session("secret-token").expect("revoke"));
    assert!(store.resolve_session("secret-token").expect("resolve").is_none());
}

#[test]
fn duplicate_users_conflict_and_upsert_refreshes() {
    let (_dir, mut store) = open_store();
    store.create_user(new_user("alice", None)).expect("create");
    match store.create_user(new_user("alice", Some("a2@example.com"))) {
        Err(StoreError::Conflict(_)) => {}
        other => panic!("expected Conflict, got {other:?}"),
    }

    let refreshed = store
        .upsert_user(NewUser {
            is_admin: true,
            full_name: Some("Alice W".to_string()),
            ..new_user("alice", None)
        })
        .expect("upsert");
    assert!(refreshed.is_admin);
    assert_eq!(refreshed.full_name.as_deref(), Some("Alice W"));
    assert_eq!(store.list_active_users().expect("list").len(), 1);
}

#[test]
fn operation_log_is_append_only_and_newest_first() {
    let (_dir, mut store) = open_store();
    let alice = store.create_user(new_user("alice", None)).expect("create");

    let entries: Vec<_> = (1..=3)
        .map(|n| {
            OperationLogEntry::success(
                alice.id,
                &alice.username,
                OperationType::UpdateWorkItem,
                EntityType::WorkItem,
                7,
                format!("edit {n}"),
            )
            .with_field("title", Some(format!("t{}", n - 1)), Some(format!("t{n}")))
        })
        .collect();
    store.append_operation_logs(&entries).expect("append");
    store
        .append_operation_logs(&[OperationLogEntry::success(
            alice.id,
            &alice.username,
            OperationType::DeleteWorkItem,
            EntityType::WorkItem,
            7,
            "delete",
        )
        .failed("project is archived")])
        .expect("append failure");

    let page = store
        .list_operation_logs(EntityType::WorkItem, 7, 1, 2)
        .expect("list");
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].operation_type, "delete_work_item");
    assert_eq!(page.items[0].result_status, "failed");
    assert_eq!(page.items[0].failure_reason.as_deref(), Some("project is archived"));
    assert_eq!(page.items[1].content, "edit 3");
    assert_eq!(page.items[1].field_name.as_deref(), Some("title"));

    assert!(
        store
            .list_operation_logs(EntityType::Project, 7, 1, 20)
            .expect("list")
            .items
            .is_empty()
    );

    let tamper = store
        .connection()
        .execute("DELETE FROM operation_logs", []);
    assert!(tamper.is_err(), "operation log rows must not be deletable");
    let rewrite = store
        .connection()
        .execute("UPDATE operation_logs SET operation_content = 'x'", []);
    assert!(rewrite.is_err(), "operation log rows must not be editable");
}
