#![forbid(unsafe_code)]

use calsvc_core::ViewId;
use calsvc_core::codes::StoreType;
use calsvc_core::record::{CalendarBook, Todo};
use calsvc_storage::{
    CONFIG_FILE_NAME, DB_FILE_NAME, PluginRegistry, StoreError, StoreSession,
};
use rusqlite::Connection;

#[test]
fn version_and_rows_survive_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = PluginRegistry::new();
    let (book_id, todo_id) = {
        let mut session = StoreSession::open(dir.path()).expect("open store");
        let mut book = CalendarBook::new("disk");
        book.store_type = StoreType::TODO;
        let book_id = registry
            .plugin(ViewId::Book)
            .insert(&mut session, &book.into())
            .expect("insert book");
        let todo_id = registry
            .plugin(ViewId::Todo)
            .insert(&mut session, &Todo::new(book_id).into())
            .expect("insert todo");
        (book_id, todo_id)
    };

    let session = StoreSession::open(dir.path()).expect("reopen store");
    assert_eq!(session.current_version().expect("version"), 1);
    assert_eq!(session.last_changed_version(), 0);
    let stored = registry
        .plugin(ViewId::Todo)
        .get(&session, todo_id)
        .expect("todo survives");
    assert_eq!(stored.as_todo().map(|todo| todo.calendar_book_id), Some(book_id));
}

#[test]
fn config_file_is_honored_and_validated() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"{ "max_instances_per_event": 3 }"#,
    )
    .expect("write config");
    let session = StoreSession::open(dir.path()).expect("open store");
    assert_eq!(session.config().max_instances_per_event, 3);
    assert_eq!(session.storage_dir(), Some(dir.path()));

    let broken = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        broken.path().join(CONFIG_FILE_NAME),
        r#"{ "max_instances_per_event": 0 }"#,
    )
    .expect("write config");
    assert!(matches!(
        StoreSession::open(broken.path()),
        Err(StoreError::InvalidParameter(_))
    ));
}

#[test]
fn foreign_database_is_refused() {
    let dir = tempfile::tempdir().expect("temp dir");
    let conn = Connection::open(dir.path().join(DB_FILE_NAME)).expect("raw open");
    conn.execute_batch("CREATE TABLE notes(id INTEGER PRIMARY KEY, body TEXT);")
        .expect("foreign schema");
    drop(conn);

    let err = StoreSession::open(dir.path()).expect_err("missing tables");
    assert!(matches!(err, StoreError::DbFailed(_)));
}

#[test]
fn ledger_rows_are_written_for_synced_deletes() {
    let dir = tempfile::tempdir().expect("temp dir");
    let registry = PluginRegistry::new();
    let mut session = StoreSession::open(dir.path()).expect("open store");
    let book_id = registry
        .plugin(ViewId::Book)
        .insert(&mut session, &CalendarBook::new("synced").into())
        .expect("insert book");
    let todo_id = registry
        .plugin(ViewId::Todo)
        .insert(&mut session, &Todo::new(book_id).into())
        .expect("insert todo");
    registry
        .plugin(ViewId::Todo)
        .delete(&mut session, todo_id)
        .expect("delete todo");

    let conn = Connection::open(dir.path().join(DB_FILE_NAME)).expect("raw open");
    let (schedule_id, deleted_ver): (i32, i64) = conn
        .query_row(
            "SELECT schedule_id, deleted_ver FROM deleted WHERE calendar_id = ?",
            [book_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("ledger row");
    assert_eq!(schedule_id, todo_id);
    assert_eq!(deleted_ver, 2);
    let live: i64 = conn
        .query_row("SELECT COUNT(*) FROM schedule", [], |row| row.get(0))
        .expect("count");
    assert_eq!(live, 0);
}
