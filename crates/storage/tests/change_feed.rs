#![forbid(unsafe_code)]

use calsvc_core::codes::{ModifiedStatus, StoreType, SyncEvent};
use calsvc_core::record::{CalendarBook, ChangeRecord, Event, Todo};
use calsvc_core::{CalTime, ViewId};
use calsvc_core::RecordKind;
use calsvc_storage::{
    MemorySink, PluginRegistry, StoreError, StoreSession, changes_exception_since,
    changes_since, clean_after_sync,
};
use std::sync::Arc;

fn book(session: &mut StoreSession, sync_event: SyncEvent) -> i32 {
    let mut book = CalendarBook::new("sync");
    book.sync_event = sync_event;
    book.store_type = StoreType::ALL;
    PluginRegistry::new()
        .plugin(ViewId::Book)
        .insert(session, &book.into())
        .expect("insert book")
}

fn insert_todo(session: &mut StoreSession, book_id: i32, summary: &str) -> i32 {
    let mut todo = Todo::new(book_id);
    todo.summary = Some(summary.to_string());
    PluginRegistry::new()
        .plugin(ViewId::Todo)
        .insert(session, &todo.into())
        .expect("insert todo")
}

fn ids(changes: &[ChangeRecord]) -> Vec<i32> {
    changes.iter().map(|change| change.id).collect()
}

#[test]
fn feed_reports_each_change_once_per_window() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::EveryAndRemain);
    let first = insert_todo(&mut session, book_id, "first");
    let second = insert_todo(&mut session, book_id, "second");

    let (changes, v2) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert_eq!(v2, 2);
    assert_eq!(ids(&changes), vec![first, second]);
    assert!(
        changes
            .iter()
            .all(|change| change.status == ModifiedStatus::Inserted)
    );

    let mut patch = Todo::new(book_id);
    patch.id = first;
    patch.set_progress(50);
    PluginRegistry::new()
        .plugin(ViewId::Todo)
        .update(&mut session, &patch.into())
        .expect("update");

    let (changes, v3) = changes_since(&session, ViewId::Todo, None, v2).expect("changes");
    assert_eq!(v3, 3);
    assert_eq!(ids(&changes), vec![first]);
    assert_eq!(changes[0].status, ModifiedStatus::Updated);
    assert_eq!(changes[0].version, 3);

    let (changes, _) = changes_since(&session, ViewId::Todo, None, v3).expect("changes");
    assert!(changes.is_empty());

    let (events, _) = changes_since(&session, ViewId::Event, None, 0).expect("event changes");
    assert!(events.is_empty());
}

#[test]
fn feed_filters_by_book() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let home = book(&mut session, SyncEvent::EveryAndDelete);
    let work = book(&mut session, SyncEvent::EveryAndDelete);
    let at_home = insert_todo(&mut session, home, "groceries");
    let at_work = insert_todo(&mut session, work, "report");

    let (changes, _) = changes_since(&session, ViewId::Todo, Some(work), 0).expect("changes");
    assert_eq!(ids(&changes), vec![at_work]);
    assert_eq!(changes[0].calendar_book_id, work);
    let (changes, _) =
        changes_since(&session, ViewId::TodoBook, Some(home), 0).expect("joined view");
    assert_eq!(ids(&changes), vec![at_home]);
}

#[test]
fn hard_deletes_surface_through_the_ledger() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::EveryAndDelete);
    let kept = insert_todo(&mut session, book_id, "kept");
    let gone = insert_todo(&mut session, book_id, "gone");
    let plugin = PluginRegistry::new().plugin(ViewId::Todo);
    plugin.delete(&mut session, gone).expect("delete");

    assert!(matches!(
        plugin.get(&session, gone),
        Err(StoreError::RecordNotFound)
    ));
    let (changes, current) = changes_since(&session, ViewId::Todo, None, 2).expect("changes");
    assert_eq!(current, 3);
    assert_eq!(ids(&changes), vec![gone]);
    assert_eq!(changes[0].status, ModifiedStatus::Deleted);
    assert_eq!(changes[0].version, 3);

    let purged = clean_after_sync(&mut session, book_id, current).expect("purge");
    assert_eq!(purged, 1);
    assert_eq!(session.current_version().expect("version"), current);
    let (changes, _) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert_eq!(ids(&changes), vec![kept]);
}

#[test]
fn rows_born_and_deleted_in_one_write_leave_no_trace() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::EveryAndDelete);
    let plugin = PluginRegistry::new().plugin(ViewId::Todo);

    session.begin().expect("begin");
    let id = insert_todo(&mut session, book_id, "scratch");
    plugin.delete(&mut session, id).expect("delete");
    session.end(true).expect("commit");

    assert_eq!(session.current_version().expect("version"), 1);
    let (changes, _) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert!(changes.is_empty());
}

#[test]
fn for_me_books_delete_without_ledger() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::ForMe);
    let id = insert_todo(&mut session, book_id, "private");
    PluginRegistry::new()
        .plugin(ViewId::Todo)
        .delete(&mut session, id)
        .expect("delete");
    let (changes, current) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert_eq!(current, 2);
    assert!(changes.is_empty());
}

#[test]
fn tombstones_are_purged_after_sync() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::EveryAndRemain);
    let plugin = PluginRegistry::new().plugin(ViewId::Todo);
    let id = insert_todo(&mut session, book_id, "old");
    plugin.delete(&mut session, id).expect("tombstone");

    // Remain books still hand out the tombstone itself.
    let tombstone = plugin.get(&session, id).expect("tombstone readable");
    assert_eq!(tombstone.as_todo().map(|todo| todo.is_deleted), Some(true));

    assert_eq!(clean_after_sync(&mut session, book_id, 1).expect("purge"), 0);
    assert_eq!(clean_after_sync(&mut session, book_id, 2).expect("purge"), 1);
    assert!(matches!(
        plugin.get(&session, id),
        Err(StoreError::RecordNotFound)
    ));
}

#[test]
fn deleting_a_synced_book_reports_its_records() {
    let sink = Arc::new(MemorySink::new());
    let mut session = StoreSession::open_in_memory()
        .expect("open store")
        .with_sink(sink.clone());
    let book_id = book(&mut session, SyncEvent::EveryAndRemain);
    let registry = PluginRegistry::new();
    let live = insert_todo(&mut session, book_id, "live");
    let tombstoned = insert_todo(&mut session, book_id, "tombstoned");
    registry
        .plugin(ViewId::Todo)
        .delete(&mut session, tombstoned)
        .expect("tombstone");
    let mut event = Event::new(book_id);
    event.start = Some(CalTime::Utime(1_700_000_000));
    let event_id = registry
        .plugin(ViewId::Event)
        .insert(&mut session, &event.into())
        .expect("insert event");
    assert_eq!(session.current_version().expect("version"), 4);
    let _ = sink.take();

    registry
        .plugin(ViewId::Book)
        .delete(&mut session, book_id)
        .expect("delete book");
    assert_eq!(session.current_version().expect("version"), 5);
    let notified = sink.take();
    assert!(notified.contains(&(RecordKind::Todo, 5)));
    assert!(notified.contains(&(RecordKind::Event, 5)));
    assert!(notified.contains(&(RecordKind::Book, 5)));

    let (todos, current) = changes_since(&session, ViewId::Todo, None, 1).expect("changes");
    assert_eq!(current, 5);
    assert_eq!(ids(&todos), vec![live, tombstoned]);
    assert!(todos.iter().all(|change| {
        change.status == ModifiedStatus::Deleted && change.version == 5
    }));
    let (events, _) =
        changes_since(&session, ViewId::Event, Some(book_id), 4).expect("event changes");
    assert_eq!(ids(&events), vec![event_id]);
    assert_eq!(events[0].status, ModifiedStatus::Deleted);

    assert_eq!(clean_after_sync(&mut session, book_id, 5).expect("purge"), 3);
    assert_eq!(session.current_version().expect("version"), 5);
    let (todos, _) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert!(todos.is_empty());
}

#[test]
fn deleting_a_for_me_book_bumps_without_ledger() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let registry = PluginRegistry::new();
    let empty = book(&mut session, SyncEvent::EveryAndDelete);
    registry
        .plugin(ViewId::Book)
        .delete(&mut session, empty)
        .expect("delete empty book");
    assert_eq!(session.current_version().expect("version"), 0);

    let book_id = book(&mut session, SyncEvent::ForMe);
    insert_todo(&mut session, book_id, "private");
    registry
        .plugin(ViewId::Book)
        .delete(&mut session, book_id)
        .expect("delete book");
    let (changes, current) = changes_since(&session, ViewId::Todo, None, 0).expect("changes");
    assert_eq!(current, 2);
    assert!(changes.is_empty());
}

#[test]
fn exceptions_have_their_own_feed() {
    let mut session = StoreSession::open_in_memory().expect("open store");
    let book_id = book(&mut session, SyncEvent::EveryAndRemain);
    let plugin = PluginRegistry::new().plugin(ViewId::Event);

    let mut parent = Event::new(book_id);
    parent.summary = Some("standup".to_string());
    parent.start = Some(CalTime::Utime(1_700_000_000));
    let parent_id = plugin.insert(&mut session, &parent.into()).expect("parent");

    let mut exception = Event::new(book_id);
    exception.summary = Some("standup moved".to_string());
    exception.start = Some(CalTime::Utime(1_700_003_600));
    exception.original_event_id = Some(parent_id);
    exception.recurrence_id = Some("20231114T221320Z".to_string());
    let exception_id = plugin
        .insert(&mut session, &exception.into())
        .expect("exception");

    let (changes, _) = changes_since(&session, ViewId::Event, None, 0).expect("changes");
    assert_eq!(ids(&changes), vec![parent_id]);
    let exceptions = changes_exception_since(&session, parent_id, 0).expect("exceptions");
    assert_eq!(ids(&exceptions), vec![exception_id]);
    assert_eq!(exceptions[0].status, ModifiedStatus::Inserted);

    plugin.delete(&mut session, parent_id).expect("delete parent");
    let exceptions = changes_exception_since(&session, parent_id, 2).expect("exceptions");
    assert_eq!(ids(&exceptions), vec![exception_id]);
    assert_eq!(exceptions[0].status, ModifiedStatus::Deleted);
    assert_eq!(exceptions[0].version, 3);
}

#[test]
fn feed_rejects_views_without_versions() {
    let session = StoreSession::open_in_memory().expect("open store");
    assert!(matches!(
        changes_since(&session, ViewId::Book, None, 0),
        Err(StoreError::InvalidParameter(_))
    ));
}
