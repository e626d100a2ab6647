#![forbid(unsafe_code)]

//! Calendar books. Book writes queue a change notification but carry no
//! version stamp, so they never move the version counter. Deleting a book
//! that still holds events or todos is the exception: their removal is a
//! versioned change like any other delete.

use crate::access::{self, BookAccess};
use crate::driver::Driver;
use crate::error::StoreError;
use crate::plugins::write::{self, int};
use crate::plugins::{RecordPlugin, read};
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::codes::SyncEvent;
use calsvc_core::record::CalendarBook;
use calsvc_core::{Record, RecordKind, ViewId};
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeSet;

const TABLE: &str = "calendar_book";

#[derive(Clone, Copy, Debug, Default)]
pub struct BookPlugin;

fn book(record: &Record) -> Result<&CalendarBook, StoreError> {
    record
        .as_book()
        .ok_or(StoreError::InvalidParameter("record is not a calendar book"))
}

fn existing_book(driver: &Driver, id: i32) -> Result<BookAccess, StoreError> {
    match access::load_book(driver, id) {
        Err(StoreError::InvalidParameter(_)) => Err(StoreError::RecordNotFound),
        other => other,
    }
}

fn write_book(
    session: &mut StoreSession,
    id: i32,
    book: &CalendarBook,
) -> Result<(), StoreError> {
    let existing = existing_book(session.driver(), id)?;
    session.permission().check_book_write(&existing)?;
    write::apply_update(
        session.driver(),
        view_spec(ViewId::Book),
        TABLE,
        id,
        book,
        Vec::new(),
    )?;
    session.touch(RecordKind::Book);
    Ok(())
}

/// Record kinds with rows in the book, tombstones included.
fn held_kinds(driver: &Driver, id: i32) -> Result<BTreeSet<RecordKind>, StoreError> {
    let kinds = driver.query(
        "SELECT DISTINCT kind FROM schedule WHERE calendar_id = ?",
        &[int(id)],
        |row| row.get::<_, i32>(0),
    )?;
    Ok(kinds.into_iter().filter_map(RecordKind::from_i32).collect())
}

/// Every schedule row of the book leaves through the ledger, since the
/// book's removal takes its tombstones with it. Rows created by this same
/// write were never synced.
fn ledger_book_rows(driver: &Driver, id: i32, version: i64) -> Result<usize, StoreError> {
    driver.execute(
        "INSERT INTO deleted(schedule_id, schedule_type, calendar_id, \
         original_event_id, created_ver, deleted_ver) \
         SELECT id, kind, calendar_id, original_event_id, created_ver, ? \
         FROM schedule WHERE calendar_id = ? AND created_ver < ?",
        &[
            SqlValue::Integer(version),
            int(id),
            SqlValue::Integer(version),
        ],
    )
}

impl RecordPlugin for BookPlugin {
    fn view(&self) -> ViewId {
        ViewId::Book
    }

    fn insert(&self, session: &mut StoreSession, record: &Record) -> Result<i32, StoreError> {
        let book = book(record)?;
        session.permission().check_write()?;
        session.transaction(|session| {
            let columns = write::full_columns(view_spec(ViewId::Book), book)?;
            let id = write::insert_row(session.driver(), TABLE, columns)?;
            session.touch(RecordKind::Book);
            Ok(id)
        })
    }

    fn get(&self, session: &StoreSession, id: i32) -> Result<Record, StoreError> {
        session.permission().check_read()?;
        let spec = view_spec(ViewId::Book);
        read::select_by_id(session.driver(), ViewId::Book, spec, spec.source, id)?
            .ok_or(StoreError::RecordNotFound)
    }

    fn update(&self, session: &mut StoreSession, record: &Record) -> Result<(), StoreError> {
        let book = book(record)?;
        session.transaction(|session| write_book(session, book.id, book))
    }

    fn replace(
        &self,
        session: &mut StoreSession,
        id: i32,
        record: &Record,
    ) -> Result<(), StoreError> {
        let book = book(record)?;
        session.transaction(|session| write_book(session, id, book))
    }

    /// Removes the book with its events, todos and timezones. Unless the
    /// book syncs "for me", the removed events and todos are recorded in
    /// the ledger so the change feed still reports them; those entries
    /// outlive the book until `clean_after_sync` purges them.
    fn delete(&self, session: &mut StoreSession, id: i32) -> Result<(), StoreError> {
        session.transaction(|session| {
            let existing = existing_book(session.driver(), id)?;
            session.permission().check_book_write(&existing)?;
            let kinds = held_kinds(session.driver(), id)?;
            if !kinds.is_empty() {
                let version = session.next_version()?;
                if existing.sync_event != SyncEvent::ForMe {
                    ledger_book_rows(session.driver(), id, version)?;
                }
                for kind in kinds {
                    session.touch(kind);
                }
            }
            session
                .driver()
                .execute("DELETE FROM calendar_book WHERE id = ?", &[int(id)])?;
            session.touch(RecordKind::Book);
            Ok(())
        })
    }
}
