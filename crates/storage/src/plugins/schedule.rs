#![forbid(unsafe_code)]

//! Events and todos. Both live in the `schedule` table, told apart by
//! `kind`, and share one plugin implementation.

use crate::access::{self, BookAccess};
use crate::driver::Driver;
use crate::error::StoreError;
use crate::instances;
use crate::plugins::children::{self, ChildWrite, flag_columns, load_children};
use crate::plugins::write::{self, column, int};
use crate::plugins::{RecordPlugin, now_secs, read};
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::codes::{StoreType, SyncEvent};
use calsvc_core::record::{ChildFlags, Children, Event, Todo};
use calsvc_core::{Fields, PropertyId, Record, RecordKind, Value, ViewId};
use rusqlite::types::Value as SqlValue;
use std::marker::PhantomData;

/// A record stored in the `schedule` table.
pub trait ScheduleEntry: Fields + Send + Sync + 'static {
    const KIND: RecordKind;
    const VIEW: ViewId;
    /// SQL view over every row of this kind, tombstones included.
    const SOURCE_ALL: &'static str;

    fn from_record(record: &Record) -> Option<&Self>;

    fn from_record_mut(record: &mut Record) -> Option<&mut Self>;

    fn book_id(&self) -> i32;

    fn children(&self) -> &Children;

    fn set_children(&mut self, children: Children);

    fn stored_in(store_type: StoreType) -> bool;

    /// Properties whose change invalidates expanded instances.
    fn affects_instances(_property: PropertyId) -> bool {
        false
    }
}

impl ScheduleEntry for Event {
    const KIND: RecordKind = RecordKind::Event;
    const VIEW: ViewId = ViewId::Event;
    const SOURCE_ALL: &'static str = "event_all";

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Event(event) => Some(event),
            _ => None,
        }
    }

    fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
        match record {
            Record::Event(event) => Some(event),
            _ => None,
        }
    }

    fn book_id(&self) -> i32 {
        self.calendar_book_id
    }

    fn children(&self) -> &Children {
        &self.children
    }

    fn set_children(&mut self, children: Children) {
        self.children = children;
    }

    fn stored_in(store_type: StoreType) -> bool {
        store_type.holds_events()
    }

    fn affects_instances(property: PropertyId) -> bool {
        matches!(property, PropertyId::Start | PropertyId::End)
    }
}

impl ScheduleEntry for Todo {
    const KIND: RecordKind = RecordKind::Todo;
    const VIEW: ViewId = ViewId::Todo;
    const SOURCE_ALL: &'static str = "todo_all";

    fn from_record(record: &Record) -> Option<&Self> {
        match record {
            Record::Todo(todo) => Some(todo),
            _ => None,
        }
    }

    fn from_record_mut(record: &mut Record) -> Option<&mut Self> {
        match record {
            Record::Todo(todo) => Some(todo),
            _ => None,
        }
    }

    fn book_id(&self) -> i32 {
        self.calendar_book_id
    }

    fn children(&self) -> &Children {
        &self.children
    }

    fn set_children(&mut self, children: Children) {
        self.children = children;
    }

    fn stored_in(store_type: StoreType) -> bool {
        store_type.holds_todos()
    }
}

pub struct SchedulePlugin<T> {
    entry: PhantomData<fn() -> T>,
}

pub type EventPlugin = SchedulePlugin<Event>;
pub type TodoPlugin = SchedulePlugin<Todo>;

impl<T> SchedulePlugin<T> {
    pub const fn new() -> Self {
        Self { entry: PhantomData }
    }
}

impl<T> Default for SchedulePlugin<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for SchedulePlugin<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulePlugin").finish()
    }
}

/// Row facts checked before an update or delete.
#[derive(Clone, Copy, Debug)]
struct Target {
    book_id: i32,
    created_version: i64,
}

fn locate(driver: &Driver, id: i32, kind: RecordKind) -> Result<Target, StoreError> {
    driver
        .query_optional(
            "SELECT calendar_id, created_ver FROM schedule \
             WHERE id = ? AND kind = ? AND is_deleted = 0",
            &[int(id), int(kind.as_i32())],
            |row| {
                Ok(Target {
                    book_id: row.get(0)?,
                    created_version: row.get(1)?,
                })
            },
        )?
        .ok_or(StoreError::RecordNotFound)
}

fn writable_book<T: ScheduleEntry>(
    session: &StoreSession,
    book_id: i32,
) -> Result<BookAccess, StoreError> {
    let book = access::load_book(session.driver(), book_id)?;
    if !T::stored_in(book.store_type) {
        return Err(StoreError::InvalidParameter(
            "calendar book does not hold this kind of record",
        ));
    }
    session.permission().check_book_write(&book)?;
    Ok(book)
}

fn entry<T: ScheduleEntry>(record: &Record) -> Result<&T, StoreError> {
    T::from_record(record).ok_or(StoreError::InvalidParameter(
        "record does not belong to this view",
    ))
}

fn flag_of(fields: &dyn Fields, property: PropertyId) -> bool {
    fields
        .value(property)
        .and_then(|value| value.as_i32())
        .is_some_and(|flag| flag != 0)
}

fn insert_entry<T: ScheduleEntry>(
    session: &mut StoreSession,
    entry: &T,
) -> Result<i32, StoreError> {
    writable_book::<T>(session, entry.book_id())?;
    let flags = entry.children().flags();
    let version = session.next_version()?;
    let now = now_secs();

    let driver = session.driver();
    let mut columns = write::full_columns(view_spec(T::VIEW), entry)?;
    columns.push(column("kind", int(T::KIND.as_i32())));
    columns.extend(flag_columns(flags));
    columns.extend([
        column("created_time", SqlValue::Integer(now)),
        column("last_mod", SqlValue::Integer(now)),
        column("created_ver", SqlValue::Integer(version)),
        column("changed_ver", SqlValue::Integer(version)),
        column("is_deleted", int(0)),
    ]);
    let id = write::insert_row(driver, "schedule", columns)?;
    children::insert_children(driver, id, T::KIND, entry.children(), ChildWrite::BestEffort)?;
    if T::KIND == RecordKind::Event {
        instances::refresh(session, id)?;
    }
    session.touch(T::KIND);
    Ok(id)
}

fn write_entry<T: ScheduleEntry>(
    session: &mut StoreSession,
    id: i32,
    entry: &T,
) -> Result<(), StoreError> {
    let target = locate(session.driver(), id, T::KIND)?;
    writable_book::<T>(session, target.book_id)?;

    let dirty = entry.dirty();
    let full = dirty.is_empty();
    if (full || dirty.contains(PropertyId::CalendarBookId)) && entry.book_id() != target.book_id {
        writable_book::<T>(session, entry.book_id())?;
    }

    let version = session.next_version()?;
    let extra = vec![
        column("changed_ver", SqlValue::Integer(version)),
        column("last_mod", SqlValue::Integer(now_secs())),
    ];
    write::apply_update(session.driver(), view_spec(T::VIEW), "schedule", id, entry, extra)?;

    if full {
        children::replace_children(session, id, T::KIND, entry.children())?;
    } else if T::KIND == RecordKind::Event && dirty.iter().any(T::affects_instances) {
        instances::refresh(session, id)?;
    }
    session.touch(T::KIND);
    Ok(())
}

fn delete_entry<T: ScheduleEntry>(session: &mut StoreSession, id: i32) -> Result<(), StoreError> {
    let target = locate(session.driver(), id, T::KIND)?;
    let book = writable_book::<T>(session, target.book_id)?;
    let version = session.next_version()?;
    let driver = session.driver();

    match book.sync_event {
        SyncEvent::EveryAndRemain => {
            // Exceptions follow their parent into the tombstone state.
            driver.execute(
                "UPDATE schedule SET is_deleted = 1, changed_ver = ?, last_mod = ? \
                 WHERE (id = ? OR original_event_id = ?) AND is_deleted = 0",
                &[
                    SqlValue::Integer(version),
                    SqlValue::Integer(now_secs()),
                    int(id),
                    int(id),
                ],
            )?;
        }
        SyncEvent::EveryAndDelete => {
            // Rows created inside this same write were never synced.
            if target.created_version < version {
                driver.execute(
                    "INSERT INTO deleted(schedule_id, schedule_type, calendar_id, \
                     original_event_id, created_ver, deleted_ver) \
                     SELECT id, kind, calendar_id, original_event_id, created_ver, ? \
                     FROM schedule \
                     WHERE (id = ? OR original_event_id = ?) AND is_deleted = 0 \
                     AND created_ver < ?",
                    &[
                        SqlValue::Integer(version),
                        int(id),
                        int(id),
                        SqlValue::Integer(version),
                    ],
                )?;
            }
            driver.execute("DELETE FROM schedule WHERE id = ?", &[int(id)])?;
        }
        SyncEvent::ForMe => {
            driver.execute("DELETE FROM schedule WHERE id = ?", &[int(id)])?;
        }
    }
    session.touch(T::KIND);
    Ok(())
}

impl<T: ScheduleEntry> RecordPlugin for SchedulePlugin<T> {
    fn view(&self) -> ViewId {
        T::VIEW
    }

    fn insert(&self, session: &mut StoreSession, record: &Record) -> Result<i32, StoreError> {
        let entry = entry::<T>(record)?;
        session.transaction(|session| insert_entry(session, entry))
    }

    fn get(&self, session: &StoreSession, id: i32) -> Result<Record, StoreError> {
        session.permission().check_read()?;
        let driver = session.driver();
        let mut record =
            read::select_by_id(driver, T::VIEW, view_spec(T::VIEW), T::SOURCE_ALL, id)?
                .ok_or(StoreError::RecordNotFound)?;
        if flag_of(record.fields(), PropertyId::IsDeleted) {
            let book_id = entry::<T>(&record)?.book_id();
            let book = access::load_book(driver, book_id)?;
            if book.sync_event != SyncEvent::EveryAndRemain {
                return Err(StoreError::RecordNotFound);
            }
        }
        self.hydrate(session, &mut record)?;
        Ok(record)
    }

    fn update(&self, session: &mut StoreSession, record: &Record) -> Result<(), StoreError> {
        let entry = entry::<T>(record)?;
        session.transaction(|session| write_entry(session, record.id(), entry))
    }

    fn replace(
        &self,
        session: &mut StoreSession,
        id: i32,
        record: &Record,
    ) -> Result<(), StoreError> {
        let entry = entry::<T>(record)?;
        session.transaction(|session| write_entry(session, id, entry))
    }

    fn delete(&self, session: &mut StoreSession, id: i32) -> Result<(), StoreError> {
        session.transaction(|session| delete_entry::<T>(session, id))
    }

    fn hydrate(&self, session: &StoreSession, record: &mut Record) -> Result<(), StoreError> {
        let Some(entry) = T::from_record_mut(record) else {
            return Ok(());
        };
        let id = entry
            .value(PropertyId::Id)
            .and_then(|value: Value| value.as_i32())
            .unwrap_or_default();
        if id <= 0 {
            return Ok(());
        }
        let fields: &dyn Fields = &*entry;
        let flags = ChildFlags {
            has_alarm: flag_of(fields, PropertyId::HasAlarm),
            has_attendee: flag_of(fields, PropertyId::HasAttendee),
            has_rrule: flag_of(fields, PropertyId::HasRrule),
            has_extended: flag_of(fields, PropertyId::HasExtended),
        };
        let children = load_children(session.driver(), id, T::KIND, flags)?;
        entry.set_children(children);
        Ok(())
    }
}
