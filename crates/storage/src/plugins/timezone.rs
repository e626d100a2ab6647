#![forbid(unsafe_code)]

use crate::access;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::plugins::write::{self, int};
use crate::plugins::{RecordPlugin, read};
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::record::Timezone;
use calsvc_core::{Fields, PropertyId, Record, RecordKind, ViewId};

const TABLE: &str = "timezone";

/// Timezone definitions scoped to a calendar book.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimezonePlugin;

fn timezone(record: &Record) -> Result<&Timezone, StoreError> {
    match record {
        Record::Timezone(timezone) => Ok(timezone),
        _ => Err(StoreError::InvalidParameter("record is not a timezone")),
    }
}

fn owning_book(driver: &Driver, id: i32) -> Result<i32, StoreError> {
    driver
        .query_optional(
            "SELECT calendar_id FROM timezone WHERE id = ?",
            &[int(id)],
            |row| row.get::<_, i32>(0),
        )?
        .ok_or(StoreError::RecordNotFound)
}

fn check_book(session: &StoreSession, book_id: i32) -> Result<(), StoreError> {
    let book = access::load_book(session.driver(), book_id)?;
    session.permission().check_book_write(&book)
}

fn write_timezone(
    session: &mut StoreSession,
    id: i32,
    timezone: &Timezone,
) -> Result<(), StoreError> {
    check_book(session, owning_book(session.driver(), id)?)?;
    let dirty = timezone.dirty();
    if dirty.is_empty() || dirty.contains(PropertyId::CalendarBookId) {
        check_book(session, timezone.calendar_book_id)?;
    }
    write::apply_update(
        session.driver(),
        view_spec(ViewId::Timezone),
        TABLE,
        id,
        timezone,
        Vec::new(),
    )?;
    session.touch(RecordKind::Timezone);
    Ok(())
}

impl RecordPlugin for TimezonePlugin {
    fn view(&self) -> ViewId {
        ViewId::Timezone
    }

    fn insert(&self, session: &mut StoreSession, record: &Record) -> Result<i32, StoreError> {
        let timezone = timezone(record)?;
        session.transaction(|session| {
            check_book(session, timezone.calendar_book_id)?;
            let columns = write::full_columns(view_spec(ViewId::Timezone), timezone)?;
            let id = write::insert_row(session.driver(), TABLE, columns)?;
            session.touch(RecordKind::Timezone);
            Ok(id)
        })
    }

    fn get(&self, session: &StoreSession, id: i32) -> Result<Record, StoreError> {
        session.permission().check_read()?;
        let spec = view_spec(ViewId::Timezone);
        read::select_by_id(session.driver(), ViewId::Timezone, spec, spec.source, id)?
            .ok_or(StoreError::RecordNotFound)
    }

    fn update(&self, session: &mut StoreSession, record: &Record) -> Result<(), StoreError> {
        let timezone = timezone(record)?;
        session.transaction(|session| write_timezone(session, timezone.id, timezone))
    }

    fn replace(
        &self,
        session: &mut StoreSession,
        id: i32,
        record: &Record,
    ) -> Result<(), StoreError> {
        let timezone = timezone(record)?;
        session.transaction(|session| write_timezone(session, id, timezone))
    }

    fn delete(&self, session: &mut StoreSession, id: i32) -> Result<(), StoreError> {
        session.transaction(|session| {
            check_book(session, owning_book(session.driver(), id)?)?;
            session
                .driver()
                .execute("DELETE FROM timezone WHERE id = ?", &[int(id)])?;
            session.touch(RecordKind::Timezone);
            Ok(())
        })
    }
}
