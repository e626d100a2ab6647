#![forbid(unsafe_code)]

//! Standalone extended properties. Rows owned by an event or todo keep the
//! owner's `has_extended` flag in step.

use crate::access;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::plugins::children::insert_extended;
use crate::plugins::write::{self, int};
use crate::plugins::{RecordPlugin, read};
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::record::ExtendedProperty;
use calsvc_core::{Record, RecordKind, ViewId};

#[derive(Clone, Copy, Debug, Default)]
pub struct ExtendedPlugin;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Owner {
    record_id: i32,
    kind: Option<RecordKind>,
}

impl Owner {
    fn is_schedule(&self) -> bool {
        matches!(self.kind, Some(RecordKind::Event | RecordKind::Todo))
    }
}

fn property(record: &Record) -> Result<&ExtendedProperty, StoreError> {
    match record {
        Record::Extended(property) => Ok(property),
        _ => Err(StoreError::InvalidParameter("record is not an extended property")),
    }
}

fn stored_owner(driver: &Driver, id: i32) -> Result<Owner, StoreError> {
    driver
        .query_optional(
            "SELECT record_id, record_type FROM extended WHERE id = ?",
            &[int(id)],
            |row| {
                Ok(Owner {
                    record_id: row.get(0)?,
                    kind: RecordKind::from_i32(row.get(1)?),
                })
            },
        )?
        .ok_or(StoreError::RecordNotFound)
}

/// Write access to the book behind the owner, when the owner is a book,
/// event or todo.
fn check_owner(session: &StoreSession, owner: Owner) -> Result<(), StoreError> {
    let book_id = match owner.kind {
        Some(RecordKind::Book) => Some(owner.record_id),
        Some(RecordKind::Event | RecordKind::Todo) => session.driver().query_optional(
            "SELECT calendar_id FROM schedule WHERE id = ? AND is_deleted = 0",
            &[int(owner.record_id)],
            |row| row.get::<_, i32>(0),
        )?,
        _ => None,
    };
    match book_id {
        Some(book_id) => {
            let book = access::load_book(session.driver(), book_id)?;
            session.permission().check_book_write(&book)
        }
        None => session.permission().check_write(),
    }
}

fn sync_flag(driver: &Driver, owner: Owner) -> Result<(), StoreError> {
    if !owner.is_schedule() {
        return Ok(());
    }
    let kind = owner.kind.map_or(0, RecordKind::as_i32);
    driver.execute(
        "UPDATE schedule SET has_extended = EXISTS(\
         SELECT 1 FROM extended WHERE record_id = ? AND record_type = ?) \
         WHERE id = ?",
        &[int(owner.record_id), int(kind), int(owner.record_id)],
    )?;
    Ok(())
}

fn write_property(
    session: &mut StoreSession,
    id: i32,
    property: &ExtendedProperty,
) -> Result<(), StoreError> {
    let before = stored_owner(session.driver(), id)?;
    check_owner(session, before)?;
    write::apply_update(
        session.driver(),
        view_spec(ViewId::Extended),
        "extended",
        id,
        property,
        Vec::new(),
    )?;
    let after = stored_owner(session.driver(), id)?;
    if after != before {
        check_owner(session, after)?;
        sync_flag(session.driver(), before)?;
        sync_flag(session.driver(), after)?;
    }
    session.touch(RecordKind::Extended);
    Ok(())
}

impl RecordPlugin for ExtendedPlugin {
    fn view(&self) -> ViewId {
        ViewId::Extended
    }

    fn insert(&self, session: &mut StoreSession, record: &Record) -> Result<i32, StoreError> {
        let property = property(record)?;
        let kind = RecordKind::from_i32(property.record_type)
            .ok_or(StoreError::InvalidParameter("unknown owner record type"))?;
        let owner = Owner {
            record_id: property.record_id,
            kind: Some(kind),
        };
        session.transaction(|session| {
            check_owner(session, owner)?;
            let id = insert_extended(session.driver(), owner.record_id, kind, property)?;
            sync_flag(session.driver(), owner)?;
            session.touch(RecordKind::Extended);
            Ok(id)
        })
    }

    fn get(&self, session: &StoreSession, id: i32) -> Result<Record, StoreError> {
        session.permission().check_read()?;
        let spec = view_spec(ViewId::Extended);
        read::select_by_id(session.driver(), ViewId::Extended, spec, spec.source, id)?
            .ok_or(StoreError::RecordNotFound)
    }

    fn update(&self, session: &mut StoreSession, record: &Record) -> Result<(), StoreError> {
        let property = property(record)?;
        session.transaction(|session| write_property(session, property.id, property))
    }

    fn replace(
        &self,
        session: &mut StoreSession,
        id: i32,
        record: &Record,
    ) -> Result<(), StoreError> {
        let property = property(record)?;
        session.transaction(|session| write_property(session, id, property))
    }

    fn delete(&self, session: &mut StoreSession, id: i32) -> Result<(), StoreError> {
        session.transaction(|session| {
            let owner = stored_owner(session.driver(), id)?;
            check_owner(session, owner)?;
            session
                .driver()
                .execute("DELETE FROM extended WHERE id = ?", &[int(id)])?;
            sync_flag(session.driver(), owner)?;
            session.touch(RecordKind::Extended);
            Ok(())
        })
    }
}
