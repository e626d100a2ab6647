#![forbid(unsafe_code)]

//! Child collections of events and todos: alarms, attendees, the
//! recurrence rule and extended properties.
//!
//! Children are never diffed. Rewriting them deletes every child row of
//! the owner and inserts the new collection.

use crate::access;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::instances;
use crate::plugins::read::select_owned;
use crate::plugins::write::{self, Column, column, full_columns, int};
use crate::plugins::now_secs;
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::caltime::{CalTime, TYPE_LOCALTIME, TYPE_UTIME};
use calsvc_core::codes::Frequency;
use calsvc_core::record::{
    Alarm, Attendee, ChildFlags, Children, ExtendedProperty, RecurrenceRange, Rrule,
};
use calsvc_core::{
    AttributeFilter, CompositeFilter, NumericOp, PropertyId, Record, RecordKind, ViewId,
};
use rusqlite::types::Value as SqlValue;
use tracing::warn;

const RANGE_ENDLESS: i64 = 0;
const RANGE_UNTIL: i64 = 1;
const RANGE_COUNT: i64 = 2;

/// How failures of alarm and attendee rows are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChildWrite {
    /// Log and continue; the owner row is kept.
    BestEffort,
    Strict,
}

/// Replaces every child row of an event or todo with `children` and
/// refreshes the owner's cached has-* flags.
///
/// The owner is stamped with the current write version, and its instances
/// are regenerated when it is an event.
pub fn replace_children(
    session: &mut StoreSession,
    owner_id: i32,
    kind: RecordKind,
    children: &Children,
) -> Result<ChildFlags, StoreError> {
    if !matches!(kind, RecordKind::Event | RecordKind::Todo) {
        return Err(StoreError::InvalidParameter(
            "only events and todos own child collections",
        ));
    }
    session.transaction(|session| {
        let book_id = owner_book(session.driver(), owner_id, kind)?;
        let book = access::load_book(session.driver(), book_id)?;
        session.permission().check_book_write(&book)?;

        let version = session.next_version()?;
        let driver = session.driver();
        delete_children(driver, owner_id, kind)?;
        insert_children(driver, owner_id, kind, children, ChildWrite::Strict)?;
        let flags = children.flags();
        let mut columns = flag_columns(flags);
        columns.push(column("changed_ver", SqlValue::Integer(version)));
        columns.push(column("last_mod", SqlValue::Integer(now_secs())));
        write::update_row(driver, "schedule", owner_id, columns)?;
        if kind == RecordKind::Event {
            instances::refresh(session, owner_id)?;
        }
        session.touch(kind);
        Ok(flags)
    })
}

fn owner_book(driver: &Driver, owner_id: i32, kind: RecordKind) -> Result<i32, StoreError> {
    driver
        .query_optional(
            "SELECT calendar_id FROM schedule WHERE id = ? AND kind = ? AND is_deleted = 0",
            &[int(owner_id), int(kind.as_i32())],
            |row| row.get::<_, i32>(0),
        )?
        .ok_or(StoreError::RecordNotFound)
}

pub(crate) fn flag_columns(flags: ChildFlags) -> Vec<Column> {
    vec![
        column("has_alarm", int(flags.has_alarm)),
        column("has_attendee", int(flags.has_attendee)),
        column("has_rrule", int(flags.has_rrule)),
        column("has_extended", int(flags.has_extended)),
    ]
}

pub(crate) fn delete_children(
    driver: &Driver,
    owner_id: i32,
    kind: RecordKind,
) -> Result<(), StoreError> {
    let owner = [int(owner_id)];
    driver.execute("DELETE FROM rrule WHERE event_id = ?", &owner)?;
    driver.execute("DELETE FROM alarm WHERE event_id = ?", &owner)?;
    driver.execute("DELETE FROM attendee WHERE event_id = ?", &owner)?;
    driver.execute(
        "DELETE FROM extended WHERE record_id = ? AND record_type = ?",
        &[int(owner_id), int(kind.as_i32())],
    )?;
    Ok(())
}

pub(crate) fn insert_children(
    driver: &Driver,
    owner_id: i32,
    kind: RecordKind,
    children: &Children,
    mode: ChildWrite,
) -> Result<(), StoreError> {
    if let Some(rrule) = children.rrule.as_ref().filter(|rule| rule.freq != Frequency::None) {
        insert_rrule(driver, owner_id, rrule)?;
    }

    for alarm in &children.alarms {
        let result = full_columns(view_spec(ViewId::Alarm), alarm).and_then(|mut columns| {
            set_owner(&mut columns, "event_id", owner_id);
            write::insert_row(driver, "alarm", columns)
        });
        tolerate(result, mode, "alarm")?;
    }

    for attendee in &children.attendees {
        let result = full_columns(view_spec(ViewId::Attendee), attendee).and_then(|mut columns| {
            set_owner(&mut columns, "event_id", owner_id);
            write::insert_row(driver, "attendee", columns)
        });
        tolerate(result, mode, "attendee")?;
    }

    for property in &children.extended {
        insert_extended(driver, owner_id, kind, property)?;
    }
    Ok(())
}

pub(crate) fn insert_extended(
    driver: &Driver,
    record_id: i32,
    kind: RecordKind,
    property: &ExtendedProperty,
) -> Result<i32, StoreError> {
    let mut columns = full_columns(view_spec(ViewId::Extended), property)?;
    set_owner(&mut columns, "record_id", record_id);
    set_owner(&mut columns, "record_type", kind.as_i32());
    write::insert_row(driver, "extended", columns)
}

fn set_owner(columns: &mut [Column], name: &str, value: i32) {
    for (column, slot) in columns.iter_mut() {
        if column == name {
            *slot = int(value);
        }
    }
}

fn tolerate(
    result: Result<i32, StoreError>,
    mode: ChildWrite,
    child: &str,
) -> Result<(), StoreError> {
    match (result, mode) {
        (Ok(_), _) => Ok(()),
        (Err(err), ChildWrite::BestEffort) => {
            warn!(child, error = %err, "child row not written");
            Ok(())
        }
        (Err(err), ChildWrite::Strict) => Err(err),
    }
}

fn insert_rrule(driver: &Driver, owner_id: i32, rrule: &Rrule) -> Result<(), StoreError> {
    let (range_type, until, count) = match rrule.range {
        RecurrenceRange::Endless => (RANGE_ENDLESS, None, 0),
        RecurrenceRange::Until(until) => (RANGE_UNTIL, Some(until), 0),
        RecurrenceRange::Count(count) => (RANGE_COUNT, None, count),
    };
    let (until_type, until_utime, until_datetime) = match until {
        None => (SqlValue::Null, SqlValue::Null, SqlValue::Null),
        Some(CalTime::Utime(utime)) => (int(TYPE_UTIME), SqlValue::Integer(utime), SqlValue::Null),
        Some(CalTime::LocalTime(local)) => (
            int(TYPE_LOCALTIME),
            SqlValue::Null,
            SqlValue::Text(local.to_db_string()),
        ),
    };
    let text = |value: &Option<String>| value.clone().map_or(SqlValue::Null, SqlValue::Text);
    driver.execute(
        "INSERT INTO rrule(event_id, freq, rrule_interval, range_type, until_type, until_utime, \
         until_datetime, count, byday, bymonthday, bymonth, wkst) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        &[
            int(owner_id),
            int(rrule.freq.code()),
            int(rrule.interval.max(1)),
            SqlValue::Integer(range_type),
            until_type,
            until_utime,
            until_datetime,
            int(count),
            text(&rrule.by_day),
            text(&rrule.by_month_day),
            text(&rrule.by_month),
            int(rrule.wkst),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_rrule(driver: &Driver, owner_id: i32) -> Result<Option<Rrule>, StoreError> {
    driver.query_optional(
        "SELECT freq, rrule_interval, range_type, until_type, until_utime, until_datetime, \
         count, byday, bymonthday, bymonth, wkst FROM rrule WHERE event_id = ? \
         ORDER BY id LIMIT 1",
        &[int(owner_id)],
        |row| {
            let range_type: i64 = row.get(2)?;
            let until = CalTime::from_columns(
                row.get(3)?,
                row.get(4)?,
                row.get::<_, Option<String>>(5)?.as_deref(),
            );
            let range = match (range_type, until) {
                (RANGE_UNTIL, Some(until)) => RecurrenceRange::Until(until),
                (RANGE_COUNT, _) => RecurrenceRange::Count(row.get(6)?),
                _ => RecurrenceRange::Endless,
            };
            Ok(Rrule {
                freq: Frequency::from_code(row.get(0)?),
                interval: row.get(1)?,
                range,
                by_day: row.get(7)?,
                by_month_day: row.get(8)?,
                by_month: row.get(9)?,
                wkst: row.get(10)?,
            })
        },
    )
}

/// Reads the children of one owner; each collection is only queried
/// when its cached flag says it exists.
pub(crate) fn load_children(
    driver: &Driver,
    owner_id: i32,
    kind: RecordKind,
    flags: ChildFlags,
) -> Result<Children, StoreError> {
    let mut children = Children::default();
    let owned_by =
        |property: PropertyId| AttributeFilter::int(property, NumericOp::Equal, owner_id);

    if flags.has_rrule {
        children.rrule = load_rrule(driver, owner_id)?;
    }
    if flags.has_alarm {
        children.alarms = select_owned(
            driver,
            ViewId::Alarm,
            view_spec(ViewId::Alarm),
            owned_by(PropertyId::ParentId).into(),
        )?
        .into_iter()
        .filter_map(|record| match record {
            Record::Alarm(alarm) => Some(alarm),
            _ => None,
        })
        .collect::<Vec<Alarm>>();
    }
    if flags.has_attendee {
        children.attendees = select_owned(
            driver,
            ViewId::Attendee,
            view_spec(ViewId::Attendee),
            owned_by(PropertyId::ParentId).into(),
        )?
        .into_iter()
        .filter_map(|record| match record {
            Record::Attendee(attendee) => Some(attendee),
            _ => None,
        })
        .collect::<Vec<Attendee>>();
    }
    if flags.has_extended {
        let filter = CompositeFilter::with(owned_by(PropertyId::RecordId)).and(AttributeFilter::int(
            PropertyId::RecordType,
            NumericOp::Equal,
            kind.as_i32(),
        ));
        children.extended = select_owned(
            driver,
            ViewId::Extended,
            view_spec(ViewId::Extended),
            filter.into(),
        )?
        .into_iter()
        .filter_map(|record| match record {
            Record::Extended(property) => Some(property),
            _ => None,
        })
        .collect();
    }
    Ok(children)
}
