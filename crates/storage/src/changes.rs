#![forbid(unsafe_code)]

//! Version-indexed change feed over events and todos.
//!
//! Live rows and tombstones come from `schedule`; hard-deleted rows come
//! from the `deleted` ledger. Both are filtered through the query compiler
//! like any other view.

use crate::access;
use crate::compiler::compile;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::session::StoreSession;
use crate::views::{DELETED_LEDGER, SCHEDULE_FEED, ViewSpec};
use calsvc_core::codes::ModifiedStatus;
use calsvc_core::record::ChangeRecord;
use calsvc_core::{
    AttributeFilter, CompositeFilter, Filter, NumericOp, PropertyId, RecordKind, ViewId,
};
use tracing::debug;

/// One feed row before its status is decided.
#[derive(Clone, Copy, Debug)]
struct FeedRow {
    id: i32,
    kind: i32,
    book_id: i32,
    created_version: i64,
    version: i64,
    deleted: bool,
}

impl FeedRow {
    fn into_change(self, since: i64) -> Option<ChangeRecord> {
        let status = if self.deleted {
            ModifiedStatus::Deleted
        } else if self.created_version > since {
            ModifiedStatus::Inserted
        } else {
            ModifiedStatus::Updated
        };
        Some(ChangeRecord {
            kind: RecordKind::from_i32(self.kind)?,
            id: self.id,
            calendar_book_id: self.book_id,
            version: self.version,
            status,
        })
    }
}

const FEED_COLUMNS: [PropertyId; 6] = [
    PropertyId::Id,
    PropertyId::RecordType,
    PropertyId::CalendarBookId,
    PropertyId::CreatedVersion,
    PropertyId::ChangedVersion,
    PropertyId::IsDeleted,
];

const LEDGER_COLUMNS: [PropertyId; 5] = [
    PropertyId::Id,
    PropertyId::RecordType,
    PropertyId::CalendarBookId,
    PropertyId::CreatedVersion,
    PropertyId::DeletedVersion,
];

/// Changes of `view`'s record kind committed after `since`, optionally
/// restricted to one calendar book, ordered by version then id. Also
/// returns the current version, the next `since` for the caller.
///
/// Exceptions are left out; they are reported by
/// [`changes_exception_since`] against their original event.
pub fn changes_since(
    session: &StoreSession,
    view: ViewId,
    book_id: Option<i32>,
    since: i64,
) -> Result<(Vec<ChangeRecord>, i64), StoreError> {
    session.permission().check_read()?;
    let kind = view.record_kind();
    if !matches!(kind, RecordKind::Event | RecordKind::Todo) {
        return Err(StoreError::InvalidParameter(
            "change feed covers events and todos only",
        ));
    }
    let current = session.current_version()?;

    let scope = |version: PropertyId| {
        let mut filter = CompositeFilter::with(AttributeFilter::int(
            PropertyId::RecordType,
            NumericOp::Equal,
            kind.as_i32(),
        ))
        .and(AttributeFilter::int64(version, NumericOp::GreaterThan, since))
        .and(AttributeFilter::int(
            PropertyId::OriginalEventId,
            NumericOp::None,
            0,
        ));
        if let Some(book_id) = book_id {
            filter = filter.and(AttributeFilter::int(
                PropertyId::CalendarBookId,
                NumericOp::Equal,
                book_id,
            ));
        }
        Filter::from(filter)
    };

    let driver = session.driver();
    let mut rows = feed_rows(driver, &scope(PropertyId::ChangedVersion))?;
    rows.extend(ledger_rows(driver, &scope(PropertyId::DeletedVersion))?);
    Ok((collect(rows, since), current))
}

/// Changes of the exceptions that belong to `original_id`, committed after
/// `since`.
pub fn changes_exception_since(
    session: &StoreSession,
    original_id: i32,
    since: i64,
) -> Result<Vec<ChangeRecord>, StoreError> {
    session.permission().check_read()?;
    let scope = |version: PropertyId| {
        Filter::from(
            CompositeFilter::with(AttributeFilter::int(
                PropertyId::OriginalEventId,
                NumericOp::Equal,
                original_id,
            ))
            .and(AttributeFilter::int64(version, NumericOp::GreaterThan, since)),
        )
    };
    let driver = session.driver();
    let mut rows = feed_rows(driver, &scope(PropertyId::ChangedVersion))?;
    rows.extend(ledger_rows(driver, &scope(PropertyId::DeletedVersion))?);
    Ok(collect(rows, since))
}

/// Purges what synchronizing clients have acknowledged up to `version` in
/// one book: tombstoned rows (their children go with them) and ledger
/// entries. A book that was deleted meanwhile only has ledger entries
/// left. Does not move the version counter. Returns the number of rows
/// removed from both tables.
pub fn clean_after_sync(
    session: &mut StoreSession,
    book_id: i32,
    version: i64,
) -> Result<usize, StoreError> {
    session.transaction(|session| {
        match access::load_book(session.driver(), book_id) {
            Ok(book) => session.permission().check_book_write(&book)?,
            Err(StoreError::InvalidParameter(_)) => session.permission().check_write()?,
            Err(err) => return Err(err),
        }

        let acknowledged = |version_property: PropertyId| {
            CompositeFilter::with(AttributeFilter::int(
                PropertyId::CalendarBookId,
                NumericOp::Equal,
                book_id,
            ))
            .and(AttributeFilter::int64(
                version_property,
                NumericOp::LessOrEqual,
                version,
            ))
        };
        let tombstones = Filter::from(acknowledged(PropertyId::ChangedVersion).and(
            AttributeFilter::int(PropertyId::IsDeleted, NumericOp::Equal, 1),
        ));
        let ledger = Filter::from(acknowledged(PropertyId::DeletedVersion));

        let driver = session.driver();
        let purged = purge(driver, &SCHEDULE_FEED, &tombstones)?
            + purge(driver, &DELETED_LEDGER, &ledger)?;
        debug!(book_id, version, purged, "purged acknowledged deletions");
        Ok(purged)
    })
}

fn purge(driver: &Driver, spec: &ViewSpec, filter: &Filter) -> Result<usize, StoreError> {
    let compiled = compile(spec, Some(filter), &[], None)?;
    let sql = format!("DELETE FROM {} WHERE {}", spec.source, compiled.where_clause);
    debug!(sql = %sql, "compiled purge");
    driver.execute(&sql, &compiled.params)
}

fn feed_rows(driver: &Driver, filter: &Filter) -> Result<Vec<FeedRow>, StoreError> {
    let compiled = compile(&SCHEDULE_FEED, Some(filter), &FEED_COLUMNS, None)?;
    let sql = compiled.select_sql(SCHEDULE_FEED.source, false, 0, 0);
    debug!(sql = %sql, "compiled change feed");
    driver.query(&sql, &compiled.params, |row| {
        Ok(FeedRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            book_id: row.get(2)?,
            created_version: row.get(3)?,
            version: row.get(4)?,
            deleted: row.get(5)?,
        })
    })
}

fn ledger_rows(driver: &Driver, filter: &Filter) -> Result<Vec<FeedRow>, StoreError> {
    let compiled = compile(&DELETED_LEDGER, Some(filter), &LEDGER_COLUMNS, None)?;
    let sql = compiled.select_sql(DELETED_LEDGER.source, false, 0, 0);
    debug!(sql = %sql, "compiled deletion ledger");
    driver.query(&sql, &compiled.params, |row| {
        Ok(FeedRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            book_id: row.get(2)?,
            created_version: row.get(3)?,
            version: row.get(4)?,
            deleted: true,
        })
    })
}

fn collect(rows: Vec<FeedRow>, since: i64) -> Vec<ChangeRecord> {
    let mut changes: Vec<ChangeRecord> = rows
        .into_iter()
        .filter_map(|row| row.into_change(since))
        .collect();
    changes.sort_by_key(|change| (change.version, change.id));
    changes
}
