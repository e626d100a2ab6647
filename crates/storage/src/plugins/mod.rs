#![forbid(unsafe_code)]

//! Record-type plugins: one fixed operation set per view.
//!
//! Single writes run inside a (possibly nested) session transaction. Bulk
//! calls are plain loops over the single operation; without an enclosing
//! transaction, records applied before a failure stay applied.

mod book;
pub mod children;
mod extended;
mod query_only;
pub(crate) mod read;
mod schedule;
mod timezone;
pub(crate) mod write;

pub use book::BookPlugin;
pub use children::replace_children;
pub use extended::ExtendedPlugin;
pub use query_only::QueryOnlyPlugin;
pub use schedule::{EventPlugin, ScheduleEntry, SchedulePlugin, TodoPlugin};
pub use timezone::TimezonePlugin;

use crate::error::{BulkError, StoreError};
use crate::session::StoreSession;
use crate::views::view_spec;
use calsvc_core::{Query, Record, ViewId};

pub(crate) const QUERY_ONLY: StoreError =
    StoreError::InvalidParameter("view is query-only and cannot be modified");

pub trait RecordPlugin: Send + Sync {
    fn view(&self) -> ViewId;

    /// Inserts `record` and returns the id the store assigned.
    fn insert(&self, _session: &mut StoreSession, _record: &Record) -> Result<i32, StoreError> {
        Err(QUERY_ONLY)
    }

    fn get(&self, _session: &StoreSession, _id: i32) -> Result<Record, StoreError> {
        Err(QUERY_ONLY)
    }

    /// Writes `record` over the row with the same id: only its dirty
    /// properties when any are marked, every column and child otherwise.
    fn update(&self, _session: &mut StoreSession, _record: &Record) -> Result<(), StoreError> {
        Err(QUERY_ONLY)
    }

    /// Same as `update`, against an explicit target id.
    fn replace(
        &self,
        _session: &mut StoreSession,
        _id: i32,
        _record: &Record,
    ) -> Result<(), StoreError> {
        Err(QUERY_ONLY)
    }

    fn delete(&self, _session: &mut StoreSession, _id: i32) -> Result<(), StoreError> {
        Err(QUERY_ONLY)
    }

    fn insert_all(
        &self,
        session: &mut StoreSession,
        records: &[Record],
    ) -> Result<Vec<i32>, BulkError> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            match self.insert(session, record) {
                Ok(id) => ids.push(id),
                Err(error) => {
                    return Err(BulkError {
                        error,
                        completed: ids,
                    });
                }
            }
        }
        Ok(ids)
    }

    fn update_all(&self, session: &mut StoreSession, records: &[Record]) -> Result<(), BulkError> {
        let mut done = Vec::with_capacity(records.len());
        for record in records {
            if let Err(error) = self.update(session, record) {
                return Err(BulkError {
                    error,
                    completed: done,
                });
            }
            done.push(record.id());
        }
        Ok(())
    }

    fn replace_all(
        &self,
        session: &mut StoreSession,
        records: &[(i32, Record)],
    ) -> Result<(), BulkError> {
        let mut done = Vec::with_capacity(records.len());
        for (id, record) in records {
            if let Err(error) = self.replace(session, *id, record) {
                return Err(BulkError {
                    error,
                    completed: done,
                });
            }
            done.push(*id);
        }
        Ok(())
    }

    fn delete_all(&self, session: &mut StoreSession, ids: &[i32]) -> Result<(), BulkError> {
        let mut done = Vec::with_capacity(ids.len());
        for id in ids {
            if let Err(error) = self.delete(session, *id) {
                return Err(BulkError {
                    error,
                    completed: done,
                });
            }
            done.push(*id);
        }
        Ok(())
    }

    /// Every visible record of the view. `limit` 0 means no limit.
    fn get_all(
        &self,
        session: &StoreSession,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Record>, StoreError> {
        self.get_with_query(session, &Query::new(self.view()), offset, limit)
    }

    fn get_with_query(
        &self,
        session: &StoreSession,
        query: &Query,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Record>, StoreError> {
        ensure_view(self.view(), query)?;
        session.permission().check_read()?;
        let view = self.view();
        let mut records =
            read::select_records(session.driver(), view, view_spec(view), query, offset, limit)?;
        for record in &mut records {
            self.hydrate(session, record)?;
        }
        Ok(records)
    }

    fn get_count(&self, session: &StoreSession) -> Result<i32, StoreError> {
        self.get_count_with_query(session, &Query::new(self.view()))
    }

    fn get_count_with_query(
        &self,
        session: &StoreSession,
        query: &Query,
    ) -> Result<i32, StoreError> {
        ensure_view(self.view(), query)?;
        session.permission().check_read()?;
        read::count_records(session.driver(), self.view(), view_spec(self.view()), query)
    }

    /// Completes a record read from the view, e.g. with its child rows.
    fn hydrate(&self, _session: &StoreSession, _record: &mut Record) -> Result<(), StoreError> {
        Ok(())
    }
}

fn ensure_view(view: ViewId, query: &Query) -> Result<(), StoreError> {
    if query.view == view {
        Ok(())
    } else {
        Err(StoreError::InvalidParameter("query targets a different view"))
    }
}

pub(crate) fn now_secs() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
