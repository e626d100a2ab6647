#![forbid(unsafe_code)]

//! Calendar-book access control and the registry of active senders.

use crate::driver::Driver;
use crate::error::StoreError;
use calsvc_core::codes::{BookMode, StoreType, SyncEvent};
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, OnceLock, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub read: bool,
    pub write: bool,
    /// Account the caller synchronizes for; needed to write read-only books.
    pub account_id: Option<i32>,
}

impl Permission {
    pub const FULL: Self = Self {
        read: true,
        write: true,
        account_id: None,
    };

    pub const READ_ONLY: Self = Self {
        read: true,
        write: false,
        account_id: None,
    };

    pub fn for_account(account_id: i32) -> Self {
        Self {
            account_id: Some(account_id),
            ..Self::FULL
        }
    }

    pub fn check_read(&self) -> Result<(), StoreError> {
        if self.read {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied)
        }
    }

    pub fn check_write(&self) -> Result<(), StoreError> {
        if self.write {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied)
        }
    }

    /// Read-only books accept writes only from their own account.
    pub fn check_book_write(&self, book: &BookAccess) -> Result<(), StoreError> {
        self.check_write()?;
        if book.mode == BookMode::ReadOnly && self.account_id != Some(book.account_id) {
            return Err(StoreError::PermissionDenied);
        }
        Ok(())
    }
}

impl Default for Permission {
    fn default() -> Self {
        Self::FULL
    }
}

/// Access-relevant columns of one calendar book.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BookAccess {
    pub id: i32,
    pub store_type: StoreType,
    pub sync_event: SyncEvent,
    pub mode: BookMode,
    pub account_id: i32,
}

pub(crate) fn load_book(driver: &Driver, book_id: i32) -> Result<BookAccess, StoreError> {
    driver
        .query_optional(
            "SELECT id, store_type, sync_event, mode, account_id FROM calendar_book WHERE id = ?",
            &[SqlValue::Integer(i64::from(book_id))],
            |row| {
                Ok(BookAccess {
                    id: row.get(0)?,
                    store_type: StoreType::from_code(row.get(1)?),
                    sync_event: SyncEvent::from_code(row.get(2)?),
                    mode: BookMode::from_code(row.get(3)?),
                    account_id: row.get(4)?,
                })
            },
        )?
        .ok_or(StoreError::InvalidParameter("calendar book does not exist"))
}

/// Process-wide map of connected senders to the permission they were
/// granted. Guards bookkeeping only, never data tables.
#[derive(Debug, Default)]
pub struct SenderRegistry {
    senders: Mutex<BTreeMap<String, Permission>>,
}

impl SenderRegistry {
    pub fn global() -> &'static SenderRegistry {
        static REGISTRY: OnceLock<SenderRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SenderRegistry::default)
    }

    pub fn register(&self, sender: impl Into<String>, permission: Permission) {
        self.lock().insert(sender.into(), permission);
    }

    pub fn unregister(&self, sender: &str) -> bool {
        self.lock().remove(sender).is_some()
    }

    pub fn is_active(&self, sender: &str) -> bool {
        self.lock().contains_key(sender)
    }

    /// Unknown senders have no access at all.
    pub fn permission(&self, sender: &str) -> Result<Permission, StoreError> {
        self.lock()
            .get(sender)
            .copied()
            .ok_or(StoreError::PermissionDenied)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Permission>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(mode: BookMode) -> BookAccess {
        BookAccess {
            id: 1,
            store_type: StoreType::ALL,
            sync_event: SyncEvent::EveryAndDelete,
            mode,
            account_id: 42,
        }
    }

    #[test]
    fn read_only_books_need_matching_account() {
        assert!(Permission::FULL.check_book_write(&book(BookMode::ReadWrite)).is_ok());
        assert!(matches!(
            Permission::FULL.check_book_write(&book(BookMode::ReadOnly)),
            Err(StoreError::PermissionDenied)
        ));
        assert!(
            Permission::for_account(42)
                .check_book_write(&book(BookMode::ReadOnly))
                .is_ok()
        );
        assert!(matches!(
            Permission::READ_ONLY.check_book_write(&book(BookMode::ReadWrite)),
            Err(StoreError::PermissionDenied)
        ));
    }

    #[test]
    fn registry_tracks_senders() {
        let registry = SenderRegistry::default();
        assert!(registry.is_empty());
        registry.register("client-a", Permission::READ_ONLY);
        assert!(registry.is_active("client-a"));
        assert_eq!(
            registry.permission("client-a").expect("registered"),
            Permission::READ_ONLY
        );
        assert!(matches!(
            registry.permission("client-b"),
            Err(StoreError::PermissionDenied)
        ));
        assert!(registry.unregister("client-a"));
        assert!(!registry.unregister("client-a"));
        assert_eq!(registry.len(), 0);
    }
}
