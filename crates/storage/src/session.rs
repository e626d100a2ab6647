#![forbid(unsafe_code)]

//! Store session: connection, nested transactions and the version counter.
//!
//! Only the outermost `begin` opens a physical transaction. On that edge
//! the persisted version is snapshotted; writers inside the transaction
//! stamp rows with `snapshot + 1`, which is persisted right before COMMIT
//! when at least one writer asked for it.

use crate::access::Permission;
use crate::config::StoreConfig;
use crate::driver::Driver;
use crate::error::StoreError;
use crate::notify::{ChangeSink, LogSink};
use crate::schema;
use calsvc_core::RecordKind;
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DB_FILE_NAME: &str = "calendar.db";

pub struct StoreSession {
    driver: Driver,
    config: StoreConfig,
    permission: Permission,
    sink: Arc<dyn ChangeSink>,
    storage_dir: Option<PathBuf>,
    depth: u32,
    snapshot: i64,
    bump: bool,
    pending: BTreeSet<RecordKind>,
    last_changed: i64,
}

impl std::fmt::Debug for StoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSession")
            .field("storage_dir", &self.storage_dir)
            .field("permission", &self.permission)
            .field("depth", &self.depth)
            .field("snapshot", &self.snapshot)
            .field("last_changed", &self.last_changed)
            .finish_non_exhaustive()
    }
}

impl StoreSession {
    /// Opens (and creates if needed) the store inside `storage_dir`,
    /// honoring `calsvc.json` and `CALSVC_*` overrides.
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;
        let config = StoreConfig::load(storage_dir)?;
        Self::open_with(storage_dir, config)
    }

    pub fn open_with(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;
        let driver = Driver::open(&storage_dir.join(DB_FILE_NAME), &config)?;
        Self::from_driver(driver, config, Some(storage_dir))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open_in_memory_with(StoreConfig::default())
    }

    pub fn open_in_memory_with(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let driver = Driver::open_in_memory(&config)?;
        Self::from_driver(driver, config, None)
    }

    fn from_driver(
        driver: Driver,
        config: StoreConfig,
        storage_dir: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        schema::install_schema(&driver)?;
        Ok(Self {
            driver,
            config,
            permission: Permission::default(),
            sink: Arc::new(LogSink),
            storage_dir,
            depth: 0,
            snapshot: 0,
            bump: false,
            pending: BTreeSet::new(),
            last_changed: 0,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub(crate) fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn begin(&mut self) -> Result<(), StoreError> {
        if self.depth == 0 {
            self.driver.exec("BEGIN IMMEDIATE")?;
            match self.read_version() {
                Ok(version) => self.snapshot = version,
                Err(err) => {
                    let _ = self.driver.exec_once("ROLLBACK");
                    return Err(err);
                }
            }
            self.bump = false;
            self.pending.clear();
        }
        self.depth += 1;
        Ok(())
    }

    /// Closes one nesting level. Only the outermost call commits or rolls
    /// back; `success` of inner calls is not consulted.
    pub fn end(&mut self, success: bool) -> Result<(), StoreError> {
        if self.depth == 0 {
            return Err(StoreError::InvalidParameter("no transaction in progress"));
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(());
        }

        if !success {
            self.pending.clear();
            self.bump = false;
            return self.finish("ROLLBACK");
        }

        let committed = if self.bump {
            self.snapshot + 1
        } else {
            self.snapshot
        };
        if self.bump {
            let persisted = self.driver.execute(
                "UPDATE version SET ver = ? WHERE singleton = 1",
                &[SqlValue::Integer(committed)],
            );
            if let Err(err) = persisted {
                self.pending.clear();
                self.bump = false;
                let _ = self.finish("ROLLBACK");
                return Err(err);
            }
        }

        if let Err(err) = self.finish("COMMIT") {
            self.pending.clear();
            self.bump = false;
            let _ = self.driver.exec_once("ROLLBACK");
            return Err(err);
        }

        if self.bump {
            self.last_changed = committed;
            debug!(version = committed, "transaction committed");
        }
        self.bump = false;
        for kind in std::mem::take(&mut self.pending) {
            self.sink.changed(kind, committed);
        }
        Ok(())
    }

    /// Runs `op` inside a (possibly nested) transaction.
    pub fn transaction<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.begin()?;
        match op(&mut *self) {
            Ok(value) => {
                self.end(true)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(end_err) = self.end(false) {
                    warn!(error = %end_err, "rollback after failed operation also failed");
                }
                Err(err)
            }
        }
    }

    /// Version stamp for the current write.
    ///
    /// Inside a transaction every caller gets the same `snapshot + 1`;
    /// outside, the persisted counter is incremented directly.
    pub fn next_version(&mut self) -> Result<i64, StoreError> {
        if self.depth > 0 {
            self.bump = true;
            return Ok(self.snapshot + 1);
        }
        self.driver
            .execute("UPDATE version SET ver = ver + 1 WHERE singleton = 1", &[])?;
        let version = self.read_version()?;
        self.last_changed = version;
        Ok(version)
    }

    /// Queues a change notification, flushed after commit.
    pub fn touch(&mut self, kind: RecordKind) {
        if self.depth > 0 {
            self.pending.insert(kind);
        } else {
            self.sink.changed(kind, self.last_changed);
        }
    }

    pub fn current_version(&self) -> Result<i64, StoreError> {
        self.read_version()
    }

    /// Version committed by this session's most recent bumping write, or 0.
    pub fn last_changed_version(&self) -> i64 {
        self.last_changed
    }

    fn read_version(&self) -> Result<i64, StoreError> {
        self.driver
            .scalar_int("SELECT ver FROM version WHERE singleton = 1", &[])
    }

    /// Commit or rollback, retried with capped doubling backoff.
    fn finish(&self, sql: &str) -> Result<(), StoreError> {
        if sql == "ROLLBACK" && self.driver.connection().is_autocommit() {
            // SQLite already rolled back on its own.
            return Ok(());
        }
        let attempts = self.config.commit_attempts.max(1);
        let mut last = None;
        for attempt in 0..attempts {
            match self.driver.exec_once(sql) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    let delay = self.config.commit_backoff(attempt);
                    warn!(
                        statement = sql,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transaction end failed, retrying"
                    );
                    last = Some(err);
                    if attempt + 1 < attempts {
                        std::thread::sleep(delay);
                    }
                }
            }
        }
        match last {
            Some(StoreError::Sql(_)) | None => Err(StoreError::DbFailed("transaction end failed")),
            Some(err) => Err(err),
        }
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        if self.depth > 0 {
            warn!(depth = self.depth, "session dropped inside a transaction, rolling back");
            let _ = self.driver.exec_once("ROLLBACK");
        }
    }
}
