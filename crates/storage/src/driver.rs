#![forbid(unsafe_code)]

//! Thin synchronous wrapper over the SQLite connection.
//!
//! Busy and locked results are retried by polling until the configured
//! window elapses; every other failure surfaces immediately.

use crate::config::StoreConfig;
use crate::error::StoreError;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params_from_iter};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug)]
pub struct Driver {
    conn: Connection,
    busy_window: Duration,
    busy_poll: Duration,
}

impl Driver {
    pub fn open(path: &Path, config: &StoreConfig) -> Result<Self, StoreError> {
        Self::configure(Connection::open(path)?, config)
    }

    pub fn open_in_memory(config: &StoreConfig) -> Result<Self, StoreError> {
        Self::configure(Connection::open_in_memory()?, config)
    }

    fn configure(conn: Connection, config: &StoreConfig) -> Result<Self, StoreError> {
        // Busy handling is ours; SQLite must report SQLITE_BUSY right away.
        conn.busy_timeout(Duration::ZERO)?;
        Ok(Self {
            conn,
            busy_window: config.busy_window(),
            busy_poll: config.busy_poll(),
        })
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs one or more statements without parameters.
    pub fn exec(&self, sql: &str) -> Result<(), StoreError> {
        self.retry_busy(|| self.conn.execute_batch(sql))
    }

    /// Single attempt, no busy polling. Used by the commit path, which has
    /// its own backoff.
    pub(crate) fn exec_once(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql).map_err(StoreError::from)
    }

    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, StoreError> {
        self.retry_busy(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            stmt.execute(params_from_iter(params.iter()))
        })
    }

    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// First column of the first row. `NoData` when there is no row or the
    /// value is NULL.
    pub fn scalar_int(&self, sql: &str, params: &[SqlValue]) -> Result<i64, StoreError> {
        let value = self.retry_busy(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            stmt.query_row(params_from_iter(params.iter()), |row| {
                row.get::<_, Option<i64>>(0)
            })
            .optional()
        })?;
        value.flatten().ok_or(StoreError::NoData)
    }

    pub fn query<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
        mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        self.retry_busy(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(map(row)?);
            }
            Ok(out)
        })
    }

    pub fn query_optional<T>(
        &self,
        sql: &str,
        params: &[SqlValue],
        mut map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>, StoreError> {
        self.retry_busy(|| {
            let mut stmt = self.conn.prepare_cached(sql)?;
            stmt.query_row(params_from_iter(params.iter()), |row| map(row))
                .optional()
        })
    }

    fn retry_busy<T>(
        &self,
        mut op: impl FnMut() -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let started = Instant::now();
        let mut retries = 0u32;
        loop {
            match op() {
                Err(err) if is_busy(&err) => {
                    if started.elapsed() >= self.busy_window {
                        warn!(
                            retries,
                            window_ms = self.busy_window.as_millis() as u64,
                            "database stayed busy, giving up"
                        );
                        return Err(StoreError::DbFailed("database busy"));
                    }
                    retries += 1;
                    std::thread::sleep(self.busy_poll);
                }
                other => return other.map_err(StoreError::from),
            }
        }
    }
}

pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => matches!(
            code.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StoreConfig {
        StoreConfig {
            busy_window_ms: 60,
            busy_poll_ms: 5,
            ..StoreConfig::default()
        }
    }

    #[test]
    fn scalar_int_reports_no_data() {
        let driver = Driver::open_in_memory(&config()).expect("open");
        driver
            .exec("CREATE TABLE t(v INTEGER); INSERT INTO t(v) VALUES (NULL);")
            .expect("schema");
        assert!(matches!(
            driver.scalar_int("SELECT v FROM t WHERE 0", &[]),
            Err(StoreError::NoData)
        ));
        assert!(matches!(
            driver.scalar_int("SELECT v FROM t", &[]),
            Err(StoreError::NoData)
        ));
        driver
            .execute("INSERT INTO t(v) VALUES (?)", &[SqlValue::Integer(7)])
            .expect("insert");
        assert_eq!(driver.last_insert_id(), 2);
        assert_eq!(
            driver
                .scalar_int("SELECT v FROM t WHERE rowid = ?", &[SqlValue::Integer(2)])
                .expect("scalar"),
            7
        );
    }

    #[test]
    fn query_optional_maps_first_row_or_none() {
        let driver = Driver::open_in_memory(&config()).expect("open");
        driver
            .exec("CREATE TABLE t(v INTEGER); INSERT INTO t(v) VALUES (3), (4);")
            .expect("schema");
        let mut calls = 0;
        let found = driver
            .query_optional("SELECT v FROM t ORDER BY v", &[], |row| {
                calls += 1;
                row.get::<_, i64>(0)
            })
            .expect("first row");
        assert_eq!(found, Some(3));
        assert_eq!(calls, 1);
        let missing = driver
            .query_optional("SELECT v FROM t WHERE v > 10", &[], |row| row.get::<_, i64>(0))
            .expect("no row");
        assert_eq!(missing, None);
    }

    #[test]
    fn busy_database_fails_after_window() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("busy.db");
        let holder = Driver::open(&path, &config()).expect("open holder");
        holder.exec("CREATE TABLE t(v INTEGER)").expect("schema");
        holder.exec("BEGIN IMMEDIATE").expect("lock");

        let contender = Driver::open(&path, &config()).expect("open contender");
        let started = Instant::now();
        let err = contender
            .execute("INSERT INTO t(v) VALUES (1)", &[])
            .expect_err("write must stay blocked");
        assert!(matches!(err, StoreError::DbFailed(_)));
        assert!(started.elapsed() >= Duration::from_millis(60));

        holder.exec("COMMIT").expect("unlock");
        contender
            .execute("INSERT INTO t(v) VALUES (1)", &[])
            .expect("write after unlock");
    }
}
