#![forbid(unsafe_code)]

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("no data")]
    NoData,
    #[error("out of memory")]
    OutOfMemory,
    #[error("database failed: {0}")]
    DbFailed(&'static str),
    #[error("sqlite: {0}")]
    Sql(rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("record not found")]
    RecordNotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("ipc: {0}")]
    Ipc(String),
}

impl StoreError {
    pub fn code(&self) -> ResultCode {
        match self {
            Self::InvalidParameter(_) => ResultCode::InvalidParameter,
            Self::NoData => ResultCode::NoData,
            Self::OutOfMemory => ResultCode::OutOfMemory,
            Self::DbFailed(_) | Self::Sql(_) | Self::Io(_) => ResultCode::DbFailed,
            Self::RecordNotFound => ResultCode::RecordNotFound,
            Self::PermissionDenied => ResultCode::PermissionDenied,
            Self::Ipc(_) => ResultCode::Ipc,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::QueryReturnedNoRows => Self::NoData,
            rusqlite::Error::SqliteFailure(code, _) if code.code == ErrorCode::OutOfMemory => {
                Self::OutOfMemory
            }
            _ => Self::Sql(value),
        }
    }
}

/// Numeric result codes handed across the transport boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResultCode {
    None,
    InvalidParameter,
    NoData,
    OutOfMemory,
    DbFailed,
    RecordNotFound,
    PermissionDenied,
    Ipc,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::None => 0,
            Self::OutOfMemory => -12,
            Self::PermissionDenied => -13,
            Self::InvalidParameter => -22,
            Self::NoData => -61,
            Self::DbFailed => -1002,
            Self::RecordNotFound => -1003,
            Self::Ipc => -1004,
        }
    }

    pub fn of<T>(result: &Result<T, StoreError>) -> Self {
        match result {
            Ok(_) => Self::None,
            Err(err) => err.code(),
        }
    }
}

/// Failure of a bulk call. `completed` holds the ids applied before the
/// failing element; they are not rolled back.
#[derive(Debug, Error)]
#[error("bulk operation stopped after {count} record(s): {error}", count = .completed.len())]
pub struct BulkError {
    #[source]
    pub error: StoreError,
    pub completed: Vec<i32>,
}

impl BulkError {
    pub fn code(&self) -> ResultCode {
        self.error.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_errors_map_into_taxonomy() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, StoreError::NoData));

        let nomem = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_NOMEM),
            None,
        );
        assert!(matches!(StoreError::from(nomem), StoreError::OutOfMemory));
    }

    #[test]
    fn result_codes_are_stable() {
        assert_eq!(ResultCode::of::<()>(&Ok(())).as_i32(), 0);
        assert_eq!(StoreError::PermissionDenied.code().as_i32(), -13);
        assert_eq!(StoreError::DbFailed("busy").code(), ResultCode::DbFailed);
        let bulk = BulkError {
            error: StoreError::RecordNotFound,
            completed: vec![1, 2],
        };
        assert_eq!(bulk.code(), ResultCode::RecordNotFound);
        assert!(bulk.to_string().contains("2 record(s)"));
    }
}
