#![forbid(unsafe_code)]

//! Embedded calendar storage engine: SQLite schema, versioned
//! transactions, the filter compiler, one plugin per view and the change
//! feed synchronizing clients read from.

pub mod access;
pub mod changes;
pub mod compiler;
pub mod config;
pub mod driver;
pub mod error;
pub mod instances;
pub mod notify;
pub mod plugins;
pub mod registry;
mod schema;
pub mod session;
pub mod views;

pub use access::{BookAccess, Permission, SenderRegistry};
pub use changes::{changes_exception_since, changes_since, clean_after_sync};
pub use config::{CONFIG_FILE_NAME, StoreConfig};
pub use error::{BulkError, ResultCode, StoreError};
pub use notify::{ChangeSink, LogSink, MemorySink};
pub use plugins::{RecordPlugin, replace_children};
pub use registry::PluginRegistry;
pub use session::{DB_FILE_NAME, StoreSession};
