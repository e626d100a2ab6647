#![forbid(unsafe_code)]

use calsvc_core::RecordKind;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// Receives one call per changed record kind after a commit.
pub trait ChangeSink: Send + Sync {
    fn changed(&self, kind: RecordKind, version: i64);
}

/// Default sink: reports flushed changes through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl ChangeSink for LogSink {
    fn changed(&self, kind: RecordKind, version: i64) {
        info!(kind = kind.as_str(), version, "records changed");
    }
}

/// Collects notifications in memory; cloneable through `Arc`.
#[derive(Debug, Default)]
pub struct MemorySink {
    seen: Mutex<Vec<(RecordKind, i64)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<(RecordKind, i64)> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn take(&self) -> Vec<(RecordKind, i64)> {
        std::mem::take(&mut *self.seen.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ChangeSink for MemorySink {
    fn changed(&self, kind: RecordKind, version: i64) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, version));
    }
}
