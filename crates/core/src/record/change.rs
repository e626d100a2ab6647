#![forbid(unsafe_code)]

use crate::codes::ModifiedStatus;
use crate::record::RecordKind;
use serde::{Deserialize, Serialize};

/// One entry of the change feed. Computed on demand, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: RecordKind,
    pub id: i32,
    pub calendar_book_id: i32,
    pub version: i64,
    pub status: ModifiedStatus,
}
