#![forbid(unsafe_code)]

use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use serde::{Deserialize, Serialize};

/// Free-form key/value pair attached to a book, event or todo.
///
/// `record_type` holds the owning record's `RecordKind` code.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedProperty {
    pub id: i32,
    pub record_id: i32,
    pub record_type: i32,
    pub key: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    dirty: DirtyMask,
}

impl ExtendedProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn set_value_text(&mut self, value: impl Into<String>) {
        self.assign(PropertyId::ExtendedValue, Value::Text(value.into()));
    }
}

impl Fields for ExtendedProperty {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            RecordId => self.record_id.into(),
            RecordType => self.record_type.into(),
            ExtendedKey => self.key.clone().into(),
            ExtendedValue => self.value.clone().into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            RecordId => put(&mut self.record_id, value.into_i32()),
            RecordType => put(&mut self.record_type, value.into_i32()),
            ExtendedKey => put(&mut self.key, value.into_opt_text()),
            ExtendedValue => put(&mut self.value, value.into_opt_text()),
            _ => false,
        }
    }

    fn dirty(&self) -> DirtyMask {
        self.dirty
    }

    fn dirty_mut(&mut self) -> &mut DirtyMask {
        &mut self.dirty
    }
}
