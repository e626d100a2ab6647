#![forbid(unsafe_code)]

use crate::property::{DirtyMask, Fields, PropertyId, Value};
use crate::record::RecordKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Loosely typed row of a joined view. Holds only the projected properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewRow {
    pub kind: RecordKind,
    pub values: BTreeMap<PropertyId, Value>,
    #[serde(skip)]
    dirty: DirtyMask,
}

impl ViewRow {
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
            dirty: DirtyMask::default(),
        }
    }

    pub fn get(&self, property: PropertyId) -> Option<&Value> {
        self.values.get(&property)
    }

    pub fn int(&self, property: PropertyId) -> Option<i32> {
        self.get(property).and_then(Value::as_i32)
    }

    pub fn text(&self, property: PropertyId) -> Option<&str> {
        self.get(property).and_then(Value::as_text)
    }
}

impl Fields for ViewRow {
    fn value(&self, property: PropertyId) -> Option<Value> {
        self.values.get(&property).cloned()
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        self.values.insert(property, value);
        true
    }

    fn dirty(&self) -> DirtyMask {
        self.dirty
    }

    fn dirty_mut(&mut self) -> &mut DirtyMask {
        &mut self.dirty
    }
}
