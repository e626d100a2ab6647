#![forbid(unsafe_code)]

use crate::codes::{self, StoreType, SyncEvent};
use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use serde::{Deserialize, Serialize};

/// Container for events and todos; scopes access control and sync policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarBook {
    pub id: i32,
    pub uid: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub location: Option<String>,
    pub visibility: bool,
    pub sync_event: SyncEvent,
    pub account_id: i32,
    pub store_type: StoreType,
    pub mode: codes::BookMode,
    #[serde(default)]
    dirty: DirtyMask,
}

impl CalendarBook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            visibility: true,
            ..Self::default()
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.assign(PropertyId::BookName, Value::Text(name.into()));
    }

    pub fn set_sync_event(&mut self, sync_event: SyncEvent) {
        self.assign(PropertyId::BookSyncEvent, Value::Int(sync_event.code()));
    }

    pub fn set_mode(&mut self, mode: codes::BookMode) {
        self.assign(PropertyId::BookMode, Value::Int(mode.code()));
    }
}

impl Fields for CalendarBook {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            BookUid => self.uid.clone().into(),
            BookName => self.name.clone().into(),
            BookDescription => self.description.clone().into(),
            BookColor => self.color.clone().into(),
            BookLocation => self.location.clone().into(),
            BookVisibility => self.visibility.into(),
            BookSyncEvent => self.sync_event.code().into(),
            BookAccountId => self.account_id.into(),
            BookStoreType => self.store_type.code().into(),
            BookMode => self.mode.code().into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            BookUid => put(&mut self.uid, value.into_opt_text()),
            BookName => put(&mut self.name, value.into_opt_text()),
            BookDescription => put(&mut self.description, value.into_opt_text()),
            BookColor => put(&mut self.color, value.into_opt_text()),
            BookLocation => put(&mut self.location, value.into_opt_text()),
            BookVisibility => put(&mut self.visibility, value.into_bool()),
            BookSyncEvent => put(
                &mut self.sync_event,
                value.into_i32().map(SyncEvent::from_code),
            ),
            BookAccountId => put(&mut self.account_id, value.into_i32()),
            BookStoreType => put(
                &mut self.store_type,
                value.into_i32().map(StoreType::from_code),
            ),
            BookMode => put(
                &mut self.mode,
                value.into_i32().map(codes::BookMode::from_code),
            ),
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
