#![forbid(unsafe_code)]

use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timezone {
    pub id: i32,
    pub calendar_book_id: i32,
    /// Minutes east of GMT.
    pub tz_offset_from_gmt: i32,
    pub standard_name: Option<String>,
    pub standard_bias: i32,
    pub daylight_name: Option<String>,
    pub daylight_bias: i32,
    #[serde(default)]
    dirty: DirtyMask,
}

impl Timezone {
    pub fn new(calendar_book_id: i32, tz_offset_from_gmt: i32) -> Self {
        Self {
            calendar_book_id,
            tz_offset_from_gmt,
            ..Self::default()
        }
    }

    pub fn set_standard_name(&mut self, name: impl Into<String>) {
        self.assign(PropertyId::StandardName, Value::Text(name.into()));
    }

    pub fn set_offset(&mut self, minutes: i32) {
        self.assign(PropertyId::TzOffsetFromGmt, Value::Int(minutes));
    }
}

impl Fields for Timezone {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            CalendarBookId => self.calendar_book_id.into(),
            TzOffsetFromGmt => self.tz_offset_from_gmt.into(),
            StandardName => self.standard_name.clone().into(),
            StandardBias => self.standard_bias.into(),
            DaylightName => self.daylight_name.clone().into(),
            DaylightBias => self.daylight_bias.into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            CalendarBookId => put(&mut self.calendar_book_id, value.into_i32()),
            TzOffsetFromGmt => put(&mut self.tz_offset_from_gmt, value.into_i32()),
            StandardName => put(&mut self.standard_name, value.into_opt_text()),
            StandardBias => put(&mut self.standard_bias, value.into_i32()),
            DaylightName => put(&mut self.daylight_name, value.into_opt_text()),
            DaylightBias => put(&mut self.daylight_bias, value.into_i32()),
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
