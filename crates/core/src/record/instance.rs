#![forbid(unsafe_code)]

use crate::caltime::CalTime;
use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use serde::{Deserialize, Serialize};

/// One expanded occurrence of an event, as read from an instance view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub event_id: i32,
    pub calendar_book_id: i32,
    pub start: Option<CalTime>,
    pub end: Option<CalTime>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub busy_status: i32,
    pub status: i32,
    pub priority: i32,
    pub sensitivity: i32,
    pub has_rrule: bool,
    pub has_alarm: bool,
    pub original_event_id: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(skip)]
    dirty: DirtyMask,
}

impl Fields for Instance {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            EventId => self.event_id.into(),
            CalendarBookId => self.calendar_book_id.into(),
            Start => self.start.into(),
            End => self.end.into(),
            Summary => self.summary.clone().into(),
            Description => self.description.clone().into(),
            Location => self.location.clone().into(),
            BusyStatus => self.busy_status.into(),
            Status => self.status.into(),
            Priority => self.priority.into(),
            Sensitivity => self.sensitivity.into(),
            HasRrule => self.has_rrule.into(),
            HasAlarm => self.has_alarm.into(),
            OriginalEventId => self.original_event_id.into(),
            Latitude => self.latitude.into(),
            Longitude => self.longitude.into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            EventId => put(&mut self.event_id, value.into_i32()),
            CalendarBookId => put(&mut self.calendar_book_id, value.into_i32()),
            Start => put(&mut self.start, value.into_opt_caltime()),
            End => put(&mut self.end, value.into_opt_caltime()),
            Summary => put(&mut self.summary, value.into_opt_text()),
            Description => put(&mut self.description, value.into_opt_text()),
            Location => put(&mut self.location, value.into_opt_text()),
            BusyStatus => put(&mut self.busy_status, value.into_i32()),
            Status => put(&mut self.status, value.into_i32()),
            Priority => put(&mut self.priority, value.into_i32()),
            Sensitivity => put(&mut self.sensitivity, value.into_i32()),
            HasRrule => put(&mut self.has_rrule, value.into_bool()),
            HasAlarm => put(&mut self.has_alarm, value.into_bool()),
            OriginalEventId => put(&mut self.original_event_id, value.into_opt_i32()),
            Latitude => put(&mut self.latitude, value.into_opt_f64()),
            Longitude => put(&mut self.longitude, value.into_opt_f64()),
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
