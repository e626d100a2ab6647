#![forbid(unsafe_code)]

use crate::caltime::CalTime;
use crate::codes::{self, Frequency, TickUnit};
use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use crate::record::ExtendedProperty;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: i32,
    pub parent_id: i32,
    /// Offset before the owner's start, in `tick_unit`s; ignored for `TickUnit::Specific`.
    pub tick: i32,
    pub tick_unit: TickUnit,
    pub action: codes::AlarmAction,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub attach: Option<String>,
    /// Absolute trigger time, used with `TickUnit::Specific`.
    pub time: Option<CalTime>,
    #[serde(default)]
    dirty: DirtyMask,
}

impl Alarm {
    pub fn before(tick: i32, tick_unit: TickUnit) -> Self {
        Self {
            tick,
            tick_unit,
            ..Self::default()
        }
    }

    pub fn at(time: CalTime) -> Self {
        Self {
            tick_unit: TickUnit::Specific,
            time: Some(time),
            ..Self::default()
        }
    }
}

impl Fields for Alarm {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            ParentId => self.parent_id.into(),
            RemindTick => self.tick.into(),
            RemindTickUnit => self.tick_unit.code().into(),
            AlarmAction => self.action.code().into(),
            AlarmSummary => self.summary.clone().into(),
            AlarmDescription => self.description.clone().into(),
            AlarmAttach => self.attach.clone().into(),
            AlarmTime => self.time.into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            ParentId => put(&mut self.parent_id, value.into_i32()),
            RemindTick => put(&mut self.tick, value.into_i32()),
            RemindTickUnit => put(&mut self.tick_unit, value.into_i32().map(TickUnit::from_code)),
            AlarmAction => put(
                &mut self.action,
                value.into_i32().map(codes::AlarmAction::from_code),
            ),
            AlarmSummary => put(&mut self.summary, value.into_opt_text()),
            AlarmDescription => put(&mut self.description, value.into_opt_text()),
            AlarmAttach => put(&mut self.attach, value.into_opt_text()),
            AlarmTime => put(&mut self.time, value.into_opt_caltime()),
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: i32,
    pub parent_id: i32,
    pub number: Option<String>,
    pub cutype: i32,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: i32,
    pub status: i32,
    pub rsvp: bool,
    pub uid: Option<String>,
    pub member: Option<String>,
    pub delegatee_uri: Option<String>,
    pub delegator_uri: Option<String>,
    #[serde(default)]
    dirty: DirtyMask,
}

impl Attendee {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

impl Fields for Attendee {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            ParentId => self.parent_id.into(),
            AttendeeNumber => self.number.clone().into(),
            AttendeeCutype => self.cutype.into(),
            AttendeeName => self.name.clone().into(),
            AttendeeEmail => self.email.clone().into(),
            AttendeeRole => self.role.into(),
            AttendeeStatus => self.status.into(),
            AttendeeRsvp => self.rsvp.into(),
            AttendeeUid => self.uid.clone().into(),
            AttendeeMember => self.member.clone().into(),
            AttendeeDelegateeUri => self.delegatee_uri.clone().into(),
            AttendeeDelegatorUri => self.delegator_uri.clone().into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            ParentId => put(&mut self.parent_id, value.into_i32()),
            AttendeeNumber => put(&mut self.number, value.into_opt_text()),
            AttendeeCutype => put(&mut self.cutype, value.into_i32()),
            AttendeeName => put(&mut self.name, value.into_opt_text()),
            AttendeeEmail => put(&mut self.email, value.into_opt_text()),
            AttendeeRole => put(&mut self.role, value.into_i32()),
            AttendeeStatus => put(&mut self.status, value.into_i32()),
            AttendeeRsvp => put(&mut self.rsvp, value.into_bool()),
            AttendeeUid => put(&mut self.uid, value.into_opt_text()),
            AttendeeMember => put(&mut self.member, value.into_opt_text()),
            AttendeeDelegateeUri => put(&mut self.delegatee_uri, value.into_opt_text()),
            AttendeeDelegatorUri => put(&mut self.delegator_uri, value.into_opt_text()),
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

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecurrenceRange {
    #[default]
    Endless,
    Until(CalTime),
    Count(i32),
}

/// Recurrence rule of an event or todo. `by_*` parts are kept verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rrule {
    pub freq: Frequency,
    pub interval: i32,
    pub range: RecurrenceRange,
    pub by_day: Option<String>,
    pub by_month_day: Option<String>,
    pub by_month: Option<String>,
    pub wkst: i32,
}

impl Rrule {
    pub fn new(freq: Frequency, interval: i32, range: RecurrenceRange) -> Self {
        Self {
            freq,
            interval,
            range,
            ..Self::default()
        }
    }
}

/// Child collections owned by an event or todo. They are always written as
/// a whole: a full replace deletes every child row and inserts these again.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Children {
    pub alarms: Vec<Alarm>,
    pub attendees: Vec<Attendee>,
    pub rrule: Option<Rrule>,
    pub extended: Vec<ExtendedProperty>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChildFlags {
    pub has_alarm: bool,
    pub has_attendee: bool,
    pub has_rrule: bool,
    pub has_extended: bool,
}

impl Children {
    pub fn flags(&self) -> ChildFlags {
        ChildFlags {
            has_alarm: !self.alarms.is_empty(),
            has_attendee: !self.attendees.is_empty(),
            has_rrule: self
                .rrule
                .as_ref()
                .is_some_and(|rule| rule.freq != Frequency::None),
            has_extended: !self.extended.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
            && self.attendees.is_empty()
            && self.rrule.is_none()
            && self.extended.is_empty()
    }
}
