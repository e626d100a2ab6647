#![forbid(unsafe_code)]

use crate::caltime::CalTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Int64,
    Double,
    Text,
    CalTime,
    /// Child collection owned by an aggregate; never a column.
    Children,
}

/// Logical property ids shared by every view. Each view decides which of
/// them it maps to a physical column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PropertyId {
    Id,
    CalendarBookId,
    RecordType,

    // calendar book
    BookUid,
    BookName,
    BookDescription,
    BookColor,
    BookLocation,
    BookVisibility,
    BookSyncEvent,
    BookAccountId,
    BookStoreType,
    BookMode,

    // events and todos
    Summary,
    Description,
    Location,
    Categories,
    Status,
    Priority,
    Sensitivity,
    Uid,
    OrganizerName,
    OrganizerEmail,
    BusyStatus,
    Start,
    StartTzid,
    End,
    EndTzid,
    Due,
    DueTzid,
    CompletedTime,
    Progress,
    Latitude,
    Longitude,
    OriginalEventId,
    RecurrenceId,
    Exdate,
    HasAlarm,
    HasAttendee,
    HasExtended,
    HasRrule,
    CreatedTime,
    LastModified,
    IsDeleted,
    CreatedVersion,
    ChangedVersion,
    DeletedVersion,
    Alarms,
    Attendees,
    Rrule,
    Extended,

    // instances
    EventId,

    // timezone
    TzOffsetFromGmt,
    StandardName,
    StandardBias,
    DaylightName,
    DaylightBias,

    // extended property
    RecordId,
    ExtendedKey,
    ExtendedValue,

    // alarm
    ParentId,
    RemindTick,
    RemindTickUnit,
    AlarmAction,
    AlarmSummary,
    AlarmDescription,
    AlarmAttach,
    AlarmTime,

    // attendee
    AttendeeNumber,
    AttendeeCutype,
    AttendeeName,
    AttendeeEmail,
    AttendeeRole,
    AttendeeStatus,
    AttendeeRsvp,
    AttendeeUid,
    AttendeeMember,
    AttendeeDelegateeUri,
    AttendeeDelegatorUri,
}

const PROPERTY_COUNT: usize = PropertyId::AttendeeDelegatorUri as usize + 1;
const _: () = assert!(PROPERTY_COUNT <= 128, "DirtyMask holds at most 128 properties");

impl PropertyId {
    pub fn kind(self) -> ValueKind {
        use PropertyId::*;
        match self {
            Alarms | Attendees | Rrule | Extended => ValueKind::Children,
            Start | End | Due | AlarmTime => ValueKind::CalTime,
            Latitude | Longitude => ValueKind::Double,
            CompletedTime | CreatedTime | LastModified | CreatedVersion | ChangedVersion
            | DeletedVersion => ValueKind::Int64,
            BookUid | BookName | BookDescription | BookColor | BookLocation | Summary
            | Description | Location | Categories | Uid | OrganizerName | OrganizerEmail
            | StartTzid | EndTzid | DueTzid | RecurrenceId | Exdate | StandardName
            | DaylightName | ExtendedKey | ExtendedValue | AlarmSummary | AlarmDescription
            | AlarmAttach | AttendeeNumber | AttendeeName | AttendeeEmail | AttendeeUid
            | AttendeeMember | AttendeeDelegateeUri | AttendeeDelegatorUri => ValueKind::Text,
            _ => ValueKind::Int,
        }
    }

    fn bit(self) -> u128 {
        1u128 << (self as u8)
    }
}

/// Set of properties modified since a record was read or created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyMask(u128);

impl DirtyMask {
    pub fn insert(&mut self, property: PropertyId) {
        self.0 |= property.bit();
    }

    pub fn remove(&mut self, property: PropertyId) {
        self.0 &= !property.bit();
    }

    pub fn contains(&self, property: PropertyId) -> bool {
        self.0 & property.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn intersects(&self, properties: &[PropertyId]) -> bool {
        properties.iter().any(|p| self.contains(*p))
    }

    /// Dirty properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = PropertyId> + '_ {
        ALL_PROPERTIES
            .iter()
            .copied()
            .filter(move |p| self.contains(*p))
    }
}

impl FromIterator<PropertyId> for DirtyMask {
    fn from_iter<I: IntoIterator<Item = PropertyId>>(iter: I) -> Self {
        let mut mask = Self::default();
        for property in iter {
            mask.insert(property);
        }
        mask
    }
}

pub const ALL_PROPERTIES: [PropertyId; PROPERTY_COUNT] = {
    use PropertyId::*;
    [
        Id,
        CalendarBookId,
        RecordType,
        BookUid,
        BookName,
        BookDescription,
        BookColor,
        BookLocation,
        BookVisibility,
        BookSyncEvent,
        BookAccountId,
        BookStoreType,
        BookMode,
        Summary,
        Description,
        Location,
        Categories,
        Status,
        Priority,
        Sensitivity,
        Uid,
        OrganizerName,
        OrganizerEmail,
        BusyStatus,
        Start,
        StartTzid,
        End,
        EndTzid,
        Due,
        DueTzid,
        CompletedTime,
        Progress,
        Latitude,
        Longitude,
        OriginalEventId,
        RecurrenceId,
        Exdate,
        HasAlarm,
        HasAttendee,
        HasExtended,
        HasRrule,
        CreatedTime,
        LastModified,
        IsDeleted,
        CreatedVersion,
        ChangedVersion,
        DeletedVersion,
        Alarms,
        Attendees,
        Rrule,
        Extended,
        EventId,
        TzOffsetFromGmt,
        StandardName,
        StandardBias,
        DaylightName,
        DaylightBias,
        RecordId,
        ExtendedKey,
        ExtendedValue,
        ParentId,
        RemindTick,
        RemindTickUnit,
        AlarmAction,
        AlarmSummary,
        AlarmDescription,
        AlarmAttach,
        AlarmTime,
        AttendeeNumber,
        AttendeeCutype,
        AttendeeName,
        AttendeeEmail,
        AttendeeRole,
        AttendeeStatus,
        AttendeeRsvp,
        AttendeeUid,
        AttendeeMember,
        AttendeeDelegateeUri,
        AttendeeDelegatorUri,
    ]
};

/// Dynamically typed property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int(i32),
    Int64(i64),
    Double(f64),
    Text(String),
    CalTime(CalTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            Self::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_caltime(&self) -> Option<CalTime> {
        match self {
            Self::CalTime(v) => Some(*v),
            _ => None,
        }
    }

    // The `into_*` helpers return `None` on a kind mismatch, and
    // `Some(None)` for `Null` when the target slot is optional.

    pub fn into_i32(self) -> Option<i32> {
        self.as_i32()
    }

    pub fn into_bool(self) -> Option<bool> {
        self.as_i32().map(|v| v != 0)
    }

    pub fn into_i64(self) -> Option<i64> {
        self.as_i64()
    }

    pub fn into_opt_i32(self) -> Option<Option<i32>> {
        match self {
            Self::Null => Some(None),
            Self::Int(v) => Some(Some(v)),
            _ => None,
        }
    }

    pub fn into_opt_i64(self) -> Option<Option<i64>> {
        match self {
            Self::Null => Some(None),
            other => other.as_i64().map(Some),
        }
    }

    pub fn into_opt_f64(self) -> Option<Option<f64>> {
        match self {
            Self::Null => Some(None),
            Self::Double(v) => Some(Some(v)),
            _ => None,
        }
    }

    pub fn into_opt_text(self) -> Option<Option<String>> {
        match self {
            Self::Null => Some(None),
            Self::Text(v) => Some(Some(v)),
            _ => None,
        }
    }

    pub fn into_opt_caltime(self) -> Option<Option<CalTime>> {
        match self {
            Self::Null => Some(None),
            Self::CalTime(v) => Some(Some(v)),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Int(i32::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<CalTime> for Value {
    fn from(value: CalTime) -> Self {
        Self::CalTime(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Reflective access to a record's scalar properties.
///
/// `set_value` never touches the dirty mask; `assign` does.
pub trait Fields {
    fn value(&self, property: PropertyId) -> Option<Value>;

    /// Returns `false` when the property is not part of the record or the
    /// value kind does not fit it.
    fn set_value(&mut self, property: PropertyId, value: Value) -> bool;

    fn dirty(&self) -> DirtyMask;

    fn dirty_mut(&mut self) -> &mut DirtyMask;

    fn assign(&mut self, property: PropertyId, value: Value) -> bool {
        if self.set_value(property, value) {
            self.dirty_mut().insert(property);
            true
        } else {
            false
        }
    }
}

pub(crate) fn put<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}
