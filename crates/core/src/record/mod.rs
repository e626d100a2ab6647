#![forbid(unsafe_code)]

mod book;
mod change;
mod children;
mod extended;
mod instance;
mod row;
mod schedule;
mod timezone;

pub use book::CalendarBook;
pub use change::ChangeRecord;
pub use children::{Alarm, Attendee, ChildFlags, Children, RecurrenceRange, Rrule};
pub use extended::ExtendedProperty;
pub use instance::Instance;
pub use row::ViewRow;
pub use schedule::{Event, Todo};
pub use timezone::Timezone;

use crate::property::Fields;
use serde::{Deserialize, Serialize};

/// Record kinds, used for change notifications and as the
/// `record_type` tag of extended properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Event,
    Todo,
    Book,
    Timezone,
    Extended,
    Alarm,
    Attendee,
    Instance,
}

impl RecordKind {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Event => 1,
            Self::Todo => 2,
            Self::Book => 3,
            Self::Timezone => 4,
            Self::Extended => 5,
            Self::Alarm => 6,
            Self::Attendee => 7,
            Self::Instance => 8,
        }
    }

    pub fn from_i32(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Event,
            2 => Self::Todo,
            3 => Self::Book,
            4 => Self::Timezone,
            5 => Self::Extended,
            6 => Self::Alarm,
            7 => Self::Attendee,
            8 => Self::Instance,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Todo => "todo",
            Self::Book => "book",
            Self::Timezone => "timezone",
            Self::Extended => "extended",
            Self::Alarm => "alarm",
            Self::Attendee => "attendee",
            Self::Instance => "instance",
        }
    }
}

/// Any record that can cross the plugin boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Book(CalendarBook),
    Event(Event),
    Todo(Todo),
    Timezone(Timezone),
    Extended(ExtendedProperty),
    Alarm(Alarm),
    Attendee(Attendee),
    Instance(Instance),
    Row(ViewRow),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Book(_) => RecordKind::Book,
            Self::Event(_) => RecordKind::Event,
            Self::Todo(_) => RecordKind::Todo,
            Self::Timezone(_) => RecordKind::Timezone,
            Self::Extended(_) => RecordKind::Extended,
            Self::Alarm(_) => RecordKind::Alarm,
            Self::Attendee(_) => RecordKind::Attendee,
            Self::Instance(_) => RecordKind::Instance,
            Self::Row(row) => row.kind,
        }
    }

    /// Store-assigned id; instances report their event id.
    pub fn id(&self) -> i32 {
        match self {
            Self::Book(r) => r.id,
            Self::Event(r) => r.id,
            Self::Todo(r) => r.id,
            Self::Timezone(r) => r.id,
            Self::Extended(r) => r.id,
            Self::Alarm(r) => r.id,
            Self::Attendee(r) => r.id,
            Self::Instance(r) => r.event_id,
            Self::Row(r) => r.int(crate::property::PropertyId::Id).unwrap_or_default(),
        }
    }

    pub fn fields(&self) -> &dyn Fields {
        match self {
            Self::Book(r) => r,
            Self::Event(r) => r,
            Self::Todo(r) => r,
            Self::Timezone(r) => r,
            Self::Extended(r) => r,
            Self::Alarm(r) => r,
            Self::Attendee(r) => r,
            Self::Instance(r) => r,
            Self::Row(r) => r,
        }
    }

    pub fn fields_mut(&mut self) -> &mut dyn Fields {
        match self {
            Self::Book(r) => r,
            Self::Event(r) => r,
            Self::Todo(r) => r,
            Self::Timezone(r) => r,
            Self::Extended(r) => r,
            Self::Alarm(r) => r,
            Self::Attendee(r) => r,
            Self::Instance(r) => r,
            Self::Row(r) => r,
        }
    }

    pub fn as_todo(&self) -> Option<&Todo> {
        match self {
            Self::Todo(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_book(&self) -> Option<&CalendarBook> {
        match self {
            Self::Book(r) => Some(r),
            _ => None,
        }
    }
}

impl From<CalendarBook> for Record {
    fn from(value: CalendarBook) -> Self {
        Self::Book(value)
    }
}

impl From<Event> for Record {
    fn from(value: Event) -> Self {
        Self::Event(value)
    }
}

impl From<Todo> for Record {
    fn from(value: Todo) -> Self {
        Self::Todo(value)
    }
}

impl From<Timezone> for Record {
    fn from(value: Timezone) -> Self {
        Self::Timezone(value)
    }
}

impl From<ExtendedProperty> for Record {
    fn from(value: ExtendedProperty) -> Self {
        Self::Extended(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{PropertyId, Value};

    #[test]
    fn record_kind_codes_round_trip() {
        for kind in [
            RecordKind::Event,
            RecordKind::Todo,
            RecordKind::Book,
            RecordKind::Timezone,
            RecordKind::Extended,
            RecordKind::Alarm,
            RecordKind::Attendee,
            RecordKind::Instance,
        ] {
            assert_eq!(RecordKind::from_i32(kind.as_i32()), Some(kind));
        }
        assert_eq!(RecordKind::from_i32(0), None);
    }

    #[test]
    fn fields_dispatch_through_record() {
        let mut record = Record::from(Todo::new(4));
        assert!(
            record
                .fields_mut()
                .assign(PropertyId::Summary, Value::from("review"))
        );
        assert_eq!(
            record.fields().value(PropertyId::Summary),
            Some(Value::from("review"))
        );
        assert_eq!(record.fields().value(PropertyId::CalendarBookId), Some(Value::Int(4)));
        assert!(record.fields().dirty().contains(PropertyId::Summary));
        assert_eq!(record.kind(), RecordKind::Todo);
    }
}
