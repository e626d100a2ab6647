#![forbid(unsafe_code)]

use crate::record::{
    Alarm, Attendee, CalendarBook, Event, ExtendedProperty, Instance, Record, RecordKind, Timezone,
    Todo, ViewRow,
};
use std::str::FromStr;

/// Stable view identifiers understood by the dispatch registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ViewId {
    Book,
    Event,
    Todo,
    Timezone,
    Extended,
    Alarm,
    Attendee,
    EventBook,
    TodoBook,
    InstanceUtimeBook,
    InstanceLocaltimeBook,
}

impl ViewId {
    pub const ALL: [ViewId; 11] = [
        ViewId::Book,
        ViewId::Event,
        ViewId::Todo,
        ViewId::Timezone,
        ViewId::Extended,
        ViewId::Alarm,
        ViewId::Attendee,
        ViewId::EventBook,
        ViewId::TodoBook,
        ViewId::InstanceUtimeBook,
        ViewId::InstanceLocaltimeBook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Book => "calendar.book",
            Self::Event => "calendar.event",
            Self::Todo => "calendar.todo",
            Self::Timezone => "calendar.timezone",
            Self::Extended => "calendar.extended_property",
            Self::Alarm => "calendar.alarm",
            Self::Attendee => "calendar.attendee",
            Self::EventBook => "calendar.event.calendar_book",
            Self::TodoBook => "calendar.todo.calendar_book",
            Self::InstanceUtimeBook => "calendar.instance_utime.calendar_book",
            Self::InstanceLocaltimeBook => "calendar.instance_localtime.calendar_book",
        }
    }

    /// Joined and derived views accept reads only.
    pub fn is_query_only(self) -> bool {
        !matches!(
            self,
            Self::Book | Self::Event | Self::Todo | Self::Timezone | Self::Extended
        )
    }

    /// Instance views resolve a single time representation per row.
    pub fn is_instance(self) -> bool {
        matches!(self, Self::InstanceUtimeBook | Self::InstanceLocaltimeBook)
    }

    pub fn record_kind(self) -> RecordKind {
        match self {
            Self::Book => RecordKind::Book,
            Self::Event | Self::EventBook => RecordKind::Event,
            Self::Todo | Self::TodoBook => RecordKind::Todo,
            Self::Timezone => RecordKind::Timezone,
            Self::Extended => RecordKind::Extended,
            Self::Alarm => RecordKind::Alarm,
            Self::Attendee => RecordKind::Attendee,
            Self::InstanceUtimeBook | Self::InstanceLocaltimeBook => RecordKind::Instance,
        }
    }

    /// Empty record that rows of this view are hydrated into.
    pub fn blank_record(self) -> Record {
        match self {
            Self::Book => Record::Book(CalendarBook::default()),
            Self::Event => Record::Event(Event::default()),
            Self::Todo => Record::Todo(Todo::default()),
            Self::Timezone => Record::Timezone(Timezone::default()),
            Self::Extended => Record::Extended(ExtendedProperty::default()),
            Self::Alarm => Record::Alarm(Alarm::default()),
            Self::Attendee => Record::Attendee(Attendee::default()),
            Self::InstanceUtimeBook | Self::InstanceLocaltimeBook => {
                Record::Instance(Instance::default())
            }
            Self::EventBook | Self::TodoBook => Record::Row(ViewRow::new(self.record_kind())),
        }
    }
}

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownView(pub String);

impl std::fmt::Display for UnknownView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown view: {}", self.0)
    }
}

impl std::error::Error for UnknownView {}

impl FromStr for ViewId {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|view| view.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_parse_back() {
        for view in ViewId::ALL {
            assert_eq!(view.as_str().parse::<ViewId>(), Ok(view));
        }
        assert!("calendar.nope".parse::<ViewId>().is_err());
    }

    #[test]
    fn only_base_views_are_mutable() {
        assert!(!ViewId::Todo.is_query_only());
        assert!(ViewId::TodoBook.is_query_only());
        assert!(ViewId::InstanceUtimeBook.is_instance());
        assert!(!ViewId::Event.is_instance());
    }
}
