#![forbid(unsafe_code)]

use crate::caltime::CalTime;
use crate::codes::{self, EventStatus, TodoStatus};
use crate::property::{DirtyMask, Fields, PropertyId, Value, put};
use crate::record::{Alarm, Attendee, Children, ExtendedProperty, Rrule};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i32,
    pub calendar_book_id: i32,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Option<String>,
    pub status: EventStatus,
    pub priority: codes::Priority,
    pub sensitivity: codes::Sensitivity,
    pub uid: Option<String>,
    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub busy_status: codes::BusyStatus,
    pub start: Option<CalTime>,
    pub start_tzid: Option<String>,
    pub end: Option<CalTime>,
    pub end_tzid: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Set on exceptions: the recurring event this one overrides.
    pub original_event_id: Option<i32>,
    pub recurrence_id: Option<String>,
    pub exdate: Option<String>,
    pub has_alarm: bool,
    pub has_attendee: bool,
    pub has_extended: bool,
    pub has_rrule: bool,
    pub created_time: i64,
    pub last_modified: i64,
    pub is_deleted: bool,
    pub created_version: i64,
    pub changed_version: i64,
    pub children: Children,
    #[serde(default)]
    dirty: DirtyMask,
}

impl Event {
    pub fn new(calendar_book_id: i32) -> Self {
        Self {
            calendar_book_id,
            ..Self::default()
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.assign(PropertyId::Summary, Value::Text(summary.into()));
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.assign(PropertyId::Description, Value::Text(description.into()));
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.assign(PropertyId::Location, Value::Text(location.into()));
    }

    pub fn set_status(&mut self, status: EventStatus) {
        self.assign(PropertyId::Status, Value::Int(status.code()));
    }

    pub fn set_priority(&mut self, priority: codes::Priority) {
        self.assign(PropertyId::Priority, Value::Int(priority.code()));
    }

    pub fn set_busy_status(&mut self, busy_status: codes::BusyStatus) {
        self.assign(PropertyId::BusyStatus, Value::Int(busy_status.code()));
    }

    pub fn set_start(&mut self, start: CalTime) {
        self.assign(PropertyId::Start, Value::CalTime(start));
    }

    pub fn set_end(&mut self, end: CalTime) {
        self.assign(PropertyId::End, Value::CalTime(end));
    }

    pub fn add_alarm(&mut self, alarm: Alarm) {
        self.children.alarms.push(alarm);
    }

    pub fn add_attendee(&mut self, attendee: Attendee) {
        self.children.attendees.push(attendee);
    }

    pub fn add_extended(&mut self, property: ExtendedProperty) {
        self.children.extended.push(property);
    }

    pub fn set_rrule(&mut self, rrule: Option<Rrule>) {
        self.children.rrule = rrule;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

impl Fields for Event {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            CalendarBookId => self.calendar_book_id.into(),
            Summary => self.summary.clone().into(),
            Description => self.description.clone().into(),
            Location => self.location.clone().into(),
            Categories => self.categories.clone().into(),
            Status => self.status.code().into(),
            Priority => self.priority.code().into(),
            Sensitivity => self.sensitivity.code().into(),
            Uid => self.uid.clone().into(),
            OrganizerName => self.organizer_name.clone().into(),
            OrganizerEmail => self.organizer_email.clone().into(),
            BusyStatus => self.busy_status.code().into(),
            Start => self.start.into(),
            StartTzid => self.start_tzid.clone().into(),
            End => self.end.into(),
            EndTzid => self.end_tzid.clone().into(),
            Latitude => self.latitude.into(),
            Longitude => self.longitude.into(),
            OriginalEventId => self.original_event_id.into(),
            RecurrenceId => self.recurrence_id.clone().into(),
            Exdate => self.exdate.clone().into(),
            HasAlarm => self.has_alarm.into(),
            HasAttendee => self.has_attendee.into(),
            HasExtended => self.has_extended.into(),
            HasRrule => self.has_rrule.into(),
            CreatedTime => self.created_time.into(),
            LastModified => self.last_modified.into(),
            IsDeleted => self.is_deleted.into(),
            CreatedVersion => self.created_version.into(),
            ChangedVersion => self.changed_version.into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            CalendarBookId => put(&mut self.calendar_book_id, value.into_i32()),
            Summary => put(&mut self.summary, value.into_opt_text()),
            Description => put(&mut self.description, value.into_opt_text()),
            Location => put(&mut self.location, value.into_opt_text()),
            Categories => put(&mut self.categories, value.into_opt_text()),
            Status => put(&mut self.status, value.into_i32().map(EventStatus::from_code)),
            Priority => put(
                &mut self.priority,
                value.into_i32().map(codes::Priority::from_code),
            ),
            Sensitivity => put(
                &mut self.sensitivity,
                value.into_i32().map(codes::Sensitivity::from_code),
            ),
            Uid => put(&mut self.uid, value.into_opt_text()),
            OrganizerName => put(&mut self.organizer_name, value.into_opt_text()),
            OrganizerEmail => put(&mut self.organizer_email, value.into_opt_text()),
            BusyStatus => put(
                &mut self.busy_status,
                value.into_i32().map(codes::BusyStatus::from_code),
            ),
            Start => put(&mut self.start, value.into_opt_caltime()),
            StartTzid => put(&mut self.start_tzid, value.into_opt_text()),
            End => put(&mut self.end, value.into_opt_caltime()),
            EndTzid => put(&mut self.end_tzid, value.into_opt_text()),
            Latitude => put(&mut self.latitude, value.into_opt_f64()),
            Longitude => put(&mut self.longitude, value.into_opt_f64()),
            OriginalEventId => put(&mut self.original_event_id, value.into_opt_i32()),
            RecurrenceId => put(&mut self.recurrence_id, value.into_opt_text()),
            Exdate => put(&mut self.exdate, value.into_opt_text()),
            HasAlarm => put(&mut self.has_alarm, value.into_bool()),
            HasAttendee => put(&mut self.has_attendee, value.into_bool()),
            HasExtended => put(&mut self.has_extended, value.into_bool()),
            HasRrule => put(&mut self.has_rrule, value.into_bool()),
            CreatedTime => put(&mut self.created_time, value.into_i64()),
            LastModified => put(&mut self.last_modified, value.into_i64()),
            IsDeleted => put(&mut self.is_deleted, value.into_bool()),
            CreatedVersion => put(&mut self.created_version, value.into_i64()),
            ChangedVersion => put(&mut self.changed_version, value.into_i64()),
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
pub struct Todo {
    pub id: i32,
    pub calendar_book_id: i32,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Option<String>,
    pub status: TodoStatus,
    pub priority: codes::Priority,
    pub sensitivity: codes::Sensitivity,
    pub uid: Option<String>,
    pub organizer_name: Option<String>,
    pub organizer_email: Option<String>,
    pub start: Option<CalTime>,
    pub start_tzid: Option<String>,
    pub due: Option<CalTime>,
    pub due_tzid: Option<String>,
    pub completed_time: Option<i64>,
    pub progress: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_alarm: bool,
    pub has_attendee: bool,
    pub has_extended: bool,
    pub has_rrule: bool,
    pub created_time: i64,
    pub last_modified: i64,
    pub is_deleted: bool,
    pub created_version: i64,
    pub changed_version: i64,
    pub children: Children,
    #[serde(default)]
    dirty: DirtyMask,
}

impl Todo {
    pub fn new(calendar_book_id: i32) -> Self {
        Self {
            calendar_book_id,
            ..Self::default()
        }
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.assign(PropertyId::Summary, Value::Text(summary.into()));
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.assign(PropertyId::Description, Value::Text(description.into()));
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.assign(PropertyId::Location, Value::Text(location.into()));
    }

    pub fn set_status(&mut self, status: TodoStatus) {
        self.assign(PropertyId::Status, Value::Int(status.code()));
    }

    pub fn set_priority(&mut self, priority: codes::Priority) {
        self.assign(PropertyId::Priority, Value::Int(priority.code()));
    }

    pub fn set_start(&mut self, start: CalTime) {
        self.assign(PropertyId::Start, Value::CalTime(start));
    }

    pub fn set_due(&mut self, due: CalTime) {
        self.assign(PropertyId::Due, Value::CalTime(due));
    }

    pub fn set_progress(&mut self, progress: i32) {
        self.assign(PropertyId::Progress, Value::Int(progress));
    }

    pub fn set_completed_time(&mut self, completed_time: i64) {
        self.assign(PropertyId::CompletedTime, Value::Int64(completed_time));
    }

    pub fn add_alarm(&mut self, alarm: Alarm) {
        self.children.alarms.push(alarm);
    }

    pub fn add_attendee(&mut self, attendee: Attendee) {
        self.children.attendees.push(attendee);
    }

    pub fn add_extended(&mut self, property: ExtendedProperty) {
        self.children.extended.push(property);
    }

    pub fn set_rrule(&mut self, rrule: Option<Rrule>) {
        self.children.rrule = rrule;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }
}

impl Fields for Todo {
    fn value(&self, property: PropertyId) -> Option<Value> {
        use PropertyId::*;
        Some(match property {
            Id => self.id.into(),
            CalendarBookId => self.calendar_book_id.into(),
            Summary => self.summary.clone().into(),
            Description => self.description.clone().into(),
            Location => self.location.clone().into(),
            Categories => self.categories.clone().into(),
            Status => self.status.code().into(),
            Priority => self.priority.code().into(),
            Sensitivity => self.sensitivity.code().into(),
            Uid => self.uid.clone().into(),
            OrganizerName => self.organizer_name.clone().into(),
            OrganizerEmail => self.organizer_email.clone().into(),
            Start => self.start.into(),
            StartTzid => self.start_tzid.clone().into(),
            Due => self.due.into(),
            DueTzid => self.due_tzid.clone().into(),
            CompletedTime => self.completed_time.into(),
            Progress => self.progress.into(),
            Latitude => self.latitude.into(),
            Longitude => self.longitude.into(),
            HasAlarm => self.has_alarm.into(),
            HasAttendee => self.has_attendee.into(),
            HasExtended => self.has_extended.into(),
            HasRrule => self.has_rrule.into(),
            CreatedTime => self.created_time.into(),
            LastModified => self.last_modified.into(),
            IsDeleted => self.is_deleted.into(),
            CreatedVersion => self.created_version.into(),
            ChangedVersion => self.changed_version.into(),
            _ => return None,
        })
    }

    fn set_value(&mut self, property: PropertyId, value: Value) -> bool {
        use PropertyId::*;
        match property {
            Id => put(&mut self.id, value.into_i32()),
            CalendarBookId => put(&mut self.calendar_book_id, value.into_i32()),
            Summary => put(&mut self.summary, value.into_opt_text()),
            Description => put(&mut self.description, value.into_opt_text()),
            Location => put(&mut self.location, value.into_opt_text()),
            Categories => put(&mut self.categories, value.into_opt_text()),
            Status => put(&mut self.status, value.into_i32().map(TodoStatus::from_code)),
            Priority => put(
                &mut self.priority,
                value.into_i32().map(codes::Priority::from_code),
            ),
            Sensitivity => put(
                &mut self.sensitivity,
                value.into_i32().map(codes::Sensitivity::from_code),
            ),
            Uid => put(&mut self.uid, value.into_opt_text()),
            OrganizerName => put(&mut self.organizer_name, value.into_opt_text()),
            OrganizerEmail => put(&mut self.organizer_email, value.into_opt_text()),
            Start => put(&mut self.start, value.into_opt_caltime()),
            StartTzid => put(&mut self.start_tzid, value.into_opt_text()),
            Due => put(&mut self.due, value.into_opt_caltime()),
            DueTzid => put(&mut self.due_tzid, value.into_opt_text()),
            CompletedTime => put(&mut self.completed_time, value.into_opt_i64()),
            Progress => put(&mut self.progress, value.into_i32()),
            Latitude => put(&mut self.latitude, value.into_opt_f64()),
            Longitude => put(&mut self.longitude, value.into_opt_f64()),
            HasAlarm => put(&mut self.has_alarm, value.into_bool()),
            HasAttendee => put(&mut self.has_attendee, value.into_bool()),
            HasExtended => put(&mut self.has_extended, value.into_bool()),
            HasRrule => put(&mut self.has_rrule, value.into_bool()),
            CreatedTime => put(&mut self.created_time, value.into_i64()),
            LastModified => put(&mut self.last_modified, value.into_i64()),
            IsDeleted => put(&mut self.is_deleted, value.into_bool()),
            CreatedVersion => put(&mut self.created_version, value.into_i64()),
            ChangedVersion => put(&mut self.changed_version, value.into_i64()),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_setters_mark_dirty_and_plain_fields_do_not() {
        let mut todo = Todo::new(1);
        todo.summary = Some("plain".to_string());
        assert!(todo.dirty().is_empty());

        todo.set_priority(codes::Priority::High);
        assert!(todo.dirty().contains(PropertyId::Priority));
        assert_eq!(todo.dirty().len(), 1);

        todo.add_alarm(Alarm::default());
        assert_eq!(todo.dirty().len(), 1, "children never mark dirty");
    }

    #[test]
    fn set_value_rejects_kind_mismatch() {
        let mut event = Event::new(1);
        assert!(!event.set_value(PropertyId::Summary, Value::Int(3)));
        assert!(event.set_value(PropertyId::Summary, Value::Null));
        assert!(!event.set_value(PropertyId::Due, Value::Null), "todo-only property");
        assert!(event.set_value(PropertyId::OriginalEventId, Value::Int(7)));
        assert_eq!(event.original_event_id, Some(7));
    }
}
