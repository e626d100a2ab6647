#![forbid(unsafe_code)]

//! Static view descriptors: which logical property lives in which column.
//!
//! Column names here are the only identifiers ever interpolated into SQL.

use calsvc_core::{PropertyId, ViewId};

/// How calendar-time properties are laid out in a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeModel {
    /// `<base>_type`, `<base>_utime` and `<base>_datetime` side by side.
    Mixed,
    /// Pre-expanded rows holding only `<base>_utime`.
    UtimeOnly,
    /// Pre-expanded rows holding only `<base>_datetime`.
    LocalOnly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyMap {
    pub property: PropertyId,
    /// Column name; for calendar-time properties the column base name.
    pub column: &'static str,
    pub writable: bool,
}

#[derive(Debug)]
pub struct ViewSpec {
    /// Table or SQL view rows are read from.
    pub source: &'static str,
    /// Physical table written by mutable views.
    pub table: Option<&'static str>,
    pub time_model: TimeModel,
    /// Property tables, concatenated; joined views append the book columns.
    pub segments: &'static [&'static [PropertyMap]],
}

impl ViewSpec {
    pub fn properties(&self) -> impl Iterator<Item = &'static PropertyMap> + '_ {
        self.segments.iter().flat_map(|segment| segment.iter())
    }

    pub fn map(&self, property: PropertyId) -> Option<&'static PropertyMap> {
        self.properties().find(|m| m.property == property)
    }

    pub fn is_instance(&self) -> bool {
        self.time_model != TimeModel::Mixed
    }
}

pub(crate) const fn rw(property: PropertyId, column: &'static str) -> PropertyMap {
    PropertyMap {
        property,
        column,
        writable: true,
    }
}

pub(crate) const fn ro(property: PropertyId, column: &'static str) -> PropertyMap {
    PropertyMap {
        property,
        column,
        writable: false,
    }
}

use PropertyId as P;

const BOOK_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::BookUid, "uid"),
    rw(P::BookName, "name"),
    rw(P::BookDescription, "description"),
    rw(P::BookColor, "color"),
    rw(P::BookLocation, "location"),
    rw(P::BookVisibility, "visibility"),
    rw(P::BookSyncEvent, "sync_event"),
    rw(P::BookAccountId, "account_id"),
    rw(P::BookStoreType, "store_type"),
    rw(P::BookMode, "mode"),
];

const EVENT_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::CalendarBookId, "calendar_id"),
    rw(P::Summary, "summary"),
    rw(P::Description, "description"),
    rw(P::Location, "location"),
    rw(P::Categories, "categories"),
    rw(P::Status, "status"),
    rw(P::Priority, "priority"),
    rw(P::Sensitivity, "sensitivity"),
    rw(P::Uid, "uid"),
    rw(P::OrganizerName, "organizer_name"),
    rw(P::OrganizerEmail, "organizer_email"),
    rw(P::BusyStatus, "busy_status"),
    rw(P::Start, "dtstart"),
    rw(P::StartTzid, "dtstart_tzid"),
    rw(P::End, "dtend"),
    rw(P::EndTzid, "dtend_tzid"),
    rw(P::Latitude, "latitude"),
    rw(P::Longitude, "longitude"),
    rw(P::OriginalEventId, "original_event_id"),
    rw(P::RecurrenceId, "recurrence_id"),
    rw(P::Exdate, "exdate"),
    ro(P::HasAlarm, "has_alarm"),
    ro(P::HasAttendee, "has_attendee"),
    ro(P::HasExtended, "has_extended"),
    ro(P::HasRrule, "has_rrule"),
    ro(P::CreatedTime, "created_time"),
    ro(P::LastModified, "last_mod"),
    ro(P::IsDeleted, "is_deleted"),
    ro(P::CreatedVersion, "created_ver"),
    ro(P::ChangedVersion, "changed_ver"),
];

const TODO_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::CalendarBookId, "calendar_id"),
    rw(P::Summary, "summary"),
    rw(P::Description, "description"),
    rw(P::Location, "location"),
    rw(P::Categories, "categories"),
    rw(P::Status, "status"),
    rw(P::Priority, "priority"),
    rw(P::Sensitivity, "sensitivity"),
    rw(P::Uid, "uid"),
    rw(P::OrganizerName, "organizer_name"),
    rw(P::OrganizerEmail, "organizer_email"),
    rw(P::Start, "dtstart"),
    rw(P::StartTzid, "dtstart_tzid"),
    rw(P::Due, "dtend"),
    rw(P::DueTzid, "dtend_tzid"),
    rw(P::CompletedTime, "completed_time"),
    rw(P::Progress, "progress"),
    rw(P::Latitude, "latitude"),
    rw(P::Longitude, "longitude"),
    ro(P::HasAlarm, "has_alarm"),
    ro(P::HasAttendee, "has_attendee"),
    ro(P::HasExtended, "has_extended"),
    ro(P::HasRrule, "has_rrule"),
    ro(P::CreatedTime, "created_time"),
    ro(P::LastModified, "last_mod"),
    ro(P::IsDeleted, "is_deleted"),
    ro(P::CreatedVersion, "created_ver"),
    ro(P::ChangedVersion, "changed_ver"),
];

const BOOK_JOIN: &[PropertyMap] = &[
    ro(P::BookName, "book_name"),
    ro(P::BookColor, "book_color"),
    ro(P::BookLocation, "book_location"),
    ro(P::BookVisibility, "book_visibility"),
    ro(P::BookSyncEvent, "book_sync_event"),
    ro(P::BookAccountId, "book_account_id"),
    ro(P::BookStoreType, "book_store_type"),
    ro(P::BookMode, "book_mode"),
];

const INSTANCE_PROPERTIES: &[PropertyMap] = &[
    ro(P::EventId, "event_id"),
    ro(P::CalendarBookId, "calendar_id"),
    ro(P::Start, "dtstart"),
    ro(P::End, "dtend"),
    ro(P::Summary, "summary"),
    ro(P::Description, "description"),
    ro(P::Location, "location"),
    ro(P::BusyStatus, "busy_status"),
    ro(P::Status, "status"),
    ro(P::Priority, "priority"),
    ro(P::Sensitivity, "sensitivity"),
    ro(P::HasRrule, "has_rrule"),
    ro(P::HasAlarm, "has_alarm"),
    ro(P::OriginalEventId, "original_event_id"),
    ro(P::Latitude, "latitude"),
    ro(P::Longitude, "longitude"),
    ro(P::BookVisibility, "book_visibility"),
    ro(P::BookAccountId, "book_account_id"),
];

const TIMEZONE_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::CalendarBookId, "calendar_id"),
    rw(P::TzOffsetFromGmt, "tz_offset_from_gmt"),
    rw(P::StandardName, "standard_name"),
    rw(P::StandardBias, "standard_bias"),
    rw(P::DaylightName, "day_light_name"),
    rw(P::DaylightBias, "day_light_bias"),
];

const EXTENDED_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::RecordId, "record_id"),
    rw(P::RecordType, "record_type"),
    rw(P::ExtendedKey, "ext_key"),
    rw(P::ExtendedValue, "ext_value"),
];

const ALARM_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::ParentId, "event_id"),
    rw(P::RemindTick, "remind_tick"),
    rw(P::RemindTickUnit, "remind_tick_unit"),
    rw(P::AlarmAction, "alarm_action"),
    rw(P::AlarmSummary, "alarm_summary"),
    rw(P::AlarmDescription, "alarm_description"),
    rw(P::AlarmAttach, "alarm_attach"),
    rw(P::AlarmTime, "alarm_time"),
];

const ATTENDEE_PROPERTIES: &[PropertyMap] = &[
    ro(P::Id, "id"),
    rw(P::ParentId, "event_id"),
    rw(P::AttendeeNumber, "attendee_number"),
    rw(P::AttendeeCutype, "attendee_cutype"),
    rw(P::AttendeeName, "attendee_name"),
    rw(P::AttendeeEmail, "attendee_email"),
    rw(P::AttendeeRole, "attendee_role"),
    rw(P::AttendeeStatus, "attendee_status"),
    rw(P::AttendeeRsvp, "attendee_rsvp"),
    rw(P::AttendeeUid, "attendee_uid"),
    rw(P::AttendeeMember, "attendee_member"),
    rw(P::AttendeeDelegateeUri, "attendee_delegatee_uri"),
    rw(P::AttendeeDelegatorUri, "attendee_delegator_uri"),
];

static BOOK: ViewSpec = ViewSpec {
    source: "calendar_book",
    table: Some("calendar_book"),
    time_model: TimeModel::Mixed,
    segments: &[BOOK_PROPERTIES],
};

static EVENT: ViewSpec = ViewSpec {
    source: "event_live",
    table: Some("schedule"),
    time_model: TimeModel::Mixed,
    segments: &[EVENT_PROPERTIES],
};

static TODO: ViewSpec = ViewSpec {
    source: "todo_live",
    table: Some("schedule"),
    time_model: TimeModel::Mixed,
    segments: &[TODO_PROPERTIES],
};

static TIMEZONE: ViewSpec = ViewSpec {
    source: "timezone",
    table: Some("timezone"),
    time_model: TimeModel::Mixed,
    segments: &[TIMEZONE_PROPERTIES],
};

static EXTENDED: ViewSpec = ViewSpec {
    source: "extended",
    table: Some("extended"),
    time_model: TimeModel::Mixed,
    segments: &[EXTENDED_PROPERTIES],
};

static ALARM: ViewSpec = ViewSpec {
    source: "alarm",
    table: Some("alarm"),
    time_model: TimeModel::Mixed,
    segments: &[ALARM_PROPERTIES],
};

static ATTENDEE: ViewSpec = ViewSpec {
    source: "attendee",
    table: Some("attendee"),
    time_model: TimeModel::Mixed,
    segments: &[ATTENDEE_PROPERTIES],
};

static EVENT_BOOK: ViewSpec = ViewSpec {
    source: "event_book",
    table: None,
    time_model: TimeModel::Mixed,
    segments: &[EVENT_PROPERTIES, BOOK_JOIN],
};

static TODO_BOOK: ViewSpec = ViewSpec {
    source: "todo_book",
    table: None,
    time_model: TimeModel::Mixed,
    segments: &[TODO_PROPERTIES, BOOK_JOIN],
};

static INSTANCE_UTIME_BOOK: ViewSpec = ViewSpec {
    source: "instance_utime_book",
    table: None,
    time_model: TimeModel::UtimeOnly,
    segments: &[INSTANCE_PROPERTIES],
};

static INSTANCE_LOCALTIME_BOOK: ViewSpec = ViewSpec {
    source: "instance_localtime_book",
    table: None,
    time_model: TimeModel::LocalOnly,
    segments: &[INSTANCE_PROPERTIES],
};

/// Every event and todo row, tombstones included. Read by the change feed.
pub(crate) static SCHEDULE_FEED: ViewSpec = ViewSpec {
    source: "schedule",
    table: Some("schedule"),
    time_model: TimeModel::Mixed,
    segments: &[&[
        ro(P::Id, "id"),
        ro(P::RecordType, "kind"),
        ro(P::CalendarBookId, "calendar_id"),
        ro(P::OriginalEventId, "original_event_id"),
        ro(P::IsDeleted, "is_deleted"),
        ro(P::CreatedVersion, "created_ver"),
        ro(P::ChangedVersion, "changed_ver"),
    ]],
};

/// Ledger of hard-deleted rows kept for synchronizing clients.
pub(crate) static DELETED_LEDGER: ViewSpec = ViewSpec {
    source: "deleted",
    table: Some("deleted"),
    time_model: TimeModel::Mixed,
    segments: &[&[
        ro(P::Id, "schedule_id"),
        ro(P::RecordType, "schedule_type"),
        ro(P::CalendarBookId, "calendar_id"),
        ro(P::OriginalEventId, "original_event_id"),
        ro(P::CreatedVersion, "created_ver"),
        ro(P::DeletedVersion, "deleted_ver"),
    ]],
};

pub fn view_spec(view: ViewId) -> &'static ViewSpec {
    match view {
        ViewId::Book => &BOOK,
        ViewId::Event => &EVENT,
        ViewId::Todo => &TODO,
        ViewId::Timezone => &TIMEZONE,
        ViewId::Extended => &EXTENDED,
        ViewId::Alarm => &ALARM,
        ViewId::Attendee => &ATTENDEE,
        ViewId::EventBook => &EVENT_BOOK,
        ViewId::TodoBook => &TODO_BOOK,
        ViewId::InstanceUtimeBook => &INSTANCE_UTIME_BOOK,
        ViewId::InstanceLocaltimeBook => &INSTANCE_LOCALTIME_BOOK,
    }
}
