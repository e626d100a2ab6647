#![forbid(unsafe_code)]

//! View identifier to plugin dispatch, resolved once into a table.

use crate::error::StoreError;
use crate::plugins::{
    BookPlugin, EventPlugin, ExtendedPlugin, QueryOnlyPlugin, RecordPlugin, SchedulePlugin,
    TimezonePlugin, TodoPlugin,
};
use calsvc_core::{Record, RecordKind, ViewId};
use std::collections::BTreeMap;

static BOOK: BookPlugin = BookPlugin;
static EVENT: EventPlugin = SchedulePlugin::new();
static TODO: TodoPlugin = SchedulePlugin::new();
static TIMEZONE: TimezonePlugin = TimezonePlugin;
static EXTENDED: ExtendedPlugin = ExtendedPlugin;
static ALARM: QueryOnlyPlugin = QueryOnlyPlugin::new(ViewId::Alarm);
static ATTENDEE: QueryOnlyPlugin = QueryOnlyPlugin::new(ViewId::Attendee);
static EVENT_BOOK: QueryOnlyPlugin = QueryOnlyPlugin::new(ViewId::EventBook);
static TODO_BOOK: QueryOnlyPlugin = QueryOnlyPlugin::new(ViewId::TodoBook);
static INSTANCE_UTIME_BOOK: QueryOnlyPlugin = QueryOnlyPlugin::new(ViewId::InstanceUtimeBook);
static INSTANCE_LOCALTIME_BOOK: QueryOnlyPlugin =
    QueryOnlyPlugin::new(ViewId::InstanceLocaltimeBook);

fn plugin_for(view: ViewId) -> &'static dyn RecordPlugin {
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

/// Lookup table from view identifier strings to their plugins.
pub struct PluginRegistry {
    table: BTreeMap<&'static str, &'static dyn RecordPlugin>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("views", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        let table = ViewId::ALL
            .into_iter()
            .map(|view| (view.as_str(), plugin_for(view)))
            .collect();
        Self { table }
    }

    /// Plugin behind a view identifier string such as `calendar.todo`.
    pub fn resolve(&self, view: &str) -> Result<&'static dyn RecordPlugin, StoreError> {
        self.table
            .get(view)
            .copied()
            .ok_or(StoreError::InvalidParameter("unknown view identifier"))
    }

    pub fn plugin(&self, view: ViewId) -> &'static dyn RecordPlugin {
        plugin_for(view)
    }

    /// Plugin owning a record of this kind. Instances and joined rows have
    /// no writable owner.
    pub fn for_record(&self, record: &Record) -> Result<&'static dyn RecordPlugin, StoreError> {
        if matches!(record, Record::Row(_)) {
            return Err(StoreError::InvalidParameter("joined rows cannot be written"));
        }
        let view = match record.kind() {
            RecordKind::Book => ViewId::Book,
            RecordKind::Event => ViewId::Event,
            RecordKind::Todo => ViewId::Todo,
            RecordKind::Timezone => ViewId::Timezone,
            RecordKind::Extended => ViewId::Extended,
            RecordKind::Alarm | RecordKind::Attendee | RecordKind::Instance => {
                return Err(StoreError::InvalidParameter(
                    "record kind has no standalone plugin",
                ));
            }
        };
        Ok(plugin_for(view))
    }

    pub fn views(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StoreSession;
    use calsvc_core::record::{CalendarBook, Instance, Todo};

    #[test]
    fn every_view_resolves_to_its_own_plugin() {
        let registry = PluginRegistry::new();
        assert_eq!(registry.views().count(), ViewId::ALL.len());
        for view in ViewId::ALL {
            let plugin = registry.resolve(view.as_str()).expect("registered view");
            assert_eq!(plugin.view(), view);
            assert_eq!(registry.plugin(view).view(), view);
        }
    }

    #[test]
    fn unknown_identifiers_are_invalid() {
        let registry = PluginRegistry::new();
        assert!(matches!(
            registry.resolve("calendar.journal"),
            Err(StoreError::InvalidParameter(_))
        ));
        assert!(matches!(
            registry.resolve(""),
            Err(StoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn records_route_by_kind() {
        let registry = PluginRegistry::new();
        let todo = Record::from(Todo::new(1));
        assert_eq!(registry.for_record(&todo).expect("todo").view(), ViewId::Todo);
        let book = Record::from(CalendarBook::new("home"));
        assert_eq!(registry.for_record(&book).expect("book").view(), ViewId::Book);
        assert!(registry
            .for_record(&Record::Instance(Instance::default()))
            .is_err());
    }

    #[test]
    fn query_only_views_reject_writes() {
        let registry = PluginRegistry::new();
        let mut session = StoreSession::open_in_memory().expect("open");
        let plugin = registry.resolve("calendar.todo.calendar_book").expect("view");
        let record = Record::from(Todo::new(1));
        assert!(matches!(
            plugin.insert(&mut session, &record),
            Err(StoreError::InvalidParameter(_))
        ));
        assert!(matches!(
            plugin.delete(&mut session, 1),
            Err(StoreError::InvalidParameter(_))
        ));
        assert_eq!(plugin.get_count(&session).expect("count"), 0);
    }
}
