#![forbid(unsafe_code)]

use crate::driver::Driver;
use crate::error::StoreError;
use std::collections::BTreeSet;

const REQUIRED_TABLES: [&str; 11] = [
    "version",
    "calendar_book",
    "schedule",
    "rrule",
    "alarm",
    "attendee",
    "extended",
    "timezone",
    "deleted",
    "instance_utime",
    "instance_localtime",
];

pub(crate) fn install_schema(driver: &Driver) -> Result<(), StoreError> {
    let conn = driver.connection();
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // Schedule delete cascades into exceptions, which live in the same table.
    conn.pragma_update(None, "recursive_triggers", "ON")?;

    preflight_gate(driver)?;

    driver.exec(
        r#"
        CREATE TABLE IF NOT EXISTS version (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          ver INTEGER NOT NULL
        );
        INSERT OR IGNORE INTO version(singleton, ver) VALUES (1, 0);

        CREATE TABLE IF NOT EXISTS calendar_book (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          uid TEXT,
          name TEXT,
          description TEXT,
          color TEXT,
          location TEXT,
          visibility INTEGER NOT NULL DEFAULT 1,
          sync_event INTEGER NOT NULL DEFAULT 0,
          account_id INTEGER NOT NULL DEFAULT 0,
          store_type INTEGER NOT NULL DEFAULT 3,
          mode INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS schedule (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          kind INTEGER NOT NULL,
          calendar_id INTEGER NOT NULL,
          summary TEXT,
          description TEXT,
          location TEXT,
          categories TEXT,
          status INTEGER NOT NULL DEFAULT 0,
          priority INTEGER NOT NULL DEFAULT 0,
          sensitivity INTEGER NOT NULL DEFAULT 0,
          uid TEXT,
          organizer_name TEXT,
          organizer_email TEXT,
          busy_status INTEGER NOT NULL DEFAULT 0,
          dtstart_type INTEGER,
          dtstart_utime INTEGER,
          dtstart_datetime TEXT,
          dtstart_tzid TEXT,
          dtend_type INTEGER,
          dtend_utime INTEGER,
          dtend_datetime TEXT,
          dtend_tzid TEXT,
          completed_time INTEGER,
          progress INTEGER NOT NULL DEFAULT 0,
          latitude REAL,
          longitude REAL,
          original_event_id INTEGER,
          recurrence_id TEXT,
          exdate TEXT,
          has_alarm INTEGER NOT NULL DEFAULT 0,
          has_attendee INTEGER NOT NULL DEFAULT 0,
          has_extended INTEGER NOT NULL DEFAULT 0,
          has_rrule INTEGER NOT NULL DEFAULT 0,
          created_time INTEGER NOT NULL DEFAULT 0,
          last_mod INTEGER NOT NULL DEFAULT 0,
          created_ver INTEGER NOT NULL,
          changed_ver INTEGER NOT NULL,
          is_deleted INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_schedule_book_changed
          ON schedule(calendar_id, kind, changed_ver);
        CREATE INDEX IF NOT EXISTS idx_schedule_original
          ON schedule(original_event_id);

        CREATE TABLE IF NOT EXISTS rrule (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          event_id INTEGER NOT NULL,
          freq INTEGER NOT NULL DEFAULT 0,
          rrule_interval INTEGER NOT NULL DEFAULT 1,
          range_type INTEGER NOT NULL DEFAULT 0,
          until_type INTEGER,
          until_utime INTEGER,
          until_datetime TEXT,
          count INTEGER NOT NULL DEFAULT 0,
          byday TEXT,
          bymonthday TEXT,
          bymonth TEXT,
          wkst INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_rrule_event ON rrule(event_id);

        CREATE TABLE IF NOT EXISTS alarm (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          event_id INTEGER NOT NULL,
          remind_tick INTEGER NOT NULL DEFAULT 0,
          remind_tick_unit INTEGER NOT NULL DEFAULT 0,
          alarm_action INTEGER NOT NULL DEFAULT 0,
          alarm_summary TEXT,
          alarm_description TEXT,
          alarm_attach TEXT,
          alarm_time_type INTEGER,
          alarm_time_utime INTEGER,
          alarm_time_datetime TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_alarm_event ON alarm(event_id);

        CREATE TABLE IF NOT EXISTS attendee (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          event_id INTEGER NOT NULL,
          attendee_number TEXT,
          attendee_cutype INTEGER NOT NULL DEFAULT 0,
          attendee_name TEXT,
          attendee_email TEXT,
          attendee_role INTEGER NOT NULL DEFAULT 0,
          attendee_status INTEGER NOT NULL DEFAULT 0,
          attendee_rsvp INTEGER NOT NULL DEFAULT 0,
          attendee_uid TEXT,
          attendee_member TEXT,
          attendee_delegatee_uri TEXT,
          attendee_delegator_uri TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_attendee_event ON attendee(event_id);

        CREATE TABLE IF NOT EXISTS extended (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          record_id INTEGER NOT NULL,
          record_type INTEGER NOT NULL,
          ext_key TEXT,
          ext_value TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_extended_record ON extended(record_id, record_type);

        CREATE TABLE IF NOT EXISTS timezone (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          calendar_id INTEGER NOT NULL,
          tz_offset_from_gmt INTEGER NOT NULL DEFAULT 0,
          standard_name TEXT,
          standard_bias INTEGER NOT NULL DEFAULT 0,
          day_light_name TEXT,
          day_light_bias INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS deleted (
          schedule_id INTEGER NOT NULL,
          schedule_type INTEGER NOT NULL,
          calendar_id INTEGER NOT NULL,
          original_event_id INTEGER,
          created_ver INTEGER NOT NULL,
          deleted_ver INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_deleted_book_ver ON deleted(calendar_id, deleted_ver);

        CREATE TABLE IF NOT EXISTS instance_utime (
          event_id INTEGER NOT NULL,
          dtstart_utime INTEGER NOT NULL,
          dtend_utime INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_instance_utime_event ON instance_utime(event_id);

        CREATE TABLE IF NOT EXISTS instance_localtime (
          event_id INTEGER NOT NULL,
          dtstart_datetime TEXT NOT NULL,
          dtend_datetime TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_instance_localtime_event ON instance_localtime(event_id);

        CREATE TRIGGER IF NOT EXISTS trg_schedule_del AFTER DELETE ON schedule
        BEGIN
          DELETE FROM rrule WHERE event_id = old.id;
          DELETE FROM alarm WHERE event_id = old.id;
          DELETE FROM attendee WHERE event_id = old.id;
          DELETE FROM extended WHERE record_id = old.id AND record_type = old.kind;
          DELETE FROM instance_utime WHERE event_id = old.id;
          DELETE FROM instance_localtime WHERE event_id = old.id;
          DELETE FROM schedule WHERE original_event_id = old.id;
        END;

        CREATE TRIGGER IF NOT EXISTS trg_schedule_tombstone
        AFTER UPDATE OF is_deleted ON schedule
        WHEN new.is_deleted = 1 AND old.is_deleted = 0
        BEGIN
          DELETE FROM instance_utime WHERE event_id = old.id;
          DELETE FROM instance_localtime WHERE event_id = old.id;
        END;

        -- Ledger rows outlive their book until purged after sync.
        DROP TRIGGER IF EXISTS trg_book_del;
        CREATE TRIGGER IF NOT EXISTS trg_book_del AFTER DELETE ON calendar_book
        BEGIN
          DELETE FROM schedule WHERE calendar_id = old.id;
          DELETE FROM timezone WHERE calendar_id = old.id;
          DELETE FROM extended WHERE record_id = old.id AND record_type = 3;
        END;

        CREATE VIEW IF NOT EXISTS event_live AS
          SELECT * FROM schedule WHERE kind = 1 AND is_deleted = 0;

        CREATE VIEW IF NOT EXISTS todo_live AS
          SELECT * FROM schedule WHERE kind = 2 AND is_deleted = 0;

        CREATE VIEW IF NOT EXISTS event_all AS
          SELECT * FROM schedule WHERE kind = 1;

        CREATE VIEW IF NOT EXISTS todo_all AS
          SELECT * FROM schedule WHERE kind = 2;

        CREATE VIEW IF NOT EXISTS event_book AS
          SELECT s.*,
                 b.name AS book_name,
                 b.color AS book_color,
                 b.location AS book_location,
                 b.visibility AS book_visibility,
                 b.sync_event AS book_sync_event,
                 b.account_id AS book_account_id,
                 b.store_type AS book_store_type,
                 b.mode AS book_mode
          FROM schedule s JOIN calendar_book b ON s.calendar_id = b.id
          WHERE s.kind = 1 AND s.is_deleted = 0;

        CREATE VIEW IF NOT EXISTS todo_book AS
          SELECT s.*,
                 b.name AS book_name,
                 b.color AS book_color,
                 b.location AS book_location,
                 b.visibility AS book_visibility,
                 b.sync_event AS book_sync_event,
                 b.account_id AS book_account_id,
                 b.store_type AS book_store_type,
                 b.mode AS book_mode
          FROM schedule s JOIN calendar_book b ON s.calendar_id = b.id
          WHERE s.kind = 2 AND s.is_deleted = 0;

        CREATE VIEW IF NOT EXISTS instance_utime_book AS
          SELECT i.event_id, i.dtstart_utime, i.dtend_utime,
                 s.calendar_id, s.summary, s.description, s.location,
                 s.busy_status, s.status, s.priority, s.sensitivity,
                 s.has_rrule, s.has_alarm, s.original_event_id,
                 s.latitude, s.longitude,
                 b.visibility AS book_visibility,
                 b.account_id AS book_account_id
          FROM instance_utime i
          JOIN schedule s ON i.event_id = s.id
          JOIN calendar_book b ON s.calendar_id = b.id
          WHERE s.is_deleted = 0;

        CREATE VIEW IF NOT EXISTS instance_localtime_book AS
          SELECT i.event_id, i.dtstart_datetime, i.dtend_datetime,
                 s.calendar_id, s.summary, s.description, s.location,
                 s.busy_status, s.status, s.priority, s.sensitivity,
                 s.has_rrule, s.has_alarm, s.original_event_id,
                 s.latitude, s.longitude,
                 b.visibility AS book_visibility,
                 b.account_id AS book_account_id
          FROM instance_localtime i
          JOIN schedule s ON i.event_id = s.id
          JOIN calendar_book b ON s.calendar_id = b.id
          WHERE s.is_deleted = 0;
        "#,
    )?;
    Ok(())
}

/// A non-empty database must already carry every table we own.
fn preflight_gate(driver: &Driver) -> Result<(), StoreError> {
    let tables: BTreeSet<String> = driver
        .query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            &[],
            |row| row.get::<_, String>(0),
        )?
        .into_iter()
        .collect();

    if tables.is_empty() {
        return Ok(());
    }

    for table in REQUIRED_TABLES {
        if !tables.contains(table) {
            return Err(StoreError::DbFailed("RESET_REQUIRED: required table is missing"));
        }
    }
    Ok(())
}
