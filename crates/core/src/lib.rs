#![forbid(unsafe_code)]

//! Domain types of the calendar store: calendar time, records and their
//! child collections, property ids, views, filters and queries.

pub mod caltime;
pub mod codes;
pub mod filter;
pub mod property;
pub mod query;
pub mod record;
pub mod view;

pub use caltime::{CalTime, CalTimeError, LocalDateTime};
pub use filter::{
    AttributeFilter, CompositeFilter, Condition, Filter, LogicalOp, NumericOp, TextMatch,
};
pub use property::{DirtyMask, Fields, PropertyId, Value, ValueKind};
pub use query::{Query, Sort};
pub use record::{Record, RecordKind};
pub use view::ViewId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_datetime_db_form_orders_chronologically() {
        let earlier = LocalDateTime::try_new(2024, 2, 29, 9, 0, 0).expect("leap day");
        let later = LocalDateTime::try_new(2024, 12, 1, 0, 0, 0).expect("december");
        assert_eq!(earlier.to_db_string(), "20240229T090000");
        assert!(earlier.to_db_string() < later.to_db_string());
        assert_eq!(LocalDateTime::parse_db("20240229T090000"), Ok(earlier));
    }

    #[test]
    fn local_datetime_rejects_impossible_dates() {
        assert_eq!(
            LocalDateTime::try_new(2023, 2, 29, 0, 0, 0),
            Err(CalTimeError::InvalidDate)
        );
        assert_eq!(
            LocalDateTime::try_new(2023, 1, 1, 24, 0, 0),
            Err(CalTimeError::InvalidTime)
        );
        assert_eq!(
            LocalDateTime::parse_db("2023-01-01"),
            Err(CalTimeError::InvalidFormat)
        );
    }

    #[test]
    fn caltime_rebuilds_from_columns() {
        assert_eq!(
            CalTime::from_columns(Some(0), Some(1_700_000_000), None),
            Some(CalTime::Utime(1_700_000_000))
        );
        let local = LocalDateTime::date(2024, 5, 1).expect("date");
        assert_eq!(
            CalTime::from_columns(Some(1), None, Some("20240501T000000")),
            Some(CalTime::LocalTime(local))
        );
        assert_eq!(CalTime::from_columns(None, Some(5), None), None);
    }

    #[test]
    fn records_serialize_with_serde() {
        let mut todo = record::Todo::new(2);
        todo.set_summary("write report");
        let json = serde_json::to_string(&todo).expect("serialize");
        let back: record::Todo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, todo);
    }
}
