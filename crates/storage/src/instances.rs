#![forbid(unsafe_code)]

//! Expansion of events into occurrence rows.
//!
//! Each event gets its rows in the instance table matching the
//! representation of its start time. Daily and weekly rules step by whole
//! days; monthly and yearly rules keep the start's day of month and skip
//! periods where that date does not exist.

use crate::error::StoreError;
use crate::plugins::children::load_rrule;
use crate::plugins::write::int;
use crate::session::StoreSession;
use calsvc_core::codes::Frequency;
use calsvc_core::record::{RecurrenceRange, Rrule};
use calsvc_core::{CalTime, LocalDateTime};
use rusqlite::types::Value as SqlValue;
use time::{Date, Duration, Month, PrimitiveDateTime};

/// One occurrence: start and end in the event's own representation.
pub type Occurrence = (CalTime, CalTime);

pub fn expand(
    start: CalTime,
    end: Option<CalTime>,
    rrule: Option<&Rrule>,
    horizon_days: u32,
    max_instances: u32,
) -> Vec<Occurrence> {
    let Ok(first) = start.to_primitive() else {
        return Vec::new();
    };
    let length = end
        .filter(|end| end.is_utime() == start.is_utime())
        .and_then(|end| end.to_primitive().ok())
        .map(|end| end - first)
        .filter(|length| !length.is_negative())
        .unwrap_or(Duration::ZERO);

    let rule = rrule.filter(|rule| rule.freq != Frequency::None);
    let Some(rule) = rule else {
        return occurrence(start.is_utime(), first, length).into_iter().collect();
    };

    let horizon = first
        .checked_add(Duration::days(i64::from(horizon_days)))
        .unwrap_or(PrimitiveDateTime::MAX);
    let until = match rule.range {
        RecurrenceRange::Until(until) => until.to_primitive().ok(),
        _ => None,
    };
    let count = match rule.range {
        RecurrenceRange::Count(count) => Some(usize::try_from(count.max(0)).unwrap_or(0)),
        _ => None,
    };
    let limit = usize::try_from(max_instances).unwrap_or(usize::MAX);
    let interval = i64::from(rule.interval.max(1));

    let mut out = Vec::new();
    for step in 0i64.. {
        if out.len() >= limit || count.is_some_and(|count| out.len() >= count) {
            break;
        }
        let Some(candidate) = nth_candidate(first, rule.freq, step * interval) else {
            // Past the representable range.
            break;
        };
        if candidate.at() > horizon || until.is_some_and(|until| candidate.at() > until) {
            break;
        }
        let Some(candidate) = candidate.valid() else {
            continue;
        };
        match occurrence(start.is_utime(), candidate, length) {
            Some(pair) => out.push(pair),
            None => break,
        }
    }
    out
}

/// A candidate start; `Skipped` marks periods where the day of month does
/// not exist but later periods may.
#[derive(Clone, Copy, Debug)]
enum Candidate {
    Valid(PrimitiveDateTime),
    Skipped(PrimitiveDateTime),
}

impl Candidate {
    fn at(self) -> PrimitiveDateTime {
        match self {
            Self::Valid(at) | Self::Skipped(at) => at,
        }
    }

    fn valid(self) -> Option<PrimitiveDateTime> {
        match self {
            Self::Valid(at) => Some(at),
            Self::Skipped(_) => None,
        }
    }
}

fn nth_candidate(first: PrimitiveDateTime, freq: Frequency, steps: i64) -> Option<Candidate> {
    match freq {
        Frequency::Daily => first
            .checked_add(Duration::days(steps))
            .map(Candidate::Valid),
        Frequency::Weekly => first
            .checked_add(Duration::weeks(steps))
            .map(Candidate::Valid),
        Frequency::Monthly => shift_months(first, steps),
        Frequency::Yearly => shift_months(first, steps.checked_mul(12)?),
        Frequency::None => None,
    }
}

fn shift_months(first: PrimitiveDateTime, months: i64) -> Option<Candidate> {
    let origin = i64::from(first.year()) * 12 + i64::from(u8::from(first.month())) - 1;
    let target = origin.checked_add(months)?;
    let year = i32::try_from(target.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(target.rem_euclid(12) + 1).ok()?).ok()?;
    match Date::from_calendar_date(year, month, first.day()) {
        Ok(date) => Some(Candidate::Valid(PrimitiveDateTime::new(date, first.time()))),
        Err(_) => {
            // Order against the horizon by the first day of that month.
            let anchor = Date::from_calendar_date(year, month, 1).ok()?;
            Some(Candidate::Skipped(PrimitiveDateTime::new(anchor, first.time())))
        }
    }
}

fn occurrence(utime: bool, start: PrimitiveDateTime, length: Duration) -> Option<Occurrence> {
    let end = start.checked_add(length)?;
    if utime {
        Some((
            CalTime::Utime(start.assume_utc().unix_timestamp()),
            CalTime::Utime(end.assume_utc().unix_timestamp()),
        ))
    } else {
        Some((
            CalTime::LocalTime(LocalDateTime::from_primitive(start).ok()?),
            CalTime::LocalTime(LocalDateTime::from_primitive(end).ok()?),
        ))
    }
}

/// Rewrites the instance rows of one event from its stored start, end and
/// recurrence rule. Tombstoned or start-less events end up with none.
pub(crate) fn refresh(session: &StoreSession, event_id: i32) -> Result<(), StoreError> {
    let driver = session.driver();
    let owner = [int(event_id)];
    driver.execute("DELETE FROM instance_utime WHERE event_id = ?", &owner)?;
    driver.execute("DELETE FROM instance_localtime WHERE event_id = ?", &owner)?;

    let stored = driver.query_optional(
        "SELECT dtstart_type, dtstart_utime, dtstart_datetime, \
         dtend_type, dtend_utime, dtend_datetime, has_rrule \
         FROM schedule WHERE id = ? AND kind = 1 AND is_deleted = 0",
        &owner,
        |row| {
            let start = CalTime::from_columns(
                row.get(0)?,
                row.get(1)?,
                row.get::<_, Option<String>>(2)?.as_deref(),
            );
            let end = CalTime::from_columns(
                row.get(3)?,
                row.get(4)?,
                row.get::<_, Option<String>>(5)?.as_deref(),
            );
            Ok((start, end, row.get::<_, bool>(6)?))
        },
    )?;
    let Some((Some(start), end, has_rrule)) = stored else {
        return Ok(());
    };
    let rrule = if has_rrule {
        load_rrule(driver, event_id)?
    } else {
        None
    };

    let config = session.config();
    let occurrences = expand(
        start,
        end,
        rrule.as_ref(),
        config.instance_horizon_days,
        config.max_instances_per_event,
    );
    for (start, end) in occurrences {
        match (start, end) {
            (CalTime::Utime(start), CalTime::Utime(end)) => {
                driver.execute(
                    "INSERT INTO instance_utime(event_id, dtstart_utime, dtend_utime) \
                     VALUES (?, ?, ?)",
                    &[int(event_id), SqlValue::Integer(start), SqlValue::Integer(end)],
                )?;
            }
            (CalTime::LocalTime(start), CalTime::LocalTime(end)) => {
                driver.execute(
                    "INSERT INTO instance_localtime(event_id, dtstart_datetime, dtend_datetime) \
                     VALUES (?, ?, ?)",
                    &[
                        int(event_id),
                        SqlValue::Text(start.to_db_string()),
                        SqlValue::Text(end.to_db_string()),
                    ],
                )?;
            }
            _ => return Err(StoreError::DbFailed("occurrence mixes time representations")),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(year: i32, month: u8, mday: u8, hour: u8) -> CalTime {
        CalTime::LocalTime(LocalDateTime::try_new(year, month, mday, hour, 0, 0).expect("valid"))
    }

    fn starts(occurrences: &[Occurrence]) -> Vec<String> {
        occurrences
            .iter()
            .map(|(start, _)| match start {
                CalTime::LocalTime(local) => local.to_db_string(),
                CalTime::Utime(utime) => utime.to_string(),
            })
            .collect()
    }

    #[test]
    fn single_event_yields_one_occurrence() {
        let out = expand(local(2024, 3, 1, 9), Some(local(2024, 3, 1, 10)), None, 30, 10);
        assert_eq!(out, vec![(local(2024, 3, 1, 9), local(2024, 3, 1, 10))]);
    }

    #[test]
    fn daily_count_keeps_duration() {
        let rule = Rrule::new(Frequency::Daily, 2, RecurrenceRange::Count(3));
        let out = expand(
            CalTime::Utime(0),
            Some(CalTime::Utime(1800)),
            Some(&rule),
            365,
            100,
        );
        assert_eq!(
            out,
            vec![
                (CalTime::Utime(0), CalTime::Utime(1800)),
                (CalTime::Utime(172_800), CalTime::Utime(174_600)),
                (CalTime::Utime(345_600), CalTime::Utime(347_400)),
            ]
        );
    }

    #[test]
    fn weekly_until_is_inclusive() {
        let rule = Rrule::new(
            Frequency::Weekly,
            1,
            RecurrenceRange::Until(local(2024, 1, 15, 9)),
        );
        let out = expand(local(2024, 1, 1, 9), None, Some(&rule), 365, 100);
        assert_eq!(
            starts(&out),
            vec!["20240101T090000", "20240108T090000", "20240115T090000"]
        );
    }

    #[test]
    fn monthly_skips_missing_days() {
        let rule = Rrule::new(Frequency::Monthly, 1, RecurrenceRange::Count(4));
        let out = expand(local(2024, 1, 31, 8), None, Some(&rule), 3660, 100);
        assert_eq!(
            starts(&out),
            vec![
                "20240131T080000",
                "20240331T080000",
                "20240531T080000",
                "20240731T080000"
            ]
        );
    }

    #[test]
    fn yearly_leap_day_only_on_leap_years() {
        let rule = Rrule::new(Frequency::Yearly, 1, RecurrenceRange::Count(2));
        let out = expand(local(2024, 2, 29, 0), None, Some(&rule), 3660, 100);
        assert_eq!(starts(&out), vec!["20240229T000000", "20280229T000000"]);
    }

    #[test]
    fn endless_rule_stops_at_horizon_and_cap() {
        let rule = Rrule::new(Frequency::Daily, 1, RecurrenceRange::Endless);
        let by_horizon = expand(local(2024, 1, 1, 0), None, Some(&rule), 10, 1000);
        assert_eq!(by_horizon.len(), 11);
        let by_cap = expand(local(2024, 1, 1, 0), None, Some(&rule), 3660, 5);
        assert_eq!(by_cap.len(), 5);
    }

    #[test]
    fn end_in_other_representation_is_ignored() {
        let out = expand(CalTime::Utime(100), Some(local(2024, 1, 1, 0)), None, 1, 1);
        assert_eq!(out, vec![(CalTime::Utime(100), CalTime::Utime(100))]);
    }
}
