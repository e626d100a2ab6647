#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

pub const TYPE_UTIME: i32 = 0;
pub const TYPE_LOCALTIME: i32 = 1;

/// A calendar instant: either an absolute UTC timestamp or a floating local date-time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalTime {
    Utime(i64),
    LocalTime(LocalDateTime),
}

impl CalTime {
    pub fn type_code(&self) -> i32 {
        match self {
            Self::Utime(_) => TYPE_UTIME,
            Self::LocalTime(_) => TYPE_LOCALTIME,
        }
    }

    pub fn is_utime(&self) -> bool {
        matches!(self, Self::Utime(_))
    }

    pub fn utime(&self) -> Option<i64> {
        match self {
            Self::Utime(value) => Some(*value),
            Self::LocalTime(_) => None,
        }
    }

    pub fn local(&self) -> Option<LocalDateTime> {
        match self {
            Self::Utime(_) => None,
            Self::LocalTime(value) => Some(*value),
        }
    }

    /// Rebuilds a value from its three persisted columns.
    pub fn from_columns(
        type_code: Option<i32>,
        utime: Option<i64>,
        datetime: Option<&str>,
    ) -> Option<Self> {
        match type_code? {
            TYPE_UTIME => utime.map(Self::Utime),
            TYPE_LOCALTIME => datetime
                .and_then(|raw| LocalDateTime::parse_db(raw).ok())
                .map(Self::LocalTime),
            _ => None,
        }
    }

    /// Wall-clock view of the value; utime values are read in UTC.
    pub fn to_primitive(&self) -> Result<PrimitiveDateTime, CalTimeError> {
        match self {
            Self::Utime(value) => {
                let odt = OffsetDateTime::from_unix_timestamp(*value)
                    .map_err(|_| CalTimeError::OutOfRange)?;
                Ok(PrimitiveDateTime::new(odt.date(), odt.time()))
            }
            Self::LocalTime(value) => value.to_primitive(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalTimeError {
    InvalidDate,
    InvalidTime,
    InvalidFormat,
    OutOfRange,
}

impl CalTimeError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidDate => "invalid calendar date",
            Self::InvalidTime => "invalid time of day",
            Self::InvalidFormat => "datetime must be formatted as YYYYMMDDTHHMMSS",
            Self::OutOfRange => "timestamp out of range",
        }
    }
}

impl std::fmt::Display for CalTimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for CalTimeError {}

/// Floating local date-time, validated on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocalDateTime {
    year: i32,
    month: u8,
    mday: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl LocalDateTime {
    pub fn try_new(
        year: i32,
        month: u8,
        mday: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Result<Self, CalTimeError> {
        if !(0..=9999).contains(&year) {
            return Err(CalTimeError::InvalidDate);
        }
        let month_value = Month::try_from(month).map_err(|_| CalTimeError::InvalidDate)?;
        Date::from_calendar_date(year, month_value, mday).map_err(|_| CalTimeError::InvalidDate)?;
        Time::from_hms(hour, minute, second).map_err(|_| CalTimeError::InvalidTime)?;
        Ok(Self {
            year,
            month,
            mday,
            hour,
            minute,
            second,
        })
    }

    pub fn date(year: i32, month: u8, mday: u8) -> Result<Self, CalTimeError> {
        Self::try_new(year, month, mday, 0, 0, 0)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn mday(&self) -> u8 {
        self.mday
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn to_primitive(&self) -> Result<PrimitiveDateTime, CalTimeError> {
        let month = Month::try_from(self.month).map_err(|_| CalTimeError::InvalidDate)?;
        let date = Date::from_calendar_date(self.year, month, self.mday)
            .map_err(|_| CalTimeError::InvalidDate)?;
        let time = Time::from_hms(self.hour, self.minute, self.second)
            .map_err(|_| CalTimeError::InvalidTime)?;
        Ok(PrimitiveDateTime::new(date, time))
    }

    pub fn from_primitive(value: PrimitiveDateTime) -> Result<Self, CalTimeError> {
        Self::try_new(
            value.year(),
            u8::from(value.month()),
            value.day(),
            value.hour(),
            value.minute(),
            value.second(),
        )
    }

    /// `YYYYMMDDTHHMMSS`; lexicographic order of this form is chronological.
    pub fn to_db_string(&self) -> String {
        format!(
            "{:04}{:02}{:02}T{:02}{:02}{:02}",
            self.year, self.month, self.mday, self.hour, self.minute, self.second
        )
    }

    pub fn parse_db(raw: &str) -> Result<Self, CalTimeError> {
        let raw = raw.trim();
        let bytes = raw.as_bytes();
        if bytes.len() != 15 || bytes[8] != b'T' {
            return Err(CalTimeError::InvalidFormat);
        }
        let digits = |range: std::ops::Range<usize>| -> Result<u32, CalTimeError> {
            let part = raw.get(range).ok_or(CalTimeError::InvalidFormat)?;
            if !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CalTimeError::InvalidFormat);
            }
            part.parse::<u32>().map_err(|_| CalTimeError::InvalidFormat)
        };
        let year = i32::try_from(digits(0..4)?).map_err(|_| CalTimeError::InvalidFormat)?;
        let narrow = |value: u32| u8::try_from(value).map_err(|_| CalTimeError::InvalidFormat);
        Self::try_new(
            year,
            narrow(digits(4..6)?)?,
            narrow(digits(6..8)?)?,
            narrow(digits(9..11)?)?,
            narrow(digits(11..13)?)?,
            narrow(digits(13..15)?)?,
        )
    }
}

impl From<LocalDateTime> for String {
    fn from(value: LocalDateTime) -> Self {
        value.to_db_string()
    }
}

impl TryFrom<String> for LocalDateTime {
    type Error = CalTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_db(&value)
    }
}

impl std::fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_db_string())
    }
}
