#![forbid(unsafe_code)]

//! Small integer-coded enums persisted as `INTEGER` columns.

use serde::{Deserialize, Serialize};

macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $default,
            $($variant),+
        }

        impl $name {
            pub fn code(self) -> i32 {
                match self {
                    Self::$default => 0,
                    $(Self::$variant => $code),+
                }
            }

            /// Unknown codes fall back to the default variant.
            pub fn from_code(code: i32) -> Self {
                $(if code == $code { return Self::$variant; })+
                Self::$default
            }
        }
    };
}

coded_enum!(
    /// What a synchronizing client expects to see after a delete.
    SyncEvent { EveryAndRemain = 1, ForMe = 2 } default EveryAndDelete
);

coded_enum!(BookMode { ReadOnly = 1 } default ReadWrite);

coded_enum!(EventStatus { Tentative = 1, Confirmed = 2, Cancelled = 3 } default None);

coded_enum!(
    TodoStatus { NeedsAction = 1, Completed = 2, InProcess = 3, Cancelled = 4 } default None
);

coded_enum!(Priority { High = 1, Normal = 2, Low = 3 } default None);

coded_enum!(Sensitivity { Private = 1, Confidential = 2 } default Public);

coded_enum!(BusyStatus { Busy = 1, Unavailable = 2, Tentative = 3 } default Free);

coded_enum!(Frequency { Yearly = 1, Monthly = 2, Weekly = 3, Daily = 4 } default None);

coded_enum!(
    TickUnit { Minute = 60, Hour = 3600, Day = 86400, Week = 604800 } default Specific
);

coded_enum!(AlarmAction { Display = 1, Email = 2 } default Audio);

coded_enum!(ModifiedStatus { Updated = 1, Deleted = 2 } default Inserted);

/// Which record kinds a calendar book may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreType(u8);

impl StoreType {
    pub const EVENT: Self = Self(1);
    pub const TODO: Self = Self(2);
    pub const ALL: Self = Self(3);

    pub fn from_code(code: i32) -> Self {
        Self((code & 0b11) as u8)
    }

    pub fn code(self) -> i32 {
        i32::from(self.0)
    }

    pub fn holds_events(self) -> bool {
        self.0 & Self::EVENT.0 != 0
    }

    pub fn holds_todos(self) -> bool {
        self.0 & Self::TODO.0 != 0
    }
}

impl Default for StoreType {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_fall_back() {
        assert_eq!(SyncEvent::EveryAndDelete.code(), 0);
        assert_eq!(SyncEvent::from_code(1), SyncEvent::EveryAndRemain);
        assert_eq!(SyncEvent::from_code(42), SyncEvent::EveryAndDelete);
        assert_eq!(TickUnit::from_code(3600), TickUnit::Hour);
        assert_eq!(TodoStatus::Cancelled.code(), 4);
    }

    #[test]
    fn store_type_masks() {
        assert!(StoreType::ALL.holds_events());
        assert!(StoreType::ALL.holds_todos());
        assert!(!StoreType::TODO.holds_events());
        assert_eq!(StoreType::from_code(2), StoreType::TODO);
    }
}
