use serde::Serialize;
use time::{Date, PrimitiveDateTime, Time};

use crate::dates::{hour_minute_time, iso_date, timestamp_string, DateRange};
use crate::label::Id;

/// Identifies who checks in: an account by itself, or one of its
/// dependents.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct AttendeeKey {
    pub account_id: Id,
    pub dependent_id: Option<Id>,
}

impl AttendeeKey {
    pub fn account(account_id: Id) -> Self {
        AttendeeKey {
            account_id,
            dependent_id: None,
        }
    }

    pub fn dependent(account_id: Id, dependent_id: Id) -> Self {
        AttendeeKey {
            account_id,
            dependent_id: Some(dependent_id),
        }
    }
}

/// A single check-in. Records are only ever inserted or deleted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttendanceRecord {
    #[serde(flatten)]
    pub attendee: AttendeeKey,

    pub class_id: Id,

    #[serde(with = "iso_date")]
    pub class_date: Date,

    #[serde(with = "hour_minute_time")]
    pub class_time: Time,

    #[serde(with = "timestamp_string")]
    pub recorded_at: PrimitiveDateTime,
}

impl AttendanceRecord {
    /// Whether this record marks `attendee` present in `class_id` on `date`.
    pub fn matches(&self, attendee: &AttendeeKey, class_id: Id, date: Date) -> bool {
        self.attendee == *attendee && self.class_id == class_id && self.class_date == date
    }
}

/// An attendance record joined with the names and membership details the
/// reports show.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttendanceRow {
    #[serde(flatten)]
    pub record: AttendanceRecord,

    pub class_name: String,

    /// The dependent's name for dependents, otherwise the account's.
    pub full_name: String,

    pub membership_type: String,
    pub sessions_per_week: i32,
}

/// Narrows an attendance query. Every present condition must hold.
#[derive(Clone, Debug, Default)]
pub struct AttendanceFilter {
    /// Matched against the recorded timestamp, inclusively.
    pub range: Option<DateRange>,
    pub account_id: Option<Id>,
    pub class_id: Option<Id>,
}

impl AttendanceFilter {
    pub fn all() -> Self {
        AttendanceFilter::default()
    }

    pub fn between(range: DateRange) -> Self {
        AttendanceFilter {
            range: Some(range),
            ..Default::default()
        }
    }

    pub fn account(mut self, account_id: Id) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn class(mut self, class_id: Id) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        self.range.map_or(true, |r| r.contains(record.recorded_at))
            && self
                .account_id
                .map_or(true, |id| record.attendee.account_id == id)
            && self.class_id.map_or(true, |id| record.class_id == id)
    }
}

/// A store mutation produced by the toggle engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum AttendanceChange {
    Insert(AttendanceSlot),
    Delete(AttendanceSlot),
}

impl AttendanceChange {
    pub fn slot(&self) -> &AttendanceSlot {
        match self {
            AttendanceChange::Insert(slot) | AttendanceChange::Delete(slot) => slot,
        }
    }
}

/// The attendee, class and occurrence a change applies to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttendanceSlot {
    #[serde(flatten)]
    pub attendee: AttendeeKey,

    pub class_id: Id,

    #[serde(with = "iso_date")]
    pub class_date: Date,

    #[serde(with = "hour_minute_time")]
    pub class_time: Time,
}

impl AttendanceSlot {
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        record.attendee == self.attendee
            && record.class_id == self.class_id
            && record.class_date == self.class_date
            && record.class_time == self.class_time
    }
}
