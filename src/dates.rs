//! Calendar helpers: parsing and formatting dates, inclusive date ranges and
//! Monday-aligned week buckets.

use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::errors::BackendError;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Returns the Monday-based index (0 for Monday) of the date's weekday.
pub fn weekday_index(date: Date) -> i16 {
    date.weekday().number_days_from_monday() as i16
}

pub fn weekday_name(index: i16) -> &'static str {
    WEEKDAYS
        .get(index as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Parses a weekday name, case-insensitively, into its Monday-based index.
pub fn parse_weekday(raw: &str) -> Result<i16, BackendError> {
    let trimmed = raw.trim();

    WEEKDAYS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(trimmed))
        .map(|i| i as i16)
        .ok_or_else(|| BackendError::InvalidWeekday(raw.to_owned()))
}

/// Returns the Monday that begins the week containing `date`. Week
/// buckets are labelled with this date.
pub fn week_start(date: Date) -> Date {
    date - Duration::days(i64::from(weekday_index(date)))
}

/// Lists every Monday from the week of `first` up to the week of `last`.
pub fn weeks_between(first: Date, last: Date) -> Vec<Date> {
    let mut weeks = vec![];
    let mut week = week_start(first);
    let last = week_start(last);

    while week <= last {
        weeks.push(week);
        week = week + Duration::weeks(1);
    }

    weeks
}

const DATE_FORMAT: &str = "%F";
const HOUR_MINUTE_FORMAT: &str = "%H:%M";
const TIMESTAMP_FORMAT: &str = "%F %T";
const LONG_DATE_FORMAT: &str = "%A, %d %b %Y";

/// Parses an ISO 8601 calendar date (`2024-01-31`). Anything that does not
/// format back to the same text is rejected.
pub fn parse_date(raw: &str) -> Result<Date, BackendError> {
    let trimmed = raw.trim();

    Date::parse(trimmed, DATE_FORMAT)
        .ok()
        .filter(|date| iso(*date) == trimmed)
        .ok_or_else(|| BackendError::InvalidDate(raw.to_owned()))
}

/// Parses a 24-hour clock time with optional seconds (`18:30`, `18:30:00`).
pub fn parse_time(raw: &str) -> Result<Time, BackendError> {
    let trimmed = raw.trim();

    Time::parse(trimmed, "%T")
        .or_else(|_| Time::parse(trimmed, HOUR_MINUTE_FORMAT))
        .map_err(|_| BackendError::InvalidTime(raw.to_owned()))
}

pub fn iso(date: Date) -> String {
    date.format(DATE_FORMAT)
}

pub fn hour_minute(time: Time) -> String {
    time.format(HOUR_MINUTE_FORMAT)
}

pub fn timestamp(datetime: PrimitiveDateTime) -> String {
    datetime.format(TIMESTAMP_FORMAT)
}

/// Formats a date for people, e.g. `Monday, 01 Jan 2024`.
pub fn long_date(date: Date) -> String {
    date.format(LONG_DATE_FORMAT)
}

/// An inclusive range of calendar days.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, BackendError> {
        if start > end {
            return Err(BackendError::InvertedDateRange {
                start: iso(start),
                end: iso(end),
            });
        }

        Ok(DateRange { start, end })
    }

    pub fn day(date: Date) -> Self {
        DateRange {
            start: date,
            end: date,
        }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, BackendError> {
        DateRange::new(parse_date(start)?, parse_date(end)?)
    }

    /// The previous day.
    pub fn yesterday(today: Date) -> Self {
        DateRange::day(today.previous_day())
    }

    /// Monday to Sunday of the week before the one containing `today`.
    pub fn last_week(today: Date) -> Self {
        let start = week_start(today) - Duration::weeks(1);

        DateRange {
            start,
            end: start + Duration::days(6),
        }
    }

    /// The first to the last day of the month before the one containing
    /// `today`.
    pub fn last_month(today: Date) -> Self {
        let start = start_of_previous_month(today);
        let end = start_of_month(today).previous_day();

        DateRange { start, end }
    }

    /// The first instant of `start` and the last second of `end`, so that a
    /// single-day range covers the whole day.
    pub fn bounds(&self) -> (PrimitiveDateTime, PrimitiveDateTime) {
        let start = self.start.midnight();
        let end = self.end.next_day().midnight() - Duration::seconds(1);

        (start, end)
    }

    pub fn contains(&self, datetime: PrimitiveDateTime) -> bool {
        let (start, end) = self.bounds();

        datetime >= start && datetime <= end
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.end
    }

    /// Describes the range for report subtitles.
    pub fn describe(&self) -> String {
        if self.is_single_day() {
            long_date(self.start)
        } else {
            format!("{} - {}", long_date(self.start), long_date(self.end))
        }
    }

    /// The notice shown when nothing was attended in the range.
    pub fn empty_message(&self) -> String {
        if self.is_single_day() {
            format!("No classes were attended on {}.", long_date(self.start))
        } else {
            format!(
                "No classes were attended between {} and {}.",
                long_date(self.start),
                long_date(self.end)
            )
        }
    }
}

pub fn start_of_month(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

pub fn start_of_previous_month(date: Date) -> Date {
    start_of_month(start_of_month(date).previous_day())
}

/// Serializes a `Date` as `%Y-%m-%d`.
pub mod iso_date {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::iso(*date))
    }
}

/// Serializes a `Time` as `%H:%M`.
pub mod hour_minute_time {
    use serde::Serializer;
    use time::Time;

    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::hour_minute(*time))
    }
}

/// Serializes a `PrimitiveDateTime` as `%Y-%m-%d %H:%M:%S`.
pub mod timestamp_string {
    use serde::Serializer;
    use time::PrimitiveDateTime;

    pub fn serialize<S: Serializer>(
        datetime: &PrimitiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::timestamp(*datetime))
    }
}

#[cfg(test)]
pub(crate) fn ymd(year: i32, month: u8, day: u8) -> Date {
    Date::try_from_ymd(year, month, day).expect("valid test date")
}

#[cfg(test)]
pub(crate) fn hm(hour: u8, minute: u8) -> Time {
    Time::try_from_hms(hour, minute, 0).expect("valid test time")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weeks_start_on_monday() {
        // 2024-01-01 was a Monday
        assert_eq!(week_start(ymd(2024, 1, 1)), ymd(2024, 1, 1));
        assert_eq!(week_start(ymd(2024, 1, 3)), ymd(2024, 1, 1));
        assert_eq!(week_start(ymd(2024, 1, 7)), ymd(2024, 1, 1));
        assert_eq!(week_start(ymd(2024, 1, 8)), ymd(2024, 1, 8));
    }

    #[test]
    fn weeks_between_covers_both_ends() {
        let weeks = weeks_between(ymd(2024, 1, 3), ymd(2024, 1, 16));

        assert_eq!(weeks, vec![ymd(2024, 1, 1), ymd(2024, 1, 8), ymd(2024, 1, 15)]);
    }

    #[test]
    fn single_day_range_covers_whole_day() {
        let range = DateRange::day(ymd(2024, 3, 5));
        let (start, end) = range.bounds();

        assert_eq!(start, PrimitiveDateTime::new(ymd(2024, 3, 5), hm(0, 0)));
        assert_eq!(
            end,
            PrimitiveDateTime::new(ymd(2024, 3, 5), Time::try_from_hms(23, 59, 59).unwrap())
        );
        assert!(range.contains(PrimitiveDateTime::new(ymd(2024, 3, 5), hm(21, 45))));
        assert!(!range.contains(PrimitiveDateTime::new(ymd(2024, 3, 6), hm(0, 0))));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        assert!(DateRange::new(ymd(2024, 3, 6), ymd(2024, 3, 5)).is_err());
        assert!(DateRange::parse("2024-03-05", "2024-03-06").is_ok());
    }

    #[test]
    fn previous_periods() {
        // a Wednesday
        let today = ymd(2024, 3, 13);

        assert_eq!(DateRange::yesterday(today), DateRange::day(ymd(2024, 3, 12)));
        assert_eq!(
            DateRange::last_week(today),
            DateRange::new(ymd(2024, 3, 4), ymd(2024, 3, 10)).unwrap()
        );
        assert_eq!(
            DateRange::last_month(today),
            DateRange::new(ymd(2024, 2, 1), ymd(2024, 2, 29)).unwrap()
        );
        assert_eq!(
            DateRange::last_month(ymd(2024, 1, 20)),
            DateRange::new(ymd(2023, 12, 1), ymd(2023, 12, 31)).unwrap()
        );
    }

    #[test]
    fn empty_messages_mention_the_dates() {
        assert_eq!(
            DateRange::day(ymd(2024, 1, 1)).empty_message(),
            "No classes were attended on Monday, 01 Jan 2024."
        );
        assert_eq!(
            DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 7))
                .unwrap()
                .empty_message(),
            "No classes were attended between Monday, 01 Jan 2024 and Sunday, 07 Jan 2024."
        );
    }

    #[test]
    fn out_of_range_parts_are_not_wrapped() {
        assert!(parse_date("2024-257-05").is_err());
        assert!(parse_date("2024-01-261").is_err());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-1-5").is_err());
        assert!(DateRange::parse("2024-01-261", "2024-01-261").is_err());
        assert!(parse_time("18:300").is_err());
    }

    #[test]
    fn parsing() {
        assert_eq!(parse_date("2024-02-29").unwrap(), ymd(2024, 2, 29));
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("yesterday").is_err());
        assert_eq!(parse_date(" 2024-03-05 ").unwrap(), ymd(2024, 3, 5));
        assert_eq!(iso(ymd(2024, 3, 5)), "2024-03-05");
        assert_eq!(timestamp(PrimitiveDateTime::new(ymd(2024, 3, 5), hm(7, 5))), "2024-03-05 07:05:00");
        assert_eq!(parse_time("18:30").unwrap(), hm(18, 30));
        assert_eq!(parse_time("07:05:00").unwrap(), hm(7, 5));
        assert!(parse_time("25:00").is_err());
        assert_eq!(parse_weekday(" tuesday ").unwrap(), 1);
        assert!(parse_weekday("Caturday").is_err());
    }
}
