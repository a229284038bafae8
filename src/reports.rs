//! Read-only summaries of attendance, shared by the JSON and CSV routes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use time::Date;

use crate::attendance::AttendanceFilter;
use crate::config::Config;
use crate::dates::{self, iso_date, DateRange};
use crate::db::Db;
use crate::errors::BackendError;

mod absentees;
mod excess;
mod headcount;
mod listing;
pub mod table;
mod totals;

pub use self::absentees::absentees;
pub use self::excess::excess_attendances;
pub use self::headcount::headcount;
pub use self::listing::listing;
pub use self::table::{Cell, Table};
pub use self::totals::class_totals;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReportKey {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Custom,
    Headcount,
    Absentees,
    ExcessAttendances,
    ClassTotals,
}

impl ReportKey {
    pub fn as_str(&self) -> &'static str {
        use ReportKey::*;

        match self {
            Today => "today",
            Yesterday => "yesterday",
            LastWeek => "last_week",
            LastMonth => "last_month",
            Custom => "custom",
            Headcount => "headcount",
            Absentees => "absentees",
            ExcessAttendances => "excess_attendances",
            ClassTotals => "class_totals",
        }
    }

    pub fn title(&self) -> &'static str {
        use ReportKey::*;

        match self {
            Today => "Today's Attendance",
            Yesterday => "Yesterday's Attendance",
            LastWeek => "Last Week's Attendance",
            LastMonth => "Last Month's Attendance",
            Custom => "Attendance",
            Headcount => "Headcount",
            Absentees => "Absentees",
            ExcessAttendances => "Members Exceeding Their Membership Limit",
            ClassTotals => "Class Attendance Totals",
        }
    }

    /// Today and yesterday only list who came to what.
    pub fn is_brief(&self) -> bool {
        matches!(self, ReportKey::Today | ReportKey::Yesterday)
    }
}

impl fmt::Display for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the keys with either underscores or hyphens, so that URL path
/// segments parse too.
impl FromStr for ReportKey {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ReportKey::*;

        match s.trim().replace('-', "_").as_str() {
            "today" => Ok(Today),
            "yesterday" => Ok(Yesterday),
            "last_week" => Ok(LastWeek),
            "last_month" => Ok(LastMonth),
            "custom" => Ok(Custom),
            "headcount" => Ok(Headcount),
            "absentees" => Ok(Absentees),
            "excess_attendances" => Ok(ExcessAttendances),
            "class_totals" => Ok(ClassTotals),
            _ => Err(BackendError::InvalidReport(s.to_owned())),
        }
    }
}

impl Serialize for ReportKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub key: ReportKey,
    pub title: String,
    pub subtitle: String,

    #[serde(with = "iso_date")]
    pub start_date: Date,

    #[serde(with = "iso_date")]
    pub end_date: Date,

    /// Set instead of rows when there is nothing to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub table: Table,
}

impl Report {
    pub fn new(key: ReportKey, subtitle: impl Into<String>, range: DateRange, table: Table) -> Self {
        Report {
            key,
            title: key.title().to_owned(),
            subtitle: subtitle.into(),
            start_date: range.start,
            end_date: range.end,
            message: None,
            table,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// `<key>_<start>.csv`, or `<key>_<start>_<end>.csv` for ranges longer
    /// than a day.
    pub fn filename(&self) -> String {
        if self.start_date == self.end_date {
            format!("{}_{}.csv", self.key, dates::iso(self.start_date))
        } else {
            format!(
                "{}_{}_{}.csv",
                self.key,
                dates::iso(self.start_date),
                dates::iso(self.end_date)
            )
        }
    }

    pub fn to_csv(&self) -> Result<Vec<u8>, BackendError> {
        self.table.to_csv()
    }
}

/// Works out the dates an attendance listing covers. Only custom
/// listings use `start` and `end`; a missing end means a single day.
pub fn range_for(
    key: ReportKey,
    today: Date,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<DateRange, BackendError> {
    use ReportKey::*;

    Ok(match key {
        Yesterday => DateRange::yesterday(today),
        LastWeek => DateRange::last_week(today),
        LastMonth => DateRange::last_month(today),
        Custom => {
            let start = start.ok_or(BackendError::MissingField("start_date"))?;
            DateRange::parse(start, end.unwrap_or(start))?
        }
        ExcessAttendances => DateRange {
            start: dates::start_of_previous_month(today),
            end: today,
        },
        Today | Headcount | Absentees | ClassTotals => DateRange::day(today),
    })
}

/// Loads whatever `key` needs from the database and builds the report.
pub async fn generate(
    db: &(dyn Db + Send + Sync),
    config: &Config,
    key: ReportKey,
    today: Date,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Report, BackendError> {
    use ReportKey::*;

    let range = range_for(key, today, start, end)?;

    Ok(match key {
        Today | Yesterday | LastWeek | LastMonth | Custom => {
            let rows = db.attendance(AttendanceFilter::between(range)).await?;
            listing(key, range, rows)
        }
        Headcount => {
            let classes = db.retrieve_classes().await?;
            let rows = db.attendance(AttendanceFilter::between(range)).await?;
            headcount(&classes, &rows, today)
        }
        Absentees => {
            let accounts = db.retrieve_accounts().await?;
            let latest = db.latest_attendance().await?;
            absentees(&accounts, &latest, today, config.absentee_threshold_days)
        }
        ExcessAttendances => {
            let rows = db.attendance(AttendanceFilter::between(range)).await?;
            excess_attendances(&rows, range)
        }
        ClassTotals => {
            let classes = db.retrieve_classes().await?;
            let rows = db.attendance(AttendanceFilter::all()).await?;
            class_totals(&classes, &rows, today)
        }
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use time::PrimitiveDateTime;

    use super::*;
    use crate::attendance::{AttendanceRecord, AttendanceRow, AttendeeKey};
    use crate::dates::{hm, ymd};
    use crate::label::Id;

    pub(crate) fn row(
        key: AttendeeKey,
        name: &str,
        class_id: Id,
        class_name: &str,
        date: Date,
        limit: i32,
    ) -> AttendanceRow {
        AttendanceRow {
            record: AttendanceRecord {
                attendee: key,
                class_id,
                class_date: date,
                class_time: hm(18, 0),
                recorded_at: PrimitiveDateTime::new(date, hm(17, 55)),
            },
            class_name: class_name.to_owned(),
            full_name: name.to_owned(),
            membership_type: "standard".to_owned(),
            sessions_per_week: limit,
        }
    }

    #[test]
    fn keys_parse_with_either_separator() {
        assert_eq!("last-week".parse::<ReportKey>().unwrap(), ReportKey::LastWeek);
        assert_eq!(
            "excess_attendances".parse::<ReportKey>().unwrap(),
            ReportKey::ExcessAttendances
        );
        assert!("everything".parse::<ReportKey>().is_err());
    }

    #[test]
    fn filenames_omit_equal_end_dates() {
        let today = ymd(2024, 3, 13);

        let single = Report::new(ReportKey::Today, "", DateRange::day(today), Table::default());
        assert_eq!(single.filename(), "today_2024-03-13.csv");

        let range = range_for(ReportKey::LastWeek, today, None, None).unwrap();
        let week = Report::new(ReportKey::LastWeek, "", range, Table::default());
        assert_eq!(week.filename(), "last_week_2024-03-04_2024-03-10.csv");
    }

    #[test]
    fn custom_ranges_need_a_start() {
        let today = ymd(2024, 3, 13);

        assert!(matches!(
            range_for(ReportKey::Custom, today, None, None),
            Err(BackendError::MissingField("start_date"))
        ));
        assert_eq!(
            range_for(ReportKey::Custom, today, Some("2024-01-05"), None).unwrap(),
            DateRange::day(ymd(2024, 1, 5))
        );
        assert!(range_for(ReportKey::Custom, today, Some("2024-01-05"), Some("2024-01-01")).is_err());
    }

    #[test]
    fn excess_window_starts_last_month() {
        let range = range_for(ReportKey::ExcessAttendances, ymd(2024, 3, 13), None, None).unwrap();

        assert_eq!(range.start, ymd(2024, 2, 1));
        assert_eq!(range.end, ymd(2024, 3, 13));
    }
}
