use std::collections::BTreeMap;

use time::Date;

use super::{Cell, Report, ReportKey, Table};
use crate::attendance::AttendanceRow;
use crate::class::Class;
use crate::dates::{self, DateRange};
use crate::label::Id;

/// Totals check-ins per class across all time, with a count for every week
/// from the first check-in to the last. Classes nobody attended show zeros.
pub fn class_totals(classes: &[Class], rows: &[AttendanceRow], today: Date) -> Report {
    let mut counts: BTreeMap<(Id, Date), i64> = BTreeMap::new();

    for row in rows {
        let week = dates::week_start(row.record.class_date);
        *counts.entry((row.record.class_id, week)).or_default() += 1;
    }

    let first = rows.iter().map(|r| r.record.class_date).min();
    let last = rows.iter().map(|r| r.record.class_date).max();

    let weeks = match (first, last) {
        (Some(first), Some(last)) => dates::weeks_between(first, last),
        _ => vec![],
    };

    let mut columns = ["Day", "Class", "Start", "End", "Attendance"]
        .iter()
        .map(|c| (*c).to_owned())
        .collect::<Vec<_>>();
    columns.extend(weeks.iter().map(|w| dates::iso(*w)));
    let mut table = Table::new(columns);

    let mut classes = classes.iter().collect::<Vec<_>>();
    classes.sort_by(|a, b| {
        (a.weekday, a.start_time, &a.name, a.id).cmp(&(b.weekday, b.start_time, &b.name, b.id))
    });

    for class in classes {
        let weekly = weeks
            .iter()
            .map(|w| counts.get(&(class.id, *w)).copied().unwrap_or(0))
            .collect::<Vec<_>>();

        let mut row = vec![
            Cell::text(class.weekday_name()),
            Cell::text(&class.name),
            Cell::text(dates::hour_minute(class.start_time)),
            Cell::text(dates::hour_minute(class.end_time())),
            Cell::Count(weekly.iter().sum()),
        ];
        row.extend(weekly.into_iter().map(Cell::Count));

        table.push(row);
    }

    let range = match (first, last) {
        (Some(first), Some(last)) => DateRange {
            start: first,
            end: last,
        },
        _ => DateRange::day(today),
    };

    Report::new(ReportKey::ClassTotals, range.describe(), range, table)
}
