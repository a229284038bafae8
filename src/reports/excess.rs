use std::collections::{BTreeMap, BTreeSet};

use time::Date;

use super::table::round2;
use super::{Cell, Report, ReportKey, Table};
use crate::attendance::{AttendanceRow, AttendeeKey};
use crate::dates::{self, DateRange};

struct Tally {
    name: String,
    limit: i32,
    weeks: BTreeMap<Date, i64>,
}

/// Flags attendees whose average weekly attendance over `window` is above
/// their membership's limit.
///
/// Check-ins are counted in weeks labelled by their Monday. Each attendee
/// covers every week from their first to their last check-in; the week
/// columns are the union of those spans, and each average is over all of
/// the columns. Unlimited memberships are never flagged.
pub fn excess_attendances(rows: &[AttendanceRow], window: DateRange) -> Report {
    let mut tallies: BTreeMap<AttendeeKey, Tally> = BTreeMap::new();

    for row in rows {
        let tally = tallies.entry(row.record.attendee).or_insert_with(|| Tally {
            name: row.full_name.clone(),
            limit: row.sessions_per_week,
            weeks: BTreeMap::new(),
        });

        *tally
            .weeks
            .entry(dates::week_start(row.record.class_date))
            .or_default() += 1;
    }

    let weeks = tallies
        .values()
        .filter_map(|t| Some((t.weeks.keys().next()?, t.weeks.keys().next_back()?)))
        .flat_map(|(first, last)| dates::weeks_between(*first, *last))
        .collect::<BTreeSet<_>>();

    let mut columns = vec!["Name".to_owned(), "Weekly Average".to_owned(), "Limit".to_owned()];
    columns.extend(weeks.iter().map(|w| dates::iso(*w)));
    let mut table = Table::new(columns);

    let mut flagged = tallies
        .iter()
        .filter_map(|(key, tally)| {
            let total: i64 = tally.weeks.values().sum();
            let average = round2(total as f64 / weeks.len().max(1) as f64);

            if tally.limit != 0 && average > f64::from(tally.limit) {
                Some((key, tally, average))
            } else {
                None
            }
        })
        .collect::<Vec<_>>();
    flagged.sort_by(|(a, x, _), (b, y, _)| (&x.name, a).cmp(&(&y.name, b)));

    for (_, tally, average) in flagged {
        let mut row = vec![
            Cell::text(&tally.name),
            Cell::Average(average),
            Cell::Count(i64::from(tally.limit)),
        ];
        row.extend(
            weeks
                .iter()
                .map(|w| Cell::Count(tally.weeks.get(w).copied().unwrap_or(0))),
        );

        table.push(row);
    }

    let report = Report::new(ReportKey::ExcessAttendances, window.describe(), window, table);

    if rows.is_empty() {
        report.with_message(window.empty_message())
    } else {
        report
    }
}
