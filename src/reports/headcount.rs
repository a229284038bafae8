use std::collections::BTreeMap;

use time::Date;

use super::{Cell, Report, ReportKey, Table};
use crate::attendance::AttendanceRow;
use crate::class::Class;
use crate::dates::{self, DateRange};
use crate::label::Id;

/// Counts today's check-ins per class. Every class scheduled today gets a
/// row, including those nobody attended.
pub fn headcount(classes: &[Class], rows: &[AttendanceRow], today: Date) -> Report {
    let weekday = dates::weekday_index(today);

    let mut counts: BTreeMap<Id, i64> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.record.class_date == today) {
        *counts.entry(row.record.class_id).or_default() += 1;
    }

    // a check-in for a class since moved to another day still counts
    let mut todays = classes
        .iter()
        .filter(|c| c.weekday == weekday || counts.contains_key(&c.id))
        .collect::<Vec<_>>();
    todays.sort_by(|a, b| (a.start_time, &a.name, a.id).cmp(&(b.start_time, &b.name, b.id)));

    let mut table = Table::new(vec!["Class", "Attendees"]);

    for class in todays {
        table.push(vec![
            Cell::text(&class.name),
            Cell::Count(counts.get(&class.id).copied().unwrap_or(0)),
        ]);
    }

    let range = DateRange::day(today);
    let report = Report::new(ReportKey::Headcount, dates::long_date(today), range, table);

    if report.table.is_empty() {
        let message = format!("No classes found for {}.", dates::long_date(today));
        report.with_message(message)
    } else {
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendeeKey;
    use crate::dates::ymd;
    use crate::reports::tests::row;
    use crate::view::tests::{class, wednesday};

    #[test]
    fn classes_without_attendance_count_zero() {
        let classes = vec![
            class(1, "A", 2, 18, 1),
            class(2, "B", 2, 19, 1),
            class(3, "Saturday", 5, 10, 1),
        ];
        let rows = vec![row(AttendeeKey::account(1), "Someone", 1, "A", wednesday(), 0)];

        let report = headcount(&classes, &rows, wednesday());

        assert_eq!(report.table.columns, vec!["Class", "Attendees"]);
        assert_eq!(
            report.table.rows,
            vec![
                vec![Cell::text("A"), Cell::Count(1)],
                vec![Cell::text("B"), Cell::Count(0)],
            ]
        );
        assert!(report.message.is_none());
    }

    #[test]
    fn days_without_classes_say_so() {
        let report = headcount(&[class(3, "Saturday", 5, 10, 1)], &[], ymd(2024, 3, 11));

        assert!(report.table.is_empty());
        assert_eq!(
            report.message.as_deref(),
            Some("No classes found for Monday, 11 Mar 2024.")
        );
    }
}
