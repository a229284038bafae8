use super::{Cell, Report, ReportKey, Table};
use crate::attendance::AttendanceRow;
use crate::dates::{self, DateRange};

const BRIEF_COLUMNS: [&str; 3] = ["Class", "Name", "Checked In"];
const FULL_COLUMNS: [&str; 6] = ["Class", "Date", "Time", "Name", "Checked In", "Membership"];

/// Lists every check-in in the range, ordered by class date and time,
/// then class name, then when the check-in was recorded.
pub fn listing(key: ReportKey, range: DateRange, mut rows: Vec<AttendanceRow>) -> Report {
    rows.sort_by(|a, b| {
        (
            a.record.class_date,
            a.record.class_time,
            &a.class_name,
            a.record.recorded_at,
        )
            .cmp(&(
                b.record.class_date,
                b.record.class_time,
                &b.class_name,
                b.record.recorded_at,
            ))
    });

    let mut table = if key.is_brief() {
        Table::new(BRIEF_COLUMNS.iter().copied())
    } else {
        Table::new(FULL_COLUMNS.iter().copied())
    };

    for row in &rows {
        let checked_in = Cell::text(dates::timestamp(row.record.recorded_at));

        if key.is_brief() {
            table.push(vec![
                Cell::text(&row.class_name),
                Cell::text(&row.full_name),
                checked_in,
            ]);
        } else {
            table.push(vec![
                Cell::text(&row.class_name),
                Cell::text(dates::iso(row.record.class_date)),
                Cell::text(dates::hour_minute(row.record.class_time)),
                Cell::text(&row.full_name),
                checked_in,
                Cell::text(&row.membership_type),
            ]);
        }
    }

    let report = Report::new(key, range.describe(), range, table);

    if rows.is_empty() {
        report.with_message(range.empty_message())
    } else {
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendeeKey;
    use crate::dates::{hm, ymd};
    use crate::reports::tests::row;

    #[test]
    fn brief_listings_have_three_columns() {
        let today = ymd(2024, 3, 13);
        let rows = vec![
            row(AttendeeKey::account(2), "Royce", 1, "Evening Gi", today, 0),
            row(AttendeeKey::account(1), "Rorion", 2, "Lunchtime", today, 0),
        ];

        let report = listing(ReportKey::Today, DateRange::day(today), rows);

        assert_eq!(report.table.columns, vec!["Class", "Name", "Checked In"]);
        assert_eq!(report.table.rows.len(), 2);
        assert_eq!(report.table.rows[0][0], Cell::text("Evening Gi"));
        assert_eq!(report.table.rows[0][2], Cell::text("2024-03-13 17:55:00"));
        assert!(report.message.is_none());
    }

    #[test]
    fn full_listings_sort_by_date_then_time() {
        let range = DateRange::new(ymd(2024, 3, 4), ymd(2024, 3, 10)).unwrap();

        let mut late = row(AttendeeKey::account(1), "Rickson", 1, "Evening Gi", ymd(2024, 3, 4), 0);
        late.record.class_time = hm(19, 0);
        let early = row(AttendeeKey::account(1), "Rickson", 2, "Morning", ymd(2024, 3, 4), 0);
        let next_day = row(AttendeeKey::account(1), "Rickson", 2, "Morning", ymd(2024, 3, 5), 0);

        let report = listing(ReportKey::LastWeek, range, vec![next_day, late, early]);

        assert_eq!(report.table.columns.len(), 6);
        let order = report
            .table
            .rows
            .iter()
            .map(|r| (r[1].to_string(), r[2].to_string()))
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![
                ("2024-03-04".to_owned(), "18:00".to_owned()),
                ("2024-03-04".to_owned(), "19:00".to_owned()),
                ("2024-03-05".to_owned(), "18:00".to_owned()),
            ]
        );
        assert_eq!(report.table.rows[0][5], Cell::text("standard"));
    }

    #[test]
    fn empty_ranges_carry_a_message() {
        let report = listing(ReportKey::Yesterday, DateRange::day(ymd(2024, 1, 1)), vec![]);

        assert!(report.table.is_empty());
        assert_eq!(
            report.message.as_deref(),
            Some("No classes were attended on Monday, 01 Jan 2024.")
        );
    }
}
