use std::collections::HashMap;

use time::{Date, Duration};

use super::{Cell, Report, ReportKey, Table};
use crate::account::Account;
use crate::dates::{self, DateRange};
use crate::label::Id;

/// Lists members, coaches aside, who have not checked themselves in since
/// `threshold_days` before today, or who never have.
///
/// `latest` holds each account's most recent own check-in date; check-ins
/// for dependents do not count.
pub fn absentees(
    accounts: &[Account],
    latest: &[(Id, Date)],
    today: Date,
    threshold_days: i64,
) -> Report {
    let cutoff = today - Duration::days(threshold_days);
    let latest = latest.iter().copied().collect::<HashMap<_, _>>();

    let mut absent = accounts
        .iter()
        .filter(|a| !a.is_coach)
        .map(|a| (a, latest.get(&a.id).copied()))
        .filter(|(_, last)| last.map_or(true, |last| last < cutoff))
        .collect::<Vec<_>>();
    absent.sort_by(|(a, _), (b, _)| (a.full_name(), a.id).cmp(&(b.full_name(), b.id)));

    let mut table = Table::new(vec!["Name", "Email", "Last Attended"]);

    for (account, last) in absent {
        table.push(vec![
            Cell::text(account.full_name()),
            Cell::text(&account.email),
            last.map_or(Cell::Missing, |d| Cell::text(dates::iso(d))),
        ]);
    }

    let subtitle = format!("Members who have not attended since {}", dates::long_date(cutoff));

    Report::new(ReportKey::Absentees, subtitle, DateRange::day(today), table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::ymd;
    use crate::roster::tests::account;

    #[test]
    fn members_past_the_threshold_are_listed() {
        let today = ymd(2024, 3, 21);

        let mut recent = account(1, 1);
        recent.first_name = "Recent".to_owned();
        let mut lapsed = account(2, 1);
        lapsed.first_name = "Lapsed".to_owned();
        let mut never = account(3, 1);
        never.first_name = "Never".to_owned();
        let mut coach = account(4, 1);
        coach.is_coach = true;

        let latest = vec![(1, ymd(2024, 3, 16)), (2, ymd(2024, 3, 1))];

        let report = absentees(&[recent, lapsed, never, coach], &latest, today, 14);

        let names = report
            .table
            .rows
            .iter()
            .map(|r| r[0].to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Lapsed 2", "Never 3"]);
        assert_eq!(report.table.rows[0][2], Cell::text("2024-03-01"));
        assert_eq!(report.table.rows[1][2], Cell::Missing);
    }

    #[test]
    fn the_threshold_day_itself_is_not_absent() {
        let today = ymd(2024, 3, 21);

        let report = absentees(&[account(1, 1)], &[(1, ymd(2024, 3, 7))], today, 14);

        assert!(report.table.is_empty());
    }
}
