//! Builds the classes each attendee may check in to on a given day.

use serde::Serialize;
use time::Date;

use crate::attendance::{AttendanceRecord, AttendeeKey};
use crate::class::Class;
use crate::dates::{self, iso_date};
use crate::label::Id;
use crate::roster::{sessions_remaining, Attendee};

/// One eligible class and whether the attendee is checked in to it.
#[derive(Clone, Debug, Serialize)]
pub struct ClassEntry {
    #[serde(flatten)]
    pub class: Class,
    pub attendance: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttendeeClasses {
    pub attendee: Attendee,

    /// Check-ins counted since Monday.
    pub sessions_used: i32,

    /// `None` for unlimited memberships.
    pub sessions_remaining: Option<i32>,

    pub classes: Vec<ClassEntry>,
}

impl AttendeeClasses {
    pub fn entry(&self, class_id: Id) -> Option<&ClassEntry> {
        self.classes.iter().find(|e| e.class.id == class_id)
    }

    pub(crate) fn set_attendance(&mut self, class_id: Id, present: bool) {
        let limit = self.attendee.sessions_per_week;

        if let Some(entry) = self.classes.iter_mut().find(|e| e.class.id == class_id) {
            if entry.attendance != present {
                entry.attendance = present;
                self.sessions_used += if present { 1 } else { -1 };
                self.sessions_used = self.sessions_used.max(0);
                self.sessions_remaining = sessions_remaining(limit, self.sessions_used);
            }
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DailyView {
    #[serde(with = "iso_date")]
    pub date: Date,

    pub attendees: Vec<AttendeeClasses>,
}

impl DailyView {
    pub fn attendee(&self, key: &AttendeeKey) -> Option<&AttendeeClasses> {
        self.attendees.iter().find(|a| a.attendee.key == *key)
    }

    pub(crate) fn attendee_mut(&mut self, key: &AttendeeKey) -> Option<&mut AttendeeClasses> {
        self.attendees.iter_mut().find(|a| a.attendee.key == *key)
    }
}

/// Builds the day's view for `attendees`, keeping their roster order.
///
/// `records` should hold the attendees' check-ins for the week containing
/// `date`: today's decide the attendance flags and the whole week counts
/// toward `sessions_used`. Returns `None` when nothing is scheduled on the
/// date's weekday at all.
pub fn build(
    attendees: Vec<Attendee>,
    classes: &[Class],
    records: &[AttendanceRecord],
    date: Date,
) -> Option<DailyView> {
    let weekday = dates::weekday_index(date);

    let mut todays = classes
        .iter()
        .filter(|c| c.weekday == weekday)
        .collect::<Vec<_>>();

    if todays.is_empty() {
        return None;
    }

    todays.sort_by(|a, b| {
        (a.start_time, &a.name, a.id).cmp(&(b.start_time, &b.name, b.id))
    });

    let week = dates::week_start(date);

    let attendees = attendees
        .into_iter()
        .map(|attendee| {
            let classes = todays
                .iter()
                .filter(|c| c.age_group_id == attendee.age_group_id)
                .map(|class| ClassEntry {
                    attendance: records
                        .iter()
                        .any(|r| r.matches(&attendee.key, class.id, date)),
                    class: (*class).clone(),
                })
                .collect();

            let sessions_used = records
                .iter()
                .filter(|r| r.attendee == attendee.key)
                .filter(|r| r.class_date <= date && dates::week_start(r.class_date) == week)
                .count() as i32;

            AttendeeClasses {
                sessions_remaining: sessions_remaining(attendee.sessions_per_week, sessions_used),
                sessions_used,
                attendee,
                classes,
            }
        })
        .collect();

    Some(DailyView { date, attendees })
}

#[cfg(test)]
pub(crate) mod tests {
    use time::PrimitiveDateTime;

    use super::*;
    use crate::class::ClassType;
    use crate::dates::{hm, ymd};
    use crate::roster::tests::{ADULTS, JUNIORS};

    /// 2024-03-13, a Wednesday.
    pub(crate) fn wednesday() -> Date {
        ymd(2024, 3, 13)
    }

    pub(crate) fn class(id: Id, name: &str, weekday: i16, hour: u8, age_group_id: Id) -> Class {
        Class {
            id,
            name: name.to_owned(),
            class_type: ClassType::Gi,
            weekday,
            start_time: hm(hour, 0),
            duration_minutes: 60,
            age_group_id,
            coach_id: None,
        }
    }

    pub(crate) fn timetable() -> Vec<Class> {
        vec![
            class(1, "Evening Gi", 2, 19, ADULTS),
            class(2, "Lunchtime No Gi", 2, 12, ADULTS),
            class(3, "Kids", 2, 16, JUNIORS),
            class(4, "Open Mat", 5, 10, ADULTS),
        ]
    }

    pub(crate) fn attendee(key: AttendeeKey, age_group_id: Id, limit: i32) -> Attendee {
        Attendee {
            key,
            name: format!("Attendee {:?}", key.dependent_id),
            age_group_id,
            membership_id: 1,
            sessions_per_week: limit,
        }
    }

    pub(crate) fn record(key: AttendeeKey, class_id: Id, date: Date) -> AttendanceRecord {
        AttendanceRecord {
            attendee: key,
            class_id,
            class_date: date,
            class_time: hm(12, 0),
            recorded_at: PrimitiveDateTime::new(date, hm(11, 55)),
        }
    }

    #[test]
    fn no_records_means_every_class_is_absent() {
        let me = AttendeeKey::account(1);
        let view = build(vec![attendee(me, ADULTS, 0)], &timetable(), &[], wednesday()).unwrap();

        let classes = &view.attendees[0].classes;
        assert_eq!(classes.len(), 2);
        assert!(classes.iter().all(|e| !e.attendance));

        // sorted by start time
        assert_eq!(classes[0].class.name, "Lunchtime No Gi");
        assert_eq!(classes[1].class.name, "Evening Gi");
    }

    #[test]
    fn classes_are_filtered_by_age_group() {
        let me = AttendeeKey::account(1);
        let kid = AttendeeKey::dependent(1, 5);

        let view = build(
            vec![attendee(me, ADULTS, 0), attendee(kid, JUNIORS, 0)],
            &timetable(),
            &[record(kid, 3, wednesday())],
            wednesday(),
        )
        .unwrap();

        assert_eq!(view.attendees[0].attendee.key, me);
        assert!(view.attendees[0].entry(3).is_none());

        let kids = &view.attendees[1];
        assert_eq!(kids.classes.len(), 1);
        assert!(kids.entry(3).unwrap().attendance);
    }

    #[test]
    fn flags_only_match_the_same_day() {
        let me = AttendeeKey::account(1);
        let monday = ymd(2024, 3, 11);
        let last_week = ymd(2024, 3, 6);

        let records = vec![
            record(me, 1, monday),
            record(me, 2, wednesday()),
            record(me, 1, last_week),
        ];

        let view = build(vec![attendee(me, ADULTS, 2)], &timetable(), &records, wednesday())
            .unwrap();
        let mine = &view.attendees[0];

        assert!(!mine.entry(1).unwrap().attendance);
        assert!(mine.entry(2).unwrap().attendance);
        assert_eq!(mine.sessions_used, 2);
        assert_eq!(mine.sessions_remaining, Some(0));
    }

    #[test]
    fn days_without_classes_are_empty() {
        // a Sunday
        let sunday = ymd(2024, 3, 17);
        let me = AttendeeKey::account(1);

        assert!(build(vec![attendee(me, ADULTS, 0)], &timetable(), &[], sunday).is_none());
    }

    #[test]
    fn equal_start_times_sort_by_name() {
        let classes = vec![
            class(9, "Zeta", 2, 18, ADULTS),
            class(8, "Alpha", 2, 18, ADULTS),
        ];
        let me = AttendeeKey::account(1);

        let view = build(vec![attendee(me, ADULTS, 0)], &classes, &[], wednesday()).unwrap();
        let names = view.attendees[0]
            .classes
            .iter()
            .map(|e| e.class.name.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
