//! Flips attendees between absent and present for the day's classes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::attendance::{AttendanceChange, AttendanceSlot, AttendeeKey};
use crate::db::Db;
use crate::errors::BackendError;
use crate::label::Id;
use crate::view::{AttendeeClasses, DailyView};

/// The classes a toggle applies to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Target {
    All,
    Class(Id),
}

impl FromStr for Target {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Target::All);
        }

        trimmed
            .parse()
            .map(Target::Class)
            .map_err(|_| BackendError::InvalidId(s.to_owned()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::All => f.write_str("all"),
            Target::Class(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Insert,
    Delete,
    NoOp,
}

/// What a toggle does to one class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Decision {
    pub class_id: Id,
    pub action: Action,
}

/// Decides the action for each class `target` names.
///
/// A single class flips. For `All`, every class is checked out when all
/// are present; otherwise only the absent ones are checked in, so a mixed
/// day never loses a check-in. Classes outside the attendee's view only
/// ever produce `NoOp`.
pub fn plan(view: &DailyView, target: Target, attendee: &AttendeeKey) -> Vec<Decision> {
    let classes = match view.attendee(attendee) {
        Some(classes) => classes,
        None => {
            return match target {
                Target::Class(class_id) => vec![Decision {
                    class_id,
                    action: Action::NoOp,
                }],
                Target::All => vec![],
            }
        }
    };

    match target {
        Target::Class(class_id) => {
            let action = match classes.entry(class_id) {
                Some(entry) if entry.attendance => Action::Delete,
                Some(_) => Action::Insert,
                None => Action::NoOp,
            };

            vec![Decision { class_id, action }]
        }
        Target::All => {
            let all_present =
                !classes.classes.is_empty() && classes.classes.iter().all(|e| e.attendance);

            classes
                .classes
                .iter()
                .map(|entry| {
                    let action = match (all_present, entry.attendance) {
                        (true, _) => Action::Delete,
                        (false, false) => Action::Insert,
                        (false, true) => Action::NoOp,
                    };

                    Decision {
                        class_id: entry.class.id,
                        action,
                    }
                })
                .collect()
        }
    }
}

/// Turns decisions into store changes, dropping `NoOp`s. Inserted
/// records take the view's date and the class's start time.
pub fn changes(
    view: &DailyView,
    attendee: &AttendeeKey,
    decisions: &[Decision],
) -> Vec<AttendanceChange> {
    let classes = match view.attendee(attendee) {
        Some(classes) => classes,
        None => return vec![],
    };

    decisions
        .iter()
        .filter_map(|decision| {
            let entry = classes.entry(decision.class_id)?;

            let slot = AttendanceSlot {
                attendee: *attendee,
                class_id: entry.class.id,
                class_date: view.date,
                class_time: entry.class.start_time,
            };

            match decision.action {
                Action::Insert => Some(AttendanceChange::Insert(slot)),
                Action::Delete => Some(AttendanceChange::Delete(slot)),
                Action::NoOp => None,
            }
        })
        .collect()
}

/// The outcome of a toggle, with a notice per decision.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Outcome {
    pub changes: usize,
    pub messages: Vec<String>,
}

/// Plans the toggle, writes every change in one batch, then updates the
/// view's flags. Nothing in the view changes if the batch fails.
pub async fn toggle(
    db: &(dyn Db + Send + Sync),
    view: &mut DailyView,
    target: Target,
    attendee: &AttendeeKey,
    recorded_at: PrimitiveDateTime,
) -> Result<Outcome, BackendError> {
    let decisions = plan(view, target, attendee);
    let changes = changes(view, attendee, &decisions);

    if !changes.is_empty() {
        db.apply_attendance_changes(changes.clone(), recorded_at)
            .await?;
    }

    let mut outcome = Outcome {
        changes: changes.len(),
        messages: vec![],
    };

    let classes = match view.attendee_mut(attendee) {
        Some(classes) => classes,
        None => {
            outcome
                .messages
                .push("That class is not available to check in to today.".to_owned());
            return Ok(outcome);
        }
    };

    for decision in &decisions {
        outcome.messages.push(describe(classes, decision));

        match decision.action {
            Action::Insert => classes.set_attendance(decision.class_id, true),
            Action::Delete => classes.set_attendance(decision.class_id, false),
            Action::NoOp => {}
        }
    }

    if decisions.is_empty() {
        outcome
            .messages
            .push(format!("No classes are available to {} today.", classes.attendee.name));
    }

    Ok(outcome)
}

fn describe(classes: &AttendeeClasses, decision: &Decision) -> String {
    let name = &classes.attendee.name;

    match (decision.action, classes.entry(decision.class_id)) {
        (Action::Insert, Some(entry)) => format!("{} checked in to {}.", name, entry.class.name),
        (Action::Delete, Some(entry)) => format!("{} checked out of {}.", name, entry.class.name),
        (Action::NoOp, Some(entry)) => {
            format!("{} is already checked in to {}.", name, entry.class.name)
        }
        _ => "That class is not available to check in to today.".to_owned(),
    }
}
