//! Resolves a logged-in account into the attendees it may check in.

use serde::Serialize;

use crate::account::{Account, Dependent, Membership};
use crate::attendance::AttendeeKey;
use crate::db::Db;
use crate::errors::BackendError;
use crate::label::Id;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attendee {
    #[serde(flatten)]
    pub key: AttendeeKey,
    pub name: String,

    /// Decides which classes the attendee sees.
    pub age_group_id: Id,

    pub membership_id: Id,

    /// 0 means unlimited.
    pub sessions_per_week: i32,
}

impl Attendee {
    pub fn is_dependent(&self) -> bool {
        self.key.dependent_id.is_some()
    }
}

/// Returns the account first, then its dependents in ID order.
///
/// Dependents without a membership of their own use the owner's. A
/// dependent whose membership is a family membership is placed in
/// `junior_age_group_id`; everyone else keeps the age group they were
/// registered with, falling back to the membership's.
pub fn resolve(
    account: &Account,
    dependents: &[Dependent],
    memberships: &[Membership],
    junior_age_group_id: Id,
) -> Result<Vec<Attendee>, BackendError> {
    let find = |id: Id| {
        memberships
            .iter()
            .find(|m| m.id == id)
            .ok_or(BackendError::UnknownMembership(id))
    };

    let own = find(account.membership_id)?;

    let mut attendees = vec![Attendee {
        key: AttendeeKey::account(account.id),
        name: account.full_name(),
        age_group_id: account.age_group_id.unwrap_or(own.age_group_id),
        membership_id: own.id,
        sessions_per_week: own.sessions_per_week,
    }];

    let mut dependents = dependents
        .iter()
        .filter(|d| d.account_id == account.id)
        .collect::<Vec<_>>();
    dependents.sort_by_key(|d| d.id);

    for dependent in dependents {
        let membership = match dependent.membership_id {
            Some(id) => find(id)?,
            None => own,
        };

        let age_group_id = if membership.is_family() {
            junior_age_group_id
        } else {
            dependent.age_group_id
        };

        attendees.push(Attendee {
            key: AttendeeKey::dependent(account.id, dependent.id),
            name: dependent.full_name(),
            age_group_id,
            membership_id: membership.id,
            sessions_per_week: membership.sessions_per_week,
        });
    }

    Ok(attendees)
}

/// Loads the account's dependents and the membership catalog, then
/// resolves the roster.
pub async fn load(
    db: &(dyn Db + Send + Sync),
    account: &Account,
    junior_age_group_id: Id,
) -> Result<Vec<Attendee>, BackendError> {
    let dependents = db.retrieve_dependents(account.id).await?;
    let memberships = db.retrieve_memberships().await?;

    resolve(account, &dependents, &memberships, junior_age_group_id)
}

/// The sessions left this week, or `None` for an unlimited membership.
pub fn sessions_remaining(limit: i32, used: i32) -> Option<i32> {
    if limit == 0 {
        None
    } else {
        Some((limit - used).max(0))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::account::Privilege;

    pub(crate) const ADULTS: Id = 1;
    pub(crate) const JUNIORS: Id = 2;

    pub(crate) fn memberships() -> Vec<Membership> {
        vec![
            Membership {
                id: 1,
                name: "adult unlimited".to_owned(),
                membership_type: "standard".to_owned(),
                age_group_id: ADULTS,
                sessions_per_week: 0,
            },
            Membership {
                id: 2,
                name: "adult twice weekly".to_owned(),
                membership_type: "standard".to_owned(),
                age_group_id: ADULTS,
                sessions_per_week: 2,
            },
            Membership {
                id: 3,
                name: "family".to_owned(),
                membership_type: "family".to_owned(),
                age_group_id: ADULTS,
                sessions_per_week: 3,
            },
        ]
    }

    pub(crate) fn account(id: Id, membership_id: Id) -> Account {
        Account {
            id,
            email: format!("member{}@example.com", id),
            first_name: "Member".to_owned(),
            last_name: id.to_string(),
            mobile: String::new(),
            age_group_id: None,
            membership_id,
            is_coach: false,
            admin: Privilege::No,
            last_access: None,
        }
    }

    pub(crate) fn dependent(id: Id, account_id: Id, membership_id: Option<Id>) -> Dependent {
        Dependent {
            id,
            account_id,
            first_name: "Kid".to_owned(),
            last_name: id.to_string(),
            age_group_id: ADULTS,
            membership_id,
        }
    }

    #[test]
    fn accounts_without_dependents_yield_one_attendee() {
        let attendees = resolve(&account(7, 2), &[], &memberships(), JUNIORS).unwrap();

        assert_eq!(attendees.len(), 1);
        assert_eq!(attendees[0].key, AttendeeKey::account(7));
        assert_eq!(attendees[0].age_group_id, ADULTS);
        assert_eq!(attendees[0].sessions_per_week, 2);
    }

    #[test]
    fn family_dependents_resolve_to_the_junior_age_group() {
        let dependents = vec![dependent(12, 7, None), dependent(11, 7, Some(1))];

        let attendees = resolve(&account(7, 3), &dependents, &memberships(), JUNIORS).unwrap();

        let keys = attendees.iter().map(|a| a.key).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                AttendeeKey::account(7),
                AttendeeKey::dependent(7, 11),
                AttendeeKey::dependent(7, 12)
            ]
        );

        // the account itself is never moved
        assert_eq!(attendees[0].age_group_id, ADULTS);
        // own standard membership
        assert_eq!(attendees[1].age_group_id, ADULTS);
        assert_eq!(attendees[1].sessions_per_week, 0);
        // inherits the owner's family membership
        assert_eq!(attendees[2].age_group_id, JUNIORS);
        assert_eq!(attendees[2].sessions_per_week, 3);
    }

    #[test]
    fn recorded_age_group_wins_over_the_membership() {
        let mut account = account(7, 1);
        account.age_group_id = Some(JUNIORS);

        let attendees = resolve(&account, &[], &memberships(), JUNIORS).unwrap();

        assert_eq!(attendees[0].age_group_id, JUNIORS);
    }

    #[test]
    fn unknown_memberships_are_errors() {
        let result = resolve(&account(7, 99), &[], &memberships(), JUNIORS);

        assert!(matches!(result, Err(BackendError::UnknownMembership(99))));
    }

    #[test]
    fn remaining_sessions_saturate() {
        assert_eq!(sessions_remaining(0, 5), None);
        assert_eq!(sessions_remaining(2, 1), Some(1));
        assert_eq!(sessions_remaining(2, 3), Some(0));
    }
}
