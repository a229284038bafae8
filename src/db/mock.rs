//! An in-memory `Db` for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::FutureExt;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use super::Db;
use crate::account::{
    Account, AccountUpdate, Credentials, Dependent, Membership, NewAccount, NewDependent,
    NewMembership, Privilege,
};
use crate::attendance::{AttendanceChange, AttendanceFilter, AttendanceRecord, AttendanceRow};
use crate::class::{Class, NewClass};
use crate::errors::BackendError;
use crate::label::{Id, Label};

pub const ADULTS: Id = 1;
pub const JUNIORS: Id = 2;

#[derive(Default)]
struct State {
    last_id: Id,
    accounts: Vec<(Account, Credentials)>,
    dependents: Vec<Dependent>,
    memberships: Vec<Membership>,
    age_groups: Vec<Label>,
    classes: Vec<Class>,
    attendance: Vec<AttendanceRecord>,
    sessions: HashMap<Uuid, Id>,
}

impl State {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn account(&self, id: Id) -> Option<&Account> {
        self.accounts.iter().map(|(a, _)| a).find(|a| a.id == id)
    }

    fn account_mut(&mut self, id: Id) -> Result<&mut Account, BackendError> {
        self.accounts
            .iter_mut()
            .map(|(a, _)| a)
            .find(|a| a.id == id)
            .ok_or(BackendError::NonExistentAccount(id))
    }

    fn row(&self, record: &AttendanceRecord) -> Option<AttendanceRow> {
        let class = self.classes.iter().find(|c| c.id == record.class_id)?;
        let account = self.account(record.attendee.account_id)?;

        let dependent = match record.attendee.dependent_id {
            Some(id) => Some(self.dependents.iter().find(|d| d.id == id)?),
            None => None,
        };

        let membership_id = dependent
            .and_then(|d| d.membership_id)
            .unwrap_or(account.membership_id);
        let membership = self.memberships.iter().find(|m| m.id == membership_id)?;

        Some(AttendanceRow {
            record: record.clone(),
            class_name: class.name.clone(),
            full_name: dependent.map_or_else(|| account.full_name(), |d| d.full_name()),
            membership_type: membership.membership_type.clone(),
            sessions_per_week: membership.sessions_per_week,
        })
    }
}

/// Keeps everything in memory. Writes can be made to fail to exercise
/// error paths.
#[derive(Default)]
pub struct MockDb {
    state: RwLock<State>,
    fail_writes: AtomicBool,
}

impl MockDb {
    /// A database holding the adult and junior age groups and no
    /// memberships.
    pub fn seeded() -> Self {
        let db = MockDb::default();

        {
            let mut state = db.state.write().unwrap();
            state.age_groups = vec![Label::new(ADULTS, "Adults"), Label::new(JUNIORS, "Juniors")];
            state.last_id = JUNIORS;
        }

        db
    }

    /// Makes attendance changes fail without writing anything.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.state.read().unwrap().attendance.clone()
    }

    pub fn insert_record(&self, record: AttendanceRecord) {
        self.state.write().unwrap().attendance.push(record);
    }

    pub fn add_membership(&self, membership: NewMembership) -> Id {
        let mut state = self.state.write().unwrap();
        let id = state.next_id();

        state.memberships.push(Membership {
            id,
            name: membership.name,
            membership_type: membership.membership_type,
            age_group_id: membership.age_group_id,
            sessions_per_week: membership.sessions_per_week,
        });

        id
    }

    pub fn add_class(&self, class: NewClass) -> Id {
        let mut state = self.state.write().unwrap();
        let id = state.next_id();

        state.classes.push(Class {
            id,
            name: class.name,
            class_type: class.class_type,
            weekday: class.weekday,
            start_time: class.start_time,
            duration_minutes: class.duration_minutes,
            age_group_id: class.age_group_id,
            coach_id: class.coach_id,
        });

        id
    }
}

impl Db for MockDb {
    fn create_session(
        &self,
        account_id: Id,
        _created_at: PrimitiveDateTime,
    ) -> BoxFuture<Result<Uuid, BackendError>> {
        async move {
            let token = Uuid::new_v4();
            self.state.write().unwrap().sessions.insert(token, account_id);

            Ok(token)
        }
        .boxed()
    }

    fn retrieve_session(&self, token: &Uuid) -> BoxFuture<Result<Option<Account>, BackendError>> {
        let token = *token;

        async move {
            let state = self.state.read().unwrap();

            Ok(state
                .sessions
                .get(&token)
                .and_then(|id| state.account(*id))
                .cloned())
        }
        .boxed()
    }

    fn delete_session(&self, token: &Uuid) -> BoxFuture<Result<(), BackendError>> {
        let token = *token;

        async move {
            self.state.write().unwrap().sessions.remove(&token);

            Ok(())
        }
        .boxed()
    }

    fn delete_sessions(&self, account_id: Id) -> BoxFuture<Result<u64, BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();
            let before = state.sessions.len();
            state.sessions.retain(|_, id| *id != account_id);

            Ok((before - state.sessions.len()) as u64)
        }
        .boxed()
    }

    fn touch_account(&self, id: Id, at: PrimitiveDateTime) -> BoxFuture<Result<(), BackendError>> {
        async move {
            self.state.write().unwrap().account_mut(id)?.last_access = Some(at);

            Ok(())
        }
        .boxed()
    }

    fn create_account(
        &self,
        account: NewAccount,
        dependents: Vec<NewDependent>,
    ) -> BoxFuture<Result<Id, BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();

            if state.accounts.iter().any(|(a, _)| a.email == account.email) {
                return Err(BackendError::EmailAlreadyExists(account.email));
            }

            let id = state.next_id();

            state.accounts.push((
                Account {
                    id,
                    email: account.email,
                    first_name: account.first_name,
                    last_name: account.last_name,
                    mobile: account.mobile,
                    age_group_id: account.age_group_id,
                    membership_id: account.membership_id,
                    is_coach: false,
                    admin: Privilege::No,
                    last_access: None,
                },
                account.credentials,
            ));

            for dependent in dependents {
                let dependent_id = state.next_id();

                state.dependents.push(Dependent {
                    id: dependent_id,
                    account_id: id,
                    first_name: dependent.first_name,
                    last_name: dependent.last_name,
                    age_group_id: dependent.age_group_id,
                    membership_id: dependent.membership_id,
                });
            }

            Ok(id)
        }
        .boxed()
    }

    fn retrieve_account(&self, id: Id) -> BoxFuture<Result<Option<Account>, BackendError>> {
        async move { Ok(self.state.read().unwrap().account(id).cloned()) }.boxed()
    }

    fn retrieve_accounts(&self) -> BoxFuture<Result<Vec<Account>, BackendError>> {
        async move {
            let mut accounts = self
                .state
                .read()
                .unwrap()
                .accounts
                .iter()
                .map(|(a, _)| a.clone())
                .collect::<Vec<_>>();
            accounts.sort_by(|a, b| {
                (&a.last_name, &a.first_name, a.id).cmp(&(&b.last_name, &b.first_name, b.id))
            });

            Ok(accounts)
        }
        .boxed()
    }

    fn retrieve_credentials(
        &self,
        email: &str,
    ) -> BoxFuture<Result<Option<(Id, Credentials)>, BackendError>> {
        let email = email.to_owned();

        async move {
            Ok(self
                .state
                .read()
                .unwrap()
                .accounts
                .iter()
                .find(|(a, _)| a.email == email)
                .map(|(a, c)| (a.id, c.clone())))
        }
        .boxed()
    }

    fn retrieve_password(&self, id: Id) -> BoxFuture<Result<Option<Credentials>, BackendError>> {
        async move {
            Ok(self
                .state
                .read()
                .unwrap()
                .accounts
                .iter()
                .find(|(a, _)| a.id == id)
                .map(|(_, c)| c.clone()))
        }
        .boxed()
    }

    fn update_password(
        &self,
        id: Id,
        credentials: Credentials,
    ) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();
            let stored = state
                .accounts
                .iter_mut()
                .find(|(a, _)| a.id == id)
                .map(|(_, c)| c)
                .ok_or(BackendError::NonExistentAccount(id))?;
            *stored = credentials;

            Ok(())
        }
        .boxed()
    }

    fn update_account(&self, id: Id, update: AccountUpdate) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();

            if state
                .accounts
                .iter()
                .any(|(a, _)| a.id != id && a.email == update.email)
            {
                return Err(BackendError::EmailAlreadyExists(update.email));
            }

            let account = state.account_mut(id)?;
            account.email = update.email;
            account.membership_id = update.membership_id;

            Ok(())
        }
        .boxed()
    }

    fn toggle_coach(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();
            let account = state.account_mut(id)?;
            account.is_coach = !account.is_coach;

            Ok(account.is_coach)
        }
        .boxed()
    }

    fn set_admin(&self, id: Id, privilege: Privilege) -> BoxFuture<Result<(), BackendError>> {
        async move {
            self.state.write().unwrap().account_mut(id)?.admin = privilege;

            Ok(())
        }
        .boxed()
    }

    fn delete_account(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();
            state.account_mut(id)?;

            state.accounts.retain(|(a, _)| a.id != id);
            state.dependents.retain(|d| d.account_id != id);
            state.attendance.retain(|r| r.attendee.account_id != id);
            state.sessions.retain(|_, account_id| *account_id != id);

            Ok(())
        }
        .boxed()
    }

    fn create_dependent(
        &self,
        account_id: Id,
        dependent: NewDependent,
    ) -> BoxFuture<Result<Id, BackendError>> {
        async move {
            let mut state = self.state.write().unwrap();
            state.account_mut(account_id)?;

            let id = state.next_id();
            state.dependents.push(Dependent {
                id,
                account_id,
                first_name: dependent.first_name,
                last_name: dependent.last_name,
                age_group_id: dependent.age_group_id,
                membership_id: dependent.membership_id,
            });

            Ok(id)
        }
        .boxed()
    }

    fn retrieve_dependents(&self, account_id: Id) -> BoxFuture<Result<Vec<Dependent>, BackendError>> {
        async move {
            Ok(self
                .state
                .read()
                .unwrap()
                .dependents
                .iter()
                .filter(|d| d.account_id == account_id)
                .cloned()
                .collect())
        }
        .boxed()
    }

    fn retrieve_memberships(&self) -> BoxFuture<Result<Vec<Membership>, BackendError>> {
        async move { Ok(self.state.read().unwrap().memberships.clone()) }.boxed()
    }

    fn create_membership(&self, membership: NewMembership) -> BoxFuture<Result<Id, BackendError>> {
        async move { Ok(self.add_membership(membership)) }.boxed()
    }

    fn retrieve_age_groups(&self) -> BoxFuture<Result<Vec<Label>, BackendError>> {
        async move { Ok(self.state.read().unwrap().age_groups.clone()) }.boxed()
    }

    fn retrieve_classes(&self) -> BoxFuture<Result<Vec<Class>, BackendError>> {
        async move {
            let mut classes = self.state.read().unwrap().classes.clone();
            classes.sort_by(|a, b| {
                (a.weekday, a.start_time, &a.name, a.id).cmp(&(b.weekday, b.start_time, &b.name, b.id))
            });

            Ok(classes)
        }
        .boxed()
    }

    fn create_class(&self, class: NewClass) -> BoxFuture<Result<Id, BackendError>> {
        async move { Ok(self.add_class(class)) }.boxed()
    }

    fn attendance(
        &self,
        filter: AttendanceFilter,
    ) -> BoxFuture<Result<Vec<AttendanceRow>, BackendError>> {
        async move {
            let state = self.state.read().unwrap();

            let mut rows = state
                .attendance
                .iter()
                .filter(|r| filter.matches(r))
                .filter_map(|r| state.row(r))
                .collect::<Vec<_>>();
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

            Ok(rows)
        }
        .boxed()
    }

    fn latest_attendance(&self) -> BoxFuture<Result<Vec<(Id, Date)>, BackendError>> {
        async move {
            let mut latest: HashMap<Id, Date> = HashMap::new();

            for record in &self.state.read().unwrap().attendance {
                if record.attendee.dependent_id.is_some() {
                    continue;
                }

                let last = latest
                    .entry(record.attendee.account_id)
                    .or_insert(record.class_date);
                *last = (*last).max(record.class_date);
            }

            Ok(latest.into_iter().collect())
        }
        .boxed()
    }

    fn apply_attendance_changes(
        &self,
        changes: Vec<AttendanceChange>,
        recorded_at: PrimitiveDateTime,
    ) -> BoxFuture<Result<(), BackendError>> {
        async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(BackendError::Sqlx {
                    source: sqlx::Error::PoolClosed,
                });
            }

            let mut state = self.state.write().unwrap();

            for change in changes {
                match change {
                    AttendanceChange::Insert(slot) => state.attendance.push(AttendanceRecord {
                        attendee: slot.attendee,
                        class_id: slot.class_id,
                        class_date: slot.class_date,
                        class_time: slot.class_time,
                        recorded_at,
                    }),
                    AttendanceChange::Delete(slot) => {
                        state.attendance.retain(|r| !slot.matches(r))
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }
}
