use futures::future::BoxFuture;
use time::{Date, PrimitiveDateTime};
use uuid::Uuid;

use crate::account::{
    Account, AccountUpdate, Credentials, Dependent, Membership, NewAccount, NewDependent,
    NewMembership, Privilege,
};
use crate::attendance::{AttendanceChange, AttendanceFilter, AttendanceRow};
use crate::class::{Class, NewClass};
use crate::errors::BackendError;
use crate::label::{Id, Label};

pub mod mock;

pub trait Db {
    fn create_session(
        &self,
        account_id: Id,
        created_at: PrimitiveDateTime,
    ) -> BoxFuture<Result<Uuid, BackendError>>;

    /// Returns the account a session token belongs to.
    fn retrieve_session(&self, token: &Uuid) -> BoxFuture<Result<Option<Account>, BackendError>>;

    fn delete_session(&self, token: &Uuid) -> BoxFuture<Result<(), BackendError>>;

    /// Ends every session of an account and returns how many there were.
    fn delete_sessions(&self, account_id: Id) -> BoxFuture<Result<u64, BackendError>>;

    fn touch_account(&self, id: Id, at: PrimitiveDateTime) -> BoxFuture<Result<(), BackendError>>;

    /// Creates the account and its dependents together.
    fn create_account(
        &self,
        account: NewAccount,
        dependents: Vec<NewDependent>,
    ) -> BoxFuture<Result<Id, BackendError>>;

    fn retrieve_account(&self, id: Id) -> BoxFuture<Result<Option<Account>, BackendError>>;

    fn retrieve_accounts(&self) -> BoxFuture<Result<Vec<Account>, BackendError>>;

    fn retrieve_credentials(
        &self,
        email: &str,
    ) -> BoxFuture<Result<Option<(Id, Credentials)>, BackendError>>;

    fn retrieve_password(&self, id: Id) -> BoxFuture<Result<Option<Credentials>, BackendError>>;

    fn update_password(
        &self,
        id: Id,
        credentials: Credentials,
    ) -> BoxFuture<Result<(), BackendError>>;

    /// Fails with `EmailAlreadyExists` if another account holds the email.
    fn update_account(&self, id: Id, update: AccountUpdate) -> BoxFuture<Result<(), BackendError>>;

    /// Flips the coach flag and returns its new value.
    fn toggle_coach(&self, id: Id) -> BoxFuture<Result<bool, BackendError>>;

    fn set_admin(&self, id: Id, privilege: Privilege) -> BoxFuture<Result<(), BackendError>>;

    fn delete_account(&self, id: Id) -> BoxFuture<Result<(), BackendError>>;

    fn create_dependent(
        &self,
        account_id: Id,
        dependent: NewDependent,
    ) -> BoxFuture<Result<Id, BackendError>>;

    fn retrieve_dependents(&self, account_id: Id) -> BoxFuture<Result<Vec<Dependent>, BackendError>>;

    fn retrieve_memberships(&self) -> BoxFuture<Result<Vec<Membership>, BackendError>>;

    fn create_membership(&self, membership: NewMembership) -> BoxFuture<Result<Id, BackendError>>;

    fn retrieve_age_groups(&self) -> BoxFuture<Result<Vec<Label>, BackendError>>;

    fn retrieve_classes(&self) -> BoxFuture<Result<Vec<Class>, BackendError>>;

    fn create_class(&self, class: NewClass) -> BoxFuture<Result<Id, BackendError>>;

    /// Check-ins matching `filter`, joined with the names and the effective
    /// membership of whoever checked in.
    fn attendance(
        &self,
        filter: AttendanceFilter,
    ) -> BoxFuture<Result<Vec<AttendanceRow>, BackendError>>;

    /// The most recent date each account checked itself in. Dependents'
    /// check-ins are not included.
    fn latest_attendance(&self) -> BoxFuture<Result<Vec<(Id, Date)>, BackendError>>;

    /// Applies every change or none of them.
    fn apply_attendance_changes(
        &self,
        changes: Vec<AttendanceChange>,
        recorded_at: PrimitiveDateTime,
    ) -> BoxFuture<Result<(), BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::{
        self,
        postgres::{PgPool, PgRow},
    };
    use time::{Date, PrimitiveDateTime};
    use uuid::Uuid;

    use crate::account::{
        Account, AccountUpdate, Credentials, Dependent, Membership, NewAccount, NewDependent,
        NewMembership, Privilege,
    };
    use crate::attendance::{
        AttendanceChange, AttendanceFilter, AttendanceRecord, AttendanceRow, AttendeeKey,
    };
    use crate::class::{Class, ClassType, NewClass};
    use crate::errors::BackendError;
    use crate::label::{Id, Label};

    const ACCOUNTS_EMAIL_CONSTRAINT: &str = "accounts_email";

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn create_session(
            &self,
            account_id: Id,
            created_at: PrimitiveDateTime,
        ) -> BoxFuture<Result<Uuid, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_session.sql"));

                let (token,): (Uuid,) = query
                    .bind(Uuid::new_v4())
                    .bind(account_id)
                    .bind(created_at)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(token)
            }
            .boxed()
        }

        fn retrieve_session(
            &self,
            token: &Uuid,
        ) -> BoxFuture<Result<Option<Account>, BackendError>> {
            let token = *token;

            async move {
                let query = sqlx::query(include_str!("queries/retrieve_session.sql"));

                let account = query
                    .bind(token)
                    .try_map(|row: PgRow| account_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(account)
            }
            .boxed()
        }

        fn delete_session(&self, token: &Uuid) -> BoxFuture<Result<(), BackendError>> {
            let token = *token;

            async move {
                let query = sqlx::query(include_str!("queries/delete_session.sql"));

                query
                    .bind(token)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }

        fn delete_sessions(&self, account_id: Id) -> BoxFuture<Result<u64, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/delete_sessions.sql"));

                let count = query
                    .bind(account_id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                Ok(count)
            }
            .boxed()
        }

        fn touch_account(
            &self,
            id: Id,
            at: PrimitiveDateTime,
        ) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/touch_account.sql"));

                query
                    .bind(id)
                    .bind(at)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

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
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                let query = sqlx::query_as(include_str!("queries/create_account.sql"));

                let (id,): (Id,) = query
                    .bind(&account.email)
                    .bind(&account.first_name)
                    .bind(&account.last_name)
                    .bind(&account.mobile)
                    .bind(account.membership_id)
                    .bind(account.age_group_id)
                    .bind(&account.credentials.hash)
                    .fetch_one(&mut tx)
                    .await
                    .map_err(|e| {
                        if violates(&e, ACCOUNTS_EMAIL_CONSTRAINT) {
                            BackendError::EmailAlreadyExists(account.email.clone())
                        } else {
                            map_sqlx_error(e)
                        }
                    })?;

                for dependent in dependents {
                    let query = sqlx::query(include_str!("queries/create_dependent.sql"));

                    query
                        .bind(id)
                        .bind(&dependent.first_name)
                        .bind(&dependent.last_name)
                        .bind(dependent.age_group_id)
                        .bind(dependent.membership_id)
                        .execute(&mut tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn retrieve_account(&self, id: Id) -> BoxFuture<Result<Option<Account>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_account.sql"));

                let account = query
                    .bind(id)
                    .try_map(|row: PgRow| account_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(account)
            }
            .boxed()
        }

        fn retrieve_accounts(&self) -> BoxFuture<Result<Vec<Account>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_accounts.sql"));

                let accounts = query
                    .try_map(|row: PgRow| account_from_row(&row))
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

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
                let query = sqlx::query(include_str!("queries/retrieve_credentials.sql"));

                let credentials = query
                    .bind(email)
                    .try_map(|row: PgRow| {
                        let id: Id = try_get(&row, "id")?;
                        let credentials = Credentials {
                            hash: try_get(&row, "password_hash")?,
                        };

                        Ok((id, credentials))
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(credentials)
            }
            .boxed()
        }

        fn retrieve_password(
            &self,
            id: Id,
        ) -> BoxFuture<Result<Option<Credentials>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_password.sql"));

                let credentials = query
                    .bind(id)
                    .try_map(|row: PgRow| {
                        Ok(Credentials {
                            hash: try_get(&row, "password_hash")?,
                        })
                    })
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(credentials)
            }
            .boxed()
        }

        fn update_password(
            &self,
            id: Id,
            credentials: Credentials,
        ) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/update_password.sql"));

                let count = query
                    .bind(id)
                    .bind(&credentials.hash)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentAccount(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn update_account(
            &self,
            id: Id,
            update: AccountUpdate,
        ) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/update_account.sql"));

                let count = query
                    .bind(id)
                    .bind(&update.email)
                    .bind(update.membership_id)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        if violates(&e, ACCOUNTS_EMAIL_CONSTRAINT) {
                            BackendError::EmailAlreadyExists(update.email.clone())
                        } else {
                            map_sqlx_error(e)
                        }
                    })?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentAccount(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn toggle_coach(&self, id: Id) -> BoxFuture<Result<bool, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/toggle_coach.sql"));

                let result: Option<(bool,)> = query
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                result
                    .map(|(is_coach,)| is_coach)
                    .ok_or(BackendError::NonExistentAccount(id))
            }
            .boxed()
        }

        fn set_admin(&self, id: Id, privilege: Privilege) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/set_admin.sql"));

                let count = query
                    .bind(id)
                    .bind(privilege.as_str())
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentAccount(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn delete_account(&self, id: Id) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/delete_account.sql"));

                let count = query
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?
                    .rows_affected();

                if count == 0 {
                    Err(BackendError::NonExistentAccount(id))
                } else {
                    Ok(())
                }
            }
            .boxed()
        }

        fn create_dependent(
            &self,
            account_id: Id,
            dependent: NewDependent,
        ) -> BoxFuture<Result<Id, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_dependent.sql"));

                let (id,): (Id,) = query
                    .bind(account_id)
                    .bind(&dependent.first_name)
                    .bind(&dependent.last_name)
                    .bind(dependent.age_group_id)
                    .bind(dependent.membership_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn retrieve_dependents(
            &self,
            account_id: Id,
        ) -> BoxFuture<Result<Vec<Dependent>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_dependents.sql"));

                let dependents = query
                    .bind(account_id)
                    .try_map(|row: PgRow| {
                        Ok(Dependent {
                            id: try_get(&row, "id")?,
                            account_id: try_get(&row, "account_id")?,
                            first_name: try_get(&row, "first_name")?,
                            last_name: try_get(&row, "last_name")?,
                            age_group_id: try_get(&row, "age_group_id")?,
                            membership_id: try_get(&row, "membership_id")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(dependents)
            }
            .boxed()
        }

        fn retrieve_memberships(&self) -> BoxFuture<Result<Vec<Membership>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_memberships.sql"));

                let memberships = query
                    .try_map(|row: PgRow| {
                        Ok(Membership {
                            id: try_get(&row, "id")?,
                            name: try_get(&row, "name")?,
                            membership_type: try_get(&row, "membership_type")?,
                            age_group_id: try_get(&row, "age_group_id")?,
                            sessions_per_week: try_get(&row, "sessions_per_week")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(memberships)
            }
            .boxed()
        }

        fn create_membership(
            &self,
            membership: NewMembership,
        ) -> BoxFuture<Result<Id, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_membership.sql"));

                let (id,): (Id,) = query
                    .bind(&membership.name)
                    .bind(&membership.membership_type)
                    .bind(membership.age_group_id)
                    .bind(membership.sessions_per_week)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn retrieve_age_groups(&self) -> BoxFuture<Result<Vec<Label>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_age_groups.sql"));

                let age_groups = query
                    .try_map(|row: PgRow| {
                        Ok(Label::new(
                            try_get::<Id>(&row, "id")?,
                            try_get::<String>(&row, "name")?,
                        ))
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(age_groups)
            }
            .boxed()
        }

        fn retrieve_classes(&self) -> BoxFuture<Result<Vec<Class>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_classes.sql"));

                let classes = query
                    .try_map(|row: PgRow| {
                        let class_type: String = try_get(&row, "class_type")?;
                        let class_type: ClassType = class_type
                            .parse()
                            .map_err(|e: BackendError| sqlx::Error::Decode(Box::new(e)))?;

                        Ok(Class {
                            id: try_get(&row, "id")?,
                            name: try_get(&row, "name")?,
                            class_type,
                            weekday: try_get(&row, "weekday")?,
                            start_time: try_get(&row, "start_time")?,
                            duration_minutes: try_get(&row, "duration_minutes")?,
                            age_group_id: try_get(&row, "age_group_id")?,
                            coach_id: try_get(&row, "coach_id")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(classes)
            }
            .boxed()
        }

        fn create_class(&self, class: NewClass) -> BoxFuture<Result<Id, BackendError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create_class.sql"));

                let (id,): (Id,) = query
                    .bind(&class.name)
                    .bind(class.class_type.as_str())
                    .bind(class.weekday)
                    .bind(class.start_time)
                    .bind(class.duration_minutes)
                    .bind(class.age_group_id)
                    .bind(class.coach_id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(id)
            }
            .boxed()
        }

        fn attendance(
            &self,
            filter: AttendanceFilter,
        ) -> BoxFuture<Result<Vec<AttendanceRow>, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/retrieve_attendance.sql"));

                let (start, end) = match filter.range {
                    Some(range) => {
                        let (start, end) = range.bounds();
                        (Some(start), Some(end))
                    }
                    None => (None, None),
                };

                let rows = query
                    .bind(start)
                    .bind(end)
                    .bind(filter.account_id)
                    .bind(filter.class_id)
                    .try_map(|row: PgRow| {
                        let record = AttendanceRecord {
                            attendee: AttendeeKey {
                                account_id: try_get(&row, "account_id")?,
                                dependent_id: try_get(&row, "dependent_id")?,
                            },
                            class_id: try_get(&row, "class_id")?,
                            class_date: try_get(&row, "class_date")?,
                            class_time: try_get(&row, "class_time")?,
                            recorded_at: try_get(&row, "recorded_at")?,
                        };

                        Ok(AttendanceRow {
                            record,
                            class_name: try_get(&row, "class_name")?,
                            full_name: try_get(&row, "full_name")?,
                            membership_type: try_get(&row, "membership_type")?,
                            sessions_per_week: try_get(&row, "sessions_per_week")?,
                        })
                    })
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(rows)
            }
            .boxed()
        }

        fn latest_attendance(&self) -> BoxFuture<Result<Vec<(Id, Date)>, BackendError>> {
            async move {
                let query = sqlx::query_as::<_, (Id, Date)>(include_str!(
                    "queries/latest_attendance.sql"
                ));

                let latest = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;

                Ok(latest)
            }
            .boxed()
        }

        fn apply_attendance_changes(
            &self,
            changes: Vec<AttendanceChange>,
            recorded_at: PrimitiveDateTime,
        ) -> BoxFuture<Result<(), BackendError>> {
            async move {
                let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

                for change in &changes {
                    let query = match change {
                        AttendanceChange::Insert(_) => {
                            sqlx::query(include_str!("queries/insert_attendance.sql"))
                        }
                        AttendanceChange::Delete(_) => {
                            sqlx::query(include_str!("queries/delete_attendance.sql"))
                        }
                    };

                    let slot = change.slot();

                    let query = query
                        .bind(slot.attendee.account_id)
                        .bind(slot.attendee.dependent_id)
                        .bind(slot.class_id)
                        .bind(slot.class_date)
                        .bind(slot.class_time);

                    let query = match change {
                        AttendanceChange::Insert(_) => query.bind(recorded_at),
                        AttendanceChange::Delete(_) => query,
                    };

                    query.execute(&mut tx).await.map_err(map_sqlx_error)?;
                }

                tx.commit().await.map_err(map_sqlx_error)?;

                Ok(())
            }
            .boxed()
        }
    }

    fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
        let admin: String = try_get(row, "admin")?;
        let admin: Privilege = admin
            .parse()
            .map_err(|e: BackendError| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Account {
            id: try_get(row, "id")?,
            email: try_get(row, "email")?,
            first_name: try_get(row, "first_name")?,
            last_name: try_get(row, "last_name")?,
            mobile: try_get(row, "mobile")?,
            age_group_id: try_get(row, "age_group_id")?,
            membership_id: try_get(row, "membership_id")?,
            is_coach: try_get(row, "is_coach")?,
            admin,
            last_access: try_get(row, "last_access")?,
        })
    }

    fn try_get<'a, T: sqlx::Type<sqlx::Postgres> + sqlx::decode::Decode<'a, sqlx::Postgres>>(
        row: &'a PgRow,
        column: &str,
    ) -> Result<T, sqlx::Error> {
        use sqlx::prelude::*;

        row.try_get(column)
    }

    fn violates(error: &sqlx::Error, constraint: &str) -> bool {
        matches!(error, sqlx::Error::Database(e) if e.constraint() == Some(constraint))
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }
}
