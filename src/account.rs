use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::errors::BackendError;
use crate::label::Id;
use crate::normalization;

/// The privileges an account holds over other accounts and reports.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Privilege {
    #[serde(rename = "no")]
    No,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "read-write")]
    ReadWrite,
}

impl Privilege {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::No => "no",
            Privilege::Test => "test",
            Privilege::Read => "read",
            Privilege::ReadWrite => "read-write",
        }
    }
}

impl Default for Privilege {
    fn default() -> Self {
        Privilege::No
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no" => Ok(Privilege::No),
            "test" => Ok(Privilege::Test),
            "read" => Ok(Privilege::Read),
            "read-write" => Ok(Privilege::ReadWrite),
            other => Err(BackendError::InvalidAdminLevel(other.to_owned())),
        }
    }
}

/// A registered member of the club.
#[derive(Clone, Debug, Serialize)]
pub struct Account {
    pub id: Id,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,

    /// The recorded age group. When absent, the membership's age group
    /// applies.
    pub age_group_id: Option<Id>,
    pub membership_id: Id,
    pub is_coach: bool,
    pub admin: Privilege,

    #[serde(skip_serializing)]
    pub last_access: Option<PrimitiveDateTime>,
}

impl Account {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A sub-account, usually a child, checked in under its own identity.
#[derive(Clone, Debug, Serialize)]
pub struct Dependent {
    pub id: Id,
    pub account_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub age_group_id: Id,

    /// The dependent's own membership. When absent, the owner's applies.
    pub membership_id: Option<Id>,
}

impl Dependent {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The membership type that moves dependents into the junior age group.
pub const FAMILY_MEMBERSHIP: &str = "family";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Membership {
    pub id: Id,
    pub name: String,
    pub membership_type: String,
    pub age_group_id: Id,

    /// 0 means unlimited.
    pub sessions_per_week: i32,
}

impl Membership {
    pub fn is_family(&self) -> bool {
        self.membership_type.eq_ignore_ascii_case(FAMILY_MEMBERSHIP)
    }

    pub fn is_unlimited(&self) -> bool {
        self.sessions_per_week == 0
    }
}

/// The PHC-format argon2 hash stored for an account's password.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub hash: String,
}

/// The details submitted to register an account.
#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    #[serde(deserialize_with = "normalization::deserialize_email")]
    pub email: String,

    pub password: String,
    pub confirm_password: String,

    #[serde(deserialize_with = "normalization::deserialize")]
    pub first_name: String,

    #[serde(deserialize_with = "normalization::deserialize")]
    pub last_name: String,

    #[serde(default)]
    pub mobile: String,

    pub membership_id: Id,

    #[serde(default)]
    pub age_group_id: Option<Id>,

    #[serde(default)]
    pub dependents: Vec<NewDependent>,
}

impl Registration {
    /// Checks the fields that can be validated without the database.
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.email.is_empty() {
            return Err(BackendError::MissingField("email"));
        }

        if self.password.is_empty() {
            return Err(BackendError::MissingField("password"));
        }

        if self.first_name.is_empty() {
            return Err(BackendError::MissingField("first_name"));
        }

        if self.password != self.confirm_password {
            return Err(BackendError::PasswordMismatch);
        }

        self.dependents.iter().try_for_each(NewDependent::validate)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Login {
    #[serde(deserialize_with = "normalization::deserialize_email")]
    pub email: String,

    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AdminLevelUpdate {
    pub admin: String,
}

/// The editable details of an existing account.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountUpdate {
    #[serde(deserialize_with = "normalization::deserialize_email")]
    pub email: String,

    pub membership_id: Id,
}

impl AccountUpdate {
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.email.is_empty() {
            Err(BackendError::MissingField("email"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PasswordChange {
    /// Not checked when a read-write admin changes someone else's password.
    #[serde(default)]
    pub old_password: String,

    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.new_password.is_empty() {
            return Err(BackendError::MissingField("new_password"));
        }

        if self.new_password != self.confirm_password {
            return Err(BackendError::PasswordMismatch);
        }

        Ok(())
    }
}

/// A new account as written to the database.
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub membership_id: Id,
    pub age_group_id: Option<Id>,
    pub credentials: Credentials,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewDependent {
    #[serde(deserialize_with = "normalization::deserialize")]
    pub first_name: String,

    #[serde(deserialize_with = "normalization::deserialize")]
    pub last_name: String,

    pub age_group_id: Id,

    #[serde(default)]
    pub membership_id: Option<Id>,
}

impl NewDependent {
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.first_name.is_empty() {
            Err(BackendError::MissingField("first_name"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMembership {
    #[serde(deserialize_with = "normalization::deserialize_lowercase")]
    pub name: String,

    #[serde(deserialize_with = "normalization::deserialize_lowercase")]
    pub membership_type: String,

    pub age_group_id: Id,

    #[serde(default)]
    pub sessions_per_week: i32,
}

impl NewMembership {
    pub fn validate(&self) -> Result<(), BackendError> {
        if self.name.is_empty() {
            return Err(BackendError::MissingField("name"));
        }

        if self.sessions_per_week < 0 {
            return Err(BackendError::InvalidSessionLimit(self.sessions_per_week));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileges_round_trip_through_their_names() {
        for privilege in &[
            Privilege::No,
            Privilege::Test,
            Privilege::Read,
            Privilege::ReadWrite,
        ] {
            assert_eq!(privilege.as_str().parse::<Privilege>().unwrap(), *privilege);
        }

        assert!("root".parse::<Privilege>().is_err());
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let registration: Registration = serde_json::from_value(serde_json::json!({
            "email": " Someone@Example.com ",
            "password": "hunter2",
            "confirm_password": "hunter3",
            "first_name": "Helio",
            "last_name": "Gracie",
            "membership_id": 1,
        }))
        .unwrap();

        assert_eq!(registration.email, "someone@example.com");
        assert!(matches!(
            registration.validate(),
            Err(BackendError::PasswordMismatch)
        ));
    }
}
