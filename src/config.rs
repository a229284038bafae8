use std::env;
use std::fmt::Debug;
use std::str::FromStr;

use crate::account::Privilege;
use crate::label::Id;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Parses the named environment variable, falling back to `default` when it
/// is not set. Panics if it is set but unparsable.
pub fn get_optional_variable<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Debug,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|e| panic!("parse {} from {:?}: {:?}", name, value, e)),
        Err(_) => default,
    }
}

/// Which admin levels may read reports and which may change things.
#[derive(Clone, Debug)]
pub struct AdminLevels {
    pub read: Vec<Privilege>,
    pub write: Vec<Privilege>,
}

impl AdminLevels {
    pub fn can_read(&self, privilege: Privilege) -> bool {
        self.read.contains(&privilege)
    }

    pub fn can_write(&self, privilege: Privilege) -> bool {
        self.write.contains(&privilege)
    }
}

impl Default for AdminLevels {
    fn default() -> Self {
        AdminLevels {
            read: vec![Privilege::Test, Privilege::Read, Privilege::ReadWrite],
            write: vec![Privilege::Test, Privilege::ReadWrite],
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub admin_levels: AdminLevels,

    /// Where dependents on a family membership are placed.
    pub junior_age_group_id: Id,

    pub absentee_threshold_days: i64,

    /// The club's offset from UTC, used to decide what "today" is.
    pub utc_offset_hours: i8,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            admin_levels: AdminLevels::default(),
            junior_age_group_id: get_optional_variable("BACKEND_JUNIOR_AGE_GROUP_ID", 2),
            absentee_threshold_days: get_optional_variable("BACKEND_ABSENTEE_THRESHOLD_DAYS", 14),
            utc_offset_hours: get_optional_variable("BACKEND_UTC_OFFSET_HOURS", 0),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            admin_levels: AdminLevels::default(),
            junior_age_group_id: 2,
            absentee_threshold_days: 14,
            utc_offset_hours: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only_admins_cannot_write() {
        let levels = AdminLevels::default();

        assert!(levels.can_read(Privilege::Read));
        assert!(!levels.can_write(Privilege::Read));
        assert!(levels.can_write(Privilege::ReadWrite));
        assert!(!levels.can_read(Privilege::No));
    }

    #[test]
    fn missing_optional_variables_use_the_default() {
        let days: i64 = get_optional_variable("BACKEND_TEST_SURELY_UNSET_VARIABLE", 14);

        assert_eq!(days, 14);
    }
}
