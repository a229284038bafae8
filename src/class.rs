use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use time::{Duration, Time};

use crate::dates::{self, hour_minute_time};
use crate::errors::BackendError;
use crate::label::Id;
use crate::normalization;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassType {
    Gi,
    NoGi,
}

impl ClassType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::Gi => "Gi",
            ClassType::NoGi => "No Gi",
        }
    }
}

impl Default for ClassType {
    fn default() -> Self {
        ClassType::NoGi
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassType {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Gi" => Ok(ClassType::Gi),
            "No Gi" => Ok(ClassType::NoGi),
            other => Err(BackendError::InvalidClassType(other.to_owned())),
        }
    }
}

impl Serialize for ClassType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A weekly class on the timetable. An occurrence on a given date is
/// implied by the weekday.
#[derive(Clone, Debug, Serialize)]
pub struct Class {
    pub id: Id,
    pub name: String,
    pub class_type: ClassType,

    /// Monday is 0.
    #[serde(serialize_with = "serialize_weekday")]
    pub weekday: i16,

    #[serde(serialize_with = "hour_minute_time::serialize")]
    pub start_time: Time,

    pub duration_minutes: i32,

    /// Only attendees resolved to this age group may check in.
    pub age_group_id: Id,

    pub coach_id: Option<Id>,
}

impl Class {
    pub fn end_time(&self) -> Time {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn weekday_name(&self) -> &'static str {
        dates::weekday_name(self.weekday)
    }
}

fn serialize_weekday<S: Serializer>(weekday: &i16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(dates::weekday_name(*weekday))
}

/// The form submitted by an admin to add a class.
#[derive(Clone, Debug, Deserialize)]
pub struct ClassSubmission {
    #[serde(deserialize_with = "normalization::deserialize")]
    pub class_name: String,

    #[serde(default)]
    pub class_type: Option<String>,

    pub class_day: String,
    pub class_time: String,

    /// Defaults to an hour.
    #[serde(default)]
    pub class_duration: Option<i32>,

    pub age_group_id: Id,

    #[serde(default)]
    pub class_coach: Option<Id>,
}

/// A validated class ready to be written to the database.
#[derive(Clone, Debug)]
pub struct NewClass {
    pub name: String,
    pub class_type: ClassType,
    pub weekday: i16,
    pub start_time: Time,
    pub duration_minutes: i32,
    pub age_group_id: Id,
    pub coach_id: Option<Id>,
}

const DEFAULT_DURATION_MINUTES: i32 = 60;

impl ClassSubmission {
    pub fn validate(self) -> Result<NewClass, BackendError> {
        if self.class_name.is_empty() {
            return Err(BackendError::MissingField("class_name"));
        }

        let class_type = match self.class_type {
            Some(raw) => raw.parse()?,
            None => ClassType::default(),
        };

        let duration_minutes = self.class_duration.unwrap_or(DEFAULT_DURATION_MINUTES);

        if duration_minutes <= 0 {
            return Err(BackendError::InvalidTime(format!(
                "{} minutes",
                duration_minutes
            )));
        }

        Ok(NewClass {
            name: self.class_name,
            class_type,
            weekday: dates::parse_weekday(&self.class_day)?,
            start_time: dates::parse_time(&self.class_time)?,
            duration_minutes,
            age_group_id: self.age_group_id,
            coach_id: self.class_coach,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::hm;

    fn submission() -> ClassSubmission {
        ClassSubmission {
            class_name: "Fundamentals".to_owned(),
            class_type: None,
            class_day: "Wednesday".to_owned(),
            class_time: "18:30".to_owned(),
            class_duration: None,
            age_group_id: 1,
            class_coach: Some(3),
        }
    }

    #[test]
    fn submissions_default_to_an_hour_of_no_gi() {
        let class = submission().validate().unwrap();

        assert_eq!(class.class_type, ClassType::NoGi);
        assert_eq!(class.weekday, 2);
        assert_eq!(class.start_time, hm(18, 30));
        assert_eq!(class.duration_minutes, 60);
    }

    #[test]
    fn class_type_must_be_gi_or_no_gi() {
        let mut s = submission();
        s.class_type = Some("Judo".to_owned());

        assert!(matches!(s.validate(), Err(BackendError::InvalidClassType(_))));
    }

    #[test]
    fn end_time_adds_the_duration() {
        let class = Class {
            id: 1,
            name: "Open Mat".to_owned(),
            class_type: ClassType::Gi,
            weekday: 5,
            start_time: hm(10, 0),
            duration_minutes: 90,
            age_group_id: 1,
            coach_id: None,
        };

        assert_eq!(class.end_time(), hm(11, 30));
        assert_eq!(class.weekday_name(), "Saturday");
    }
}
