use serde::Serialize;
use uuid::Uuid;

use crate::account::{Account, Membership};
use crate::class::Class;
use crate::label::{Id, Label};
use crate::view::DailyView;

/// A class with how many times the caller's household attended it.
#[derive(Debug, Serialize)]
pub struct ClassSummary {
    #[serde(flatten)]
    pub class: Class,
    pub attendance: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Accounts {
        accounts: Vec<Account>,
    },
    AgeGroups {
        age_groups: Vec<Label>,
    },
    CheckIn {
        #[serde(flatten)]
        view: DailyView,
        messages: Vec<String>,
    },
    Classes {
        classes: Vec<ClassSummary>,
    },
    Coach {
        id: Id,
        is_coach: bool,
    },
    Created {
        id: Id,
    },
    Healthz {
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Memberships {
        memberships: Vec<Membership>,
    },
    NoClasses {
        date: String,
        messages: Vec<String>,
    },
    Session {
        token: Uuid,
        account_id: Id,
    },
}
