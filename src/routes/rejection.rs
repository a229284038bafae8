use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    AddClass { class_name: String },
    AddDependent { first_name: String },
    AddMembership { name: String },
    AgeGroups,
    CheckIn {
        class_id: Option<String>,
        dependent_id: Option<String>,
    },
    Classes,
    Login { email: String },
    Logout,
    Memberships,
    Register { email: String },
    Report { report: String },
    User { id: String },
    Users,
}

impl Context {
    pub fn add_class(class_name: String) -> Context {
        Context::AddClass { class_name }
    }

    pub fn add_dependent(first_name: String) -> Context {
        Context::AddDependent { first_name }
    }

    pub fn add_membership(name: String) -> Context {
        Context::AddMembership { name }
    }

    pub fn age_groups() -> Context {
        Context::AgeGroups
    }

    pub fn check_in(class_id: Option<String>, dependent_id: Option<String>) -> Context {
        Context::CheckIn {
            class_id,
            dependent_id,
        }
    }

    pub fn classes() -> Context {
        Context::Classes
    }

    pub fn login(email: String) -> Context {
        Context::Login { email }
    }

    pub fn logout() -> Context {
        Context::Logout
    }

    pub fn memberships() -> Context {
        Context::Memberships
    }

    pub fn register(email: String) -> Context {
        Context::Register { email }
    }

    pub fn report(report: String) -> Context {
        Context::Report { report }
    }

    pub fn user(id: String) -> Context {
        Context::User { id }
    }

    pub fn users() -> Context {
        Context::Users
    }
}
