use serde::{Deserialize, Serialize};

/// A label for a choice, such as an age group. The meaning is derived
/// from the database at runtime.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Label(pub Id, pub String);

impl Label {
    pub fn new(id: Id, label: impl Into<String>) -> Self {
        Label(id, label.into())
    }

    pub fn id(&self) -> Id {
        self.0
    }

    pub fn name(&self) -> &str {
        &self.1
    }
}

/// An ID in the database.
pub type Id = i32;
