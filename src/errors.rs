use sqlx;
use thiserror::Error;

use crate::label::Id;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("Database error")]
    Sqlx { source: sqlx::Error },

    #[error("Unable to write CSV")]
    Csv { source: csv::Error },

    #[error("Unable to hash password: {0}")]
    PasswordHash(String),

    /// The request was missing a session or carried one that does not
    /// exist.
    #[error("Please log in to access that page.")]
    Unauthenticated,

    /// The email and password did not match an account.
    #[error("Incorrect email or password.")]
    InvalidCredentials,

    /// The existing password given with a password change was wrong.
    #[error("Existing password incorrect.")]
    IncorrectPassword,

    /// The account lacks the admin level the action requires.
    #[error("You do not have sufficient privileges to access that page.")]
    Forbidden,

    #[error("User {0} is already registered.")]
    EmailAlreadyExists(String),

    #[error("No account exists with ID {0}")]
    NonExistentAccount(Id),

    /// A row referred to a membership that could not be loaded.
    #[error("Unknown membership {0}")]
    UnknownMembership(Id),

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid class type. Class type must be either Gi or No Gi")]
    InvalidClassType(String),

    #[error("Invalid admin level: {0}")]
    InvalidAdminLevel(String),

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("The start date {start} is after the end date {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("Sessions per week must not be negative: {0}")]
    InvalidSessionLimit(i32),

    #[error("Your passwords did not match. Please try again.")]
    PasswordMismatch,

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}
