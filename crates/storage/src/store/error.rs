#![forbid(unsafe_code)]

use pm_core::dates::DateParseError;
use pm_core::ids::CodePrefixError;
use pm_core::model::ParseEnumError;
use pm_core::schedule::ScheduleViolation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for failures caused by the store itself rather than by the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Sql(_))
    }
}

impl From<ScheduleViolation> for StoreError {
    fn from(value: ScheduleViolation) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<CodePrefixError> for StoreError {
    fn from(value: CodePrefixError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<ParseEnumError> for StoreError {
    fn from(value: ParseEnumError) -> Self {
        Self::Validation(value.to_string())
    }
}

impl From<DateParseError> for StoreError {
    fn from(value: DateParseError) -> Self {
        Self::Validation(value.to_string())
    }
}

pub(in crate::store) fn map_constraint_conflict(err: rusqlite::Error, message: &str) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::Conflict(message.to_string());
    }
    StoreError::Sql(err)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}
