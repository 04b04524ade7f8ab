use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;
use warp::reject;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a submission that failed validation.
    #[error("invalid submission: {0}")]
    Validation(ValidationErrors),

    /// Represents a failure to read the catalog from its source.
    #[error("could not load tutorials")]
    DataSource { source: sqlx::Error },

    /// Represents a connectivity problem while talking to the store.
    #[error("could not reach the data store")]
    Network { source: sqlx::Error },

    /// Represents an operation on a record that does not exist.
    #[error("no such record: {0}")]
    NotFound(Uuid),

    /// Represents an ID that could not be parsed.
    #[error("invalid ID: {0}")]
    InvalidId(String),

    /// Represents a request for an admin-only action by someone else.
    #[error("forbidden")]
    Forbidden,

    /// Represents an approval whose catalog record was created but whose
    /// pending submission could not be deleted afterwards.
    #[error("tutorial {tutorial} was published but submission {submission} could not be removed")]
    PartialApproval {
        tutorial: Uuid,
        submission: Uuid,
        source: Box<BackendError>,
    },

    /// Represents a moderation decision on a submission that has already
    /// been decided.
    #[error("submission is already {0}")]
    InvalidTransition(&'static str),

    /// Represents any other SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents an error reading or writing local state.
    #[error("I/O error")]
    Io { source: std::io::Error },

    /// Represents local state that could not be (de)serialized.
    #[error("malformed JSON")]
    Json { source: serde_json::Error },
}

impl BackendError {
    /// The field-level messages, if this is a validation error.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            BackendError::Validation(errors) => Some(&errors.0),
            _ => None,
        }
    }
}

impl reject::Reject for BackendError {}

impl From<ValidationErrors> for BackendError {
    fn from(errors: ValidationErrors) -> Self {
        BackendError::Validation(errors)
    }
}

/// A validation message for one field of a submission.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every failing field of a submission, in form order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: &'static str) {
        self.0.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.0.iter().map(|e| e.field).collect()
    }

    /// `Ok(value)` if nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields().join(", ");

        write!(f, "{}", fields)
    }
}

/// Maps a SQL error from a catalog read: connectivity problems become
/// `Network`, everything else `DataSource`.
pub(crate) fn map_read_error(error: sqlx::Error) -> BackendError {
    if is_network_error(&error) {
        BackendError::Network { source: error }
    } else {
        BackendError::DataSource { source: error }
    }
}

/// Maps a SQL error from a mutation.
pub(crate) fn map_write_error(error: sqlx::Error) -> BackendError {
    if is_network_error(&error) {
        BackendError::Network { source: error }
    } else {
        BackendError::Sqlx { source: error }
    }
}

fn is_network_error(error: &sqlx::Error) -> bool {
    use sqlx::Error::*;

    matches!(error, Io(_) | Tls(_) | PoolTimedOut | PoolClosed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_list_fields() {
        let mut errors = ValidationErrors::default();
        errors.add("title", "Title must be at least 5 characters long.");
        errors.add("summary", "Summary must be at least 20 characters long.");

        let error = BackendError::from(errors.clone());

        assert_eq!(format!("{}", error), "invalid submission: title, summary");
        assert_eq!(error.field_errors().map(|e| e.len()), Some(2));
        assert_eq!(errors.into_result(()), Err(ValidationErrors(vec![
            FieldError { field: "title", message: "Title must be at least 5 characters long." },
            FieldError { field: "summary", message: "Summary must be at least 20 characters long." },
        ])));
    }

    #[test]
    fn pool_timeouts_are_network_errors() {
        assert!(matches!(map_read_error(sqlx::Error::PoolTimedOut), BackendError::Network { .. }));
        assert!(matches!(map_read_error(sqlx::Error::RowNotFound), BackendError::DataSource { .. }));
        assert!(matches!(map_write_error(sqlx::Error::RowNotFound), BackendError::Sqlx { .. }));
    }
}
