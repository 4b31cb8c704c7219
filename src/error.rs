//! Error handling for the Rocal admin dashboard

use std::fmt;
use thiserror::Error;

use rocal_postgrest::PostgrestError;

/// Failure reported by the record store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// No row matched the identifier
    #[error("No record with id {id} in {table}")]
    NotFound { table: &'static str, id: String },

    /// The server rejected the request
    #[error("{message}")]
    Api { status: Option<u16>, message: String },

    /// The request never got an answer
    #[error("Network error: {0}")]
    Transport(String),

    /// The answer could not be understood
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn not_found<T: fmt::Display>(table: &'static str, id: T) -> Self {
        StoreError::NotFound {
            table,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<PostgrestError> for StoreError {
    fn from(err: PostgrestError) -> Self {
        match &err {
            PostgrestError::ApiError { .. } | PostgrestError::UnparsedApiError { .. } => {
                StoreError::Api {
                    status: err.status().map(|s| s.as_u16()),
                    message: err.message(),
                }
            }
            PostgrestError::NetworkError(_) => StoreError::Transport(err.to_string()),
            PostgrestError::DeserializationError(msg) => StoreError::Decode(msg.clone()),
            _ => StoreError::Decode(err.to_string()),
        }
    }
}

/// Unified error type for the dashboard core
#[derive(Error, Debug)]
pub enum Error {
    /// A mutation was attempted without a signed-in user
    #[error("not authenticated")]
    AuthRequired,

    /// Record store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Form input that cannot be submitted
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A form edit named a field the record kind does not have
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a new validation error
    pub fn validation<T: fmt::Display>(field: &'static str, reason: T) -> Self {
        Error::Validation {
            field,
            reason: reason.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgrest_api_error_keeps_server_message() {
        let err = PostgrestError::UnparsedApiError {
            message: "duplicate key value".to_string(),
            status: reqwest::StatusCode::CONFLICT,
        };
        assert_eq!(
            StoreError::from(err),
            StoreError::Api {
                status: Some(409),
                message: "duplicate key value".to_string()
            }
        );
    }

    #[test]
    fn validation_message_names_field() {
        let err = Error::validation("cost", "must be a number");
        assert_eq!(err.to_string(), "cost: must be a number");
        assert_eq!(Error::AuthRequired.to_string(), "not authenticated");
    }
}
