//! Client error types.

use repokit_core::RepositoryError;
use thiserror::Error;

/// Result type alias for client module.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur while talking to the API.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{message} (status {status})")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for RepositoryError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::ServerError { status, message } => {
                RepositoryError::Transport { status, message }
            }
            ClientError::Request(err) => RepositoryError::Connection(err.to_string()),
            ClientError::Connection(message) => RepositoryError::Connection(message),
            ClientError::InvalidResponse(message) => RepositoryError::Serialization(message),
            ClientError::Json(err) => RepositoryError::Serialization(err.to_string()),
            ClientError::InvalidInput(message) => RepositoryError::InvalidInput(message),
            ClientError::InvalidUrl(err) => RepositoryError::InvalidInput(err.to_string()),
            ClientError::Io(err) => RepositoryError::InvalidInput(err.to_string()),
        }
    }
}

impl ClientError {
    /// Converts into a [`RepositoryError`] whose message is prefixed with
    /// `context`, which names the entity and the attempted operation.
    ///
    /// Server errors already carry their context from
    /// [`crate::transport::check_status`] and pass through unchanged.
    pub fn into_repository_error(self, context: &str) -> RepositoryError {
        match RepositoryError::from(self) {
            RepositoryError::Connection(message) => {
                RepositoryError::Connection(format!("{}: {}", context, message))
            }
            RepositoryError::Serialization(message) => {
                RepositoryError::Serialization(format!("{}: {}", context, message))
            }
            RepositoryError::InvalidInput(message) => {
                RepositoryError::InvalidInput(format!("{}: {}", context, message))
            }
            other => other,
        }
    }
}
