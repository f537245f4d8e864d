use thiserror::Error;

/// Errors that can occur during repository operations.
///
/// The type is `Clone` because a single failure may be observed by every
/// caller that joined the same in-flight request through the cache.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: String, id: String },
    #[error("{message} (status {status})")]
    Transport { status: u16, message: String },
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Repository group constructor: {0}")]
    Construction(String),
    #[error("Unsupported operation: {operation} on {entity}")]
    UnsupportedOperation {
        entity: String,
        operation: &'static str,
    },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Blob storage error: {0}")]
    Blob(String),
}

impl RepositoryError {
    /// Builds a [`RepositoryError::NotFound`] for an entity/id pair.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Builds a [`RepositoryError::UnsupportedOperation`].
    pub fn unsupported(entity: impl Into<String>, operation: &'static str) -> Self {
        Self::UnsupportedOperation {
            entity: entity.into(),
            operation,
        }
    }

    /// Returns true for [`RepositoryError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Boxed error returned by I/O provider constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
