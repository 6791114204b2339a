//! Error types for the environment manager

use cloudenv_interfaces::{RegistryError, SchemaError, SupervisorError};
use cloudenv_storage::StorageError;
use thiserror::Error;

pub type EnvironmentResult<T> = Result<T, EnvironmentError>;

/// Errors surfaced to callers of the environment manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    /// Caller-supplied data is malformed, missing or references an unknown id
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A backend or collaborator failed
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EnvironmentError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidRequest(message) | Self::InternalError(message) => message,
        }
    }
}

// Convert from storage errors
impl From<StorageError> for EnvironmentError {
    fn from(err: StorageError) -> Self {
        Self::InternalError(format!("State store failure: {}", err))
    }
}

impl From<std::io::Error> for EnvironmentError {
    fn from(err: std::io::Error) -> Self {
        Self::InternalError(format!("I/O failure: {}", err))
    }
}

impl From<SupervisorError> for EnvironmentError {
    fn from(err: SupervisorError) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<RegistryError> for EnvironmentError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyExists(_) => {
                Self::InternalError("Parameter already exists".to_string())
            }
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<SchemaError> for EnvironmentError {
    fn from(err: SchemaError) -> Self {
        Self::InternalError(err.to_string())
    }
}
