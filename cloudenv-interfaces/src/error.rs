//! Error types reported by collaborators

use thiserror::Error;

/// Process supervisor failures
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to launch {package}/{executable}: {reason}")]
    LaunchFailed {
        package: String,
        executable: String,
        reason: String,
    },

    #[error("Unknown process: {0}")]
    UnknownProcess(String),

    #[error("Failed to terminate process {node_id}: {reason}")]
    TerminateFailed { node_id: String, reason: String },
}

/// Parameter registry failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Parameter already exists: {0}")]
    AlreadyExists(String),

    #[error("Parameter registry unavailable: {0}")]
    Unavailable(String),
}

/// Schema registry lookup failures
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    #[error("Malformed definition: {0}")]
    Malformed(String),
}

/// Message conversion failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    /// The payload or one of its attachments could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A value does not fit the message definition
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Interface invocation failures
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Interface {0} is not available")]
    Unavailable(String),

    #[error("Call to {interface} failed: {reason}")]
    Failed { interface: String, reason: String },
}
