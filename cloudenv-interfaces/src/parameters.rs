//! Namespaced parameter registry interface

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

use crate::error::RegistryError;

/// A typed configuration value handed to a node process
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    File(PathBuf),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Str(v) => write!(f, "{}", v),
            ParameterValue::File(v) => write!(f, "{}", v.display()),
        }
    }
}

/// Build the registry key of a node parameter: `<node_id>/<parameter>`
pub fn parameter_key(node_id: &str, parameter: &str) -> String {
    format!("{}/{}", node_id, parameter)
}

/// Key/value store used to pass configuration into provisioned processes
#[async_trait]
pub trait ParameterRegistry: Send + Sync {
    /// Register a key that must not exist yet.
    ///
    /// Implementations perform the existence check and the insert as one
    /// atomic step and return [`RegistryError::AlreadyExists`] on collision.
    async fn insert_new(&self, key: &str, value: ParameterValue) -> Result<(), RegistryError>;

    /// Remove a single key; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), RegistryError>;

    /// Remove every key below `namespace/`
    async fn remove_namespace(&self, namespace: &str) -> Result<(), RegistryError>;
}
