//! Schema registry interface
//!
//! Resolves logical node names to launchable executables with their
//! parameter schema, and interface names to their message definitions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::error::SchemaError;

/// Type of a node configuration parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Bool,
    Int,
    Float,
    Str,
    File,
}

impl FromStr for ParameterKind {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ParameterKind::Bool),
            "int" => Ok(ParameterKind::Int),
            "float" => Ok(ParameterKind::Float),
            "str" => Ok(ParameterKind::Str),
            "file" => Ok(ParameterKind::File),
            other => Err(SchemaError::Malformed(format!(
                "unknown parameter type '{}'",
                other
            ))),
        }
    }
}

/// One entry of a node's ordered parameter schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParameterKind,
    pub optional: bool,
    #[serde(default)]
    pub default: Option<JsonValue>,
}

impl ParameterSpec {
    /// A parameter the caller has to supply
    pub fn required(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: false,
            default: None,
        }
    }

    /// A parameter falling back to `default` when not supplied
    pub fn optional(name: impl Into<String>, kind: ParameterKind, default: JsonValue) -> Self {
        Self {
            name: name.into(),
            kind,
            optional: true,
            default: Some(default),
        }
    }
}

/// Launch information for a logical node name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub package: String,
    pub executable: String,
    pub parameters: Vec<ParameterSpec>,
}

/// How an interface is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Request/response
    Call,
    /// Fire-and-forget publish
    Stream,
}

impl FromStr for InterfaceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(InterfaceKind::Call),
            "stream" => Ok(InterfaceKind::Stream),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceKind::Call => write!(f, "call"),
            InterfaceKind::Stream => write!(f, "stream"),
        }
    }
}

/// Resolved interface information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    /// Raw kind string as stored in the registry ("call", "stream", ...)
    pub kind: String,
    /// Class of the message a caller has to supply
    pub message_class: String,
    /// Address of the interface inside the environment
    pub interface_name: String,
    /// Ordered definition entries; for calls the first entry is the service class
    pub definition: Vec<String>,
}

impl InterfaceDefinition {
    /// Parse the kind string; unsupported kinds are returned verbatim as error
    pub fn interface_kind(&self) -> Result<InterfaceKind, String> {
        self.kind.parse()
    }
}

/// Resolves node and interface names
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn node_definition(&self, name: &str) -> Result<NodeDefinition, SchemaError>;

    async fn interface_definition(&self, name: &str) -> Result<InterfaceDefinition, SchemaError>;
}
