//! Coercion of caller-supplied parameter values

use cloudenv_interfaces::{ParameterKind, ParameterValue};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

use crate::error::{EnvironmentError, EnvironmentResult};

fn invalid(name: &str, kind: &str) -> EnvironmentError {
    EnvironmentError::invalid_request(format!(
        "Configuration parameter {} is not a valid {}",
        name, kind
    ))
}

/// Coerce a scalar value to the declared parameter kind
///
/// File parameters are resolved to a path by the caller and go through
/// [`coerce_file`] instead.
pub(super) fn coerce_value(
    name: &str,
    kind: ParameterKind,
    value: &JsonValue,
) -> EnvironmentResult<ParameterValue> {
    match kind {
        ParameterKind::Bool => match value {
            JsonValue::Bool(b) => Ok(ParameterValue::Bool(*b)),
            JsonValue::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(ParameterValue::Bool(true)),
                "false" => Ok(ParameterValue::Bool(false)),
                _ => Err(invalid(name, "bool")),
            },
            _ => Err(invalid(name, "bool")),
        },
        ParameterKind::Int => match value {
            JsonValue::Number(n) => n
                .as_i64()
                .map(ParameterValue::Int)
                .ok_or_else(|| invalid(name, "int")),
            JsonValue::String(s) => s
                .trim()
                .parse()
                .map(ParameterValue::Int)
                .map_err(|_| invalid(name, "int")),
            _ => Err(invalid(name, "int")),
        },
        ParameterKind::Float => match value {
            JsonValue::Number(n) => n
                .as_f64()
                .map(ParameterValue::Float)
                .ok_or_else(|| invalid(name, "float")),
            JsonValue::String(s) => s
                .trim()
                .parse()
                .map(ParameterValue::Float)
                .map_err(|_| invalid(name, "float")),
            _ => Err(invalid(name, "float")),
        },
        ParameterKind::Str => match value {
            JsonValue::String(s) => Ok(ParameterValue::Str(s.clone())),
            other => Ok(ParameterValue::Str(other.to_string())),
        },
        ParameterKind::File => match value {
            JsonValue::String(path) => coerce_file(name, Path::new(path)),
            _ => Err(invalid(name, "file")),
        },
    }
}

/// A file parameter must point at an existing file
pub(super) fn coerce_file(name: &str, path: &Path) -> EnvironmentResult<ParameterValue> {
    if !path.is_file() {
        return Err(EnvironmentError::internal(format!(
            "Could not find file for configuration parameter {}",
            name
        )));
    }
    Ok(ParameterValue::File(PathBuf::from(path)))
}

/// Bytes to store for a file parameter supplied inline
pub(super) fn inline_content(value: &JsonValue) -> Vec<u8> {
    match value {
        JsonValue::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}
