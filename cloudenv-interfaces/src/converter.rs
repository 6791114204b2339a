//! Message converter interface

use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::error::ConvertError;

/// Binary attachments travelling next to a JSON payload, keyed by reference
pub type FileBundle = HashMap<String, Vec<u8>>;

/// A message in the environment's native representation
#[derive(Debug, Clone, PartialEq)]
pub struct NativeMessage {
    pub message_class: String,
    pub body: JsonValue,
}

impl NativeMessage {
    pub fn new(message_class: impl Into<String>, body: JsonValue) -> Self {
        Self {
            message_class: message_class.into(),
            body,
        }
    }
}

/// Wire form of a native message with binary values split out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedMessage {
    pub data: JsonValue,
    pub files: FileBundle,
}

/// Maps opaque wire payloads to native messages and back
pub trait Converter: Send + Sync {
    /// Build a native message of `message_class` from wire data and attachments
    fn decode(
        &self,
        message_class: &str,
        data: &JsonValue,
        files: &FileBundle,
    ) -> Result<NativeMessage, ConvertError>;

    /// Split a native message into wire data and binary attachments
    fn encode(&self, message: &NativeMessage) -> Result<EncodedMessage, ConvertError>;

    /// If `value` is an attachment reference, return the referenced key
    fn resolve_reference(&self, value: &JsonValue) -> Option<String>;
}
