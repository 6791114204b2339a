//! IPC error types

use thiserror::Error;

/// IPC error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpcError {
    /// Buffer ended before a complete element was read
    #[error("Truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Element bytes were not valid UTF-8
    #[error("Invalid UTF-8 element: {0}")]
    InvalidUtf8(String),

    /// Element does not fit the u32 length prefix
    #[error("Element too large: {0} bytes")]
    ElementTooLarge(usize),

    /// Unknown component type code
    #[error("Unknown component type: {0:#04x}")]
    UnknownComponent(u8),

    /// Component type is known but not the one expected here
    #[error("Unexpected component type: expected {expected:#04x}, got {actual:#04x}")]
    UnexpectedComponent { expected: u8, actual: u8 },
}

impl IpcError {
    /// Check if more input could make the decode succeed
    pub fn is_incomplete(&self) -> bool {
        matches!(self, IpcError::Truncated { .. })
    }

    /// Check if this error indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        !self.is_incomplete()
    }
}

impl From<std::string::FromUtf8Error> for IpcError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        IpcError::InvalidUtf8(err.to_string())
    }
}
