//! Domain-driven configuration management for the cloud environment manager
//!
//! Configuration is split by functional domain (environment lifecycle,
//! database, logging), with validation, defaults, and environment variable
//! overrides.

pub mod error;
pub mod loader;
pub mod validation;

pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

pub use domains::{
    database::DatabaseConfig,
    environment::{EnvironmentConfig, MAX_TIMEOUT},
    logging::{LogFormat, LogLevel, LoggingConfig},
    CloudEnvConfig,
};

pub use domains::utils::{serde_duration, serde_duration_millis};
