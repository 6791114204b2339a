//! Structured logging infrastructure
//!
//! Thin initialisation layer over `tracing-subscriber`, driven by the
//! logging domain of the configuration.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
