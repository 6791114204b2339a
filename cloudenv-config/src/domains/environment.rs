//! Environment lifecycle configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};

/// Longest accepted inactivity timeout (one year)
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Lifecycle settings for one managed environment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Inactivity window after which tasks are aged out and the
    /// environment reports itself idle
    #[serde(with = "crate::domains::utils::serde_duration", default = "default_timeout")]
    pub timeout: Duration,

    /// Polling interval of the garbage collection loop
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_gc_poll_interval"
    )]
    pub gc_poll_interval: Duration,

    /// Directory receiving files attached to task results
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Directory receiving temporary files for `file` parameters
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            gc_poll_interval: default_gc_poll_interval(),
            results_dir: default_results_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

impl EnvironmentConfig {
    /// Number of poll ticks between two age-out passes (a quarter of the timeout)
    pub fn age_out_ticks(&self) -> u64 {
        let quarter = self.timeout.as_millis() / 4;
        let interval = self.gc_poll_interval.as_millis().max(1);
        ((quarter / interval) as u64).max(1)
    }
}

impl Validatable for EnvironmentConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.timeout.as_secs(), "timeout", self.domain_name())?;
        if self.timeout > MAX_TIMEOUT {
            return Err(self.validation_error(format!(
                "timeout must not exceed {} seconds",
                MAX_TIMEOUT.as_secs()
            )));
        }
        validate_positive(
            self.gc_poll_interval.as_millis(),
            "gc_poll_interval",
            self.domain_name(),
        )?;

        if self.gc_poll_interval > self.timeout {
            return Err(self.validation_error("gc_poll_interval must not exceed timeout"));
        }

        if self.results_dir.as_os_str().is_empty() {
            return Err(self.validation_error("results_dir cannot be empty"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "environment"
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(600) // 10 minutes
}

fn default_gc_poll_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_results_dir() -> PathBuf {
    std::env::temp_dir().join("cloudenv-results")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}
