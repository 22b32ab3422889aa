//! Layered configuration shared by the Prism gateway crates.
//!
//! Values are merged by [`ortho_config`] from, in increasing precedence,
//! built-in defaults, an optional TOML file (`--config-path` or
//! `PRISM_CONFIG_PATH`), `PRISM_*` environment variables, and command-line
//! flags. The resolved [`Config`] tells the daemon where to find the provider
//! table, how many queue workers to run, how often to poll provider health,
//! and how to format structured logs.

mod defaults;
mod logging;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_LOG_FILTER, DEFAULT_PROVIDERS_PATH,
    DEFAULT_WORKER_COUNT, default_log_filter, default_log_filter_string, default_log_format,
    default_providers_path,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PRISM")]
pub struct Config {
    /// JSON file mapping target names to provider kinds and parameters.
    #[ortho_config(default = default_providers_path())]
    pub providers_path: Utf8PathBuf,
    /// Number of worker threads consuming the command queue.
    #[ortho_config(default = DEFAULT_WORKER_COUNT)]
    pub worker_count: usize,
    /// Optional bound on queued commands; unbounded when absent.
    pub queue_capacity: Option<usize>,
    /// Seconds between provider health polling cycles.
    #[ortho_config(default = DEFAULT_HEALTH_INTERVAL_SECS)]
    pub health_interval_secs: u64,
    /// `tracing-subscriber` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Encoding used for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers_path: default_providers_path(),
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: None,
            health_interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments, environment and files.
    ///
    /// # Errors
    ///
    /// Returns the aggregated [`OrthoError`] when any layer fails to parse.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration using an explicit argument list.
    ///
    /// The first element is treated as the program name, matching
    /// [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns the aggregated [`OrthoError`] when any layer fails to parse.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Path to the provider configuration file.
    #[must_use]
    pub fn providers_path(&self) -> &Utf8Path {
        self.providers_path.as_path()
    }

    /// Number of command-queue workers.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Optional queue bound.
    #[must_use]
    pub const fn queue_capacity(&self) -> Option<usize> {
        self.queue_capacity
    }

    /// Interval between health polling cycles.
    #[must_use]
    pub const fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs)
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
