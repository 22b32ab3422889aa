use camino::Utf8PathBuf;

use crate::logging::LogFormat;

/// Provider configuration file consulted when none is configured.
pub const DEFAULT_PROVIDERS_PATH: &str = "providers.json";

/// Number of command-queue workers started by default.
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// Seconds between two health polling cycles.
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 60;

/// Default log filter expression used by the gateway.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the gateway.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the gateway.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default location of the provider configuration file.
pub fn default_providers_path() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PROVIDERS_PATH)
}
