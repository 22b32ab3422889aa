//! Structured logging for the gateway.
//!
//! Events are written to standard error, either as one flattened JSON object
//! per line or in the compact human format. Flattening puts event fields next
//! to the event `message`, so no gateway event records a field of that name;
//! error text goes in `error_message`.
//!
//! The global subscriber is installed at most once per process. The format
//! in effect is the one from the first successful [`initialise`] call.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::EnvFilter;

use prism_config::{Config, LogFormat};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Handle describing the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Encoding of the events written by the gateway.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The configured filter expression does not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// Expression as configured.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// Another subscriber was installed outside this module.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the gateway subscriber unless one was already installed here.
///
/// A failed call leaves nothing installed, so a corrected configuration can
/// be applied by calling again.
///
/// # Examples
///
/// ```rust
/// use prism_config::Config;
/// use prismd::telemetry;
///
/// # fn main() -> Result<(), prismd::telemetry::TelemetryError> {
/// let first = telemetry::initialise(&Config::default())?;
/// let second = telemetry::initialise(&Config::default())?;
/// assert_eq!(first.format(), second.format());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter expression
/// and [`TelemetryError::Subscriber`] when a foreign global subscriber is
/// already in place.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| {
            let subscriber = subscriber(config, io::stderr, io::stderr().is_terminal())?;
            tracing::subscriber::set_global_default(subscriber)
                .map_err(TelemetryError::Subscriber)?;
            Ok(config.log_format())
        })
        .map(|&format| TelemetryHandle { format })
}

/// Builds the gateway subscriber writing to `writer`.
///
/// Colour is only used by the compact format, and only when `ansi` is set.
pub(crate) fn subscriber<W>(
    config: &Config,
    writer: W,
    ansi: bool,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
        filter: config.log_filter().to_owned(),
        reason: error.to_string(),
    })?;

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    Ok(match config.log_format() {
        LogFormat::Json => Box::new(builder.with_ansi(false).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.with_ansi(ansi).compact().finish()),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::Value;
    use tracing::warn;

    use super::*;
    use crate::tests::support::CapturedLog;

    fn config(log_filter: &str, log_format: LogFormat) -> Config {
        Config {
            log_filter: log_filter.to_owned(),
            log_format,
            ..Config::default()
        }
    }

    #[test]
    fn invalid_filter_names_the_expression() {
        let error = subscriber(&config("prismd=loud", LogFormat::Json), io::sink, false)
            .err()
            .expect("filter rejected");
        assert!(matches!(
            &error,
            TelemetryError::Filter { filter, .. } if filter == "prismd=loud"
        ));
        assert!(error.to_string().starts_with("invalid log filter 'prismd=loud'"));
    }

    #[test]
    fn json_events_are_flattened_objects() {
        let log = CapturedLog::default();
        let subscriber =
            subscriber(&config("info", LogFormat::Json), log.clone(), true).expect("subscriber");

        tracing::subscriber::with_default(subscriber, || {
            warn!(target: "prismd::queue", workers = 2, "command queue started");
        });

        let events = log.events();
        let [event] = events.as_slice() else {
            panic!("expected one event, got {events:?}");
        };
        assert_eq!(event["message"], Value::from("command queue started"));
        assert_eq!(event["target"], Value::from("prismd::queue"));
        assert_eq!(event["workers"], Value::from(2));
        assert!(event.get("timestamp").is_some());
    }

    #[rstest]
    #[case::json(LogFormat::Json)]
    #[case::compact(LogFormat::Compact)]
    fn filter_drops_quieter_events(#[case] format: LogFormat) {
        let log = CapturedLog::default();
        let subscriber = subscriber(&config("warn", format), log.clone(), false).expect("subscriber");

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "prismd::monitor", "health cycle completed");
        });

        assert!(log.text().is_empty());
    }

    #[test]
    fn handles_report_the_installed_format() {
        let first = initialise(&Config::default()).expect("first initialise");
        let second = initialise(&config("debug", LogFormat::Compact)).expect("second initialise");
        assert_eq!(first, second);
    }
}
