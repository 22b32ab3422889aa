//! Structured health reporting for gateway lifecycle events.

use std::sync::Arc;

use prism_config::Config;
use prism_providers::RegistrationFailure;

use crate::bootstrap::BootstrapError;

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked for each provider that loaded.
    fn provider_ready(&self, target: &str);

    /// Invoked for each provider left out of the registry.
    fn provider_failed(&self, failure: &RegistrationFailure);

    /// Invoked once the gateway has released every provider.
    fn shutdown_completed(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn provider_ready(&self, target: &str) {
        (**self).provider_ready(target);
    }

    fn provider_failed(&self, failure: &RegistrationFailure) {
        (**self).provider_failed(failure);
    }

    fn shutdown_completed(&self) {
        (**self).shutdown_completed();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: "prismd::health",
            event = "bootstrap_starting",
            "starting gateway bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: "prismd::health",
            event = "bootstrap_succeeded",
            providers_path = %config.providers_path(),
            workers = config.worker_count(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "gateway bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: "prismd::health",
            event = "bootstrap_failed",
            error = %error,
            "gateway bootstrap failed"
        );
    }

    fn provider_ready(&self, target: &str) {
        tracing::info!(
            target: "prismd::health",
            event = "provider_ready",
            target_name = target,
            "provider ready"
        );
    }

    fn provider_failed(&self, failure: &RegistrationFailure) {
        tracing::error!(
            target: "prismd::health",
            event = "provider_failed",
            target_name = %failure.target,
            code = failure.error.code(),
            error_message = failure.error.message(),
            "provider failed to load"
        );
    }

    fn shutdown_completed(&self) {
        tracing::info!(
            target: "prismd::health",
            event = "shutdown_completed",
            "gateway shutdown completed"
        );
    }
}
