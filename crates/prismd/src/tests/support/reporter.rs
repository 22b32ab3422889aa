//! Test double for [`HealthReporter`] that records structured events for assertions.
//!
//! The recorder captures the lifecycle telemetry emitted during bootstrap,
//! provider loading and shutdown so tests can validate observable events.

use std::sync::Mutex;

use prism_config::Config;
use prism_providers::RegistrationFailure;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// A provider loaded for the target.
    ProviderReady(String),
    /// A provider failed to load.
    ProviderFailed { target: String, message: String },
    /// Shutdown finished.
    ShutdownCompleted,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn provider_ready(&self, target: &str) {
        self.record(HealthEvent::ProviderReady(target.to_owned()));
    }

    fn provider_failed(&self, failure: &RegistrationFailure) {
        self.record(HealthEvent::ProviderFailed {
            target: failure.target.clone(),
            message: failure.error.message().to_owned(),
        });
    }

    fn shutdown_completed(&self) {
        self.record(HealthEvent::ShutdownCompleted);
    }
}
