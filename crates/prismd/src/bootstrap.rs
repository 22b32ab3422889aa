//! Gateway bootstrap orchestration.
//!
//! [`bootstrap_with`] turns configuration into a ready [`Gateway`]: it loads
//! the configuration, installs telemetry, reads the provider table, builds
//! every provider through the supplied catalogue and wires the dispatcher.
//! Only the steps in this module are fatal. A provider that fails to load is
//! reported and left out, and the gateway starts without it.

use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;
use tracing::warn;

use prism_config::Config;
use prism_providers::{
    CleanupFailure, ProviderCatalog, ProviderRegistry, RegistryConfig, RegistryConfigError,
};

use crate::dispatch::{Dispatcher, LoggingMiddleware, SchemaError, SchemaRegistry};
use crate::health::HealthReporter;
use crate::monitor::{HealthMonitor, HealthStatus, MonitorError};
use crate::queue::{
    CommandQueue, LoggingResponseHandler, QUEUE_TARGET, QueueError, QueueSettings,
    ResponseHandler,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`OrthoError`] when any layer fails to parse.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced while bringing the gateway up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The provider table could not be read or parsed.
    #[error("failed to load provider configuration: {source}")]
    Providers {
        /// Underlying provider table error.
        #[source]
        source: RegistryConfigError,
    },
    /// A command schema failed to compile.
    #[error("failed to compile command schemas: {source}")]
    Schemas {
        /// Underlying schema error.
        #[source]
        source: SchemaError,
    },
    /// The command queue could not be started.
    #[error("failed to start command queue: {source}")]
    Queue {
        /// Underlying queue error.
        #[source]
        source: QueueError,
    },
    /// The health monitor could not be started.
    #[error("failed to start health monitor: {source}")]
    Monitor {
        /// Underlying monitor error.
        #[source]
        source: MonitorError,
    },
}

/// Bootstrapped gateway whose queue and monitor are not yet running.
pub struct Gateway {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Gateway {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Dispatcher shared with the queue workers once started.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Starts the queue, logging every outcome, and the health monitor.
    ///
    /// # Errors
    ///
    /// As for [`Gateway::start_with_handler`].
    pub fn start(self) -> Result<RunningGateway, BootstrapError> {
        self.start_with_handler(Arc::new(LoggingResponseHandler))
    }

    /// Starts the queue, delivering outcomes to `handler`, and the health
    /// monitor.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Queue`] or [`BootstrapError::Monitor`] when
    /// a background thread cannot be started. Anything already running is
    /// stopped and every provider is torn down before returning.
    pub fn start_with_handler(
        self,
        handler: Arc<dyn ResponseHandler>,
    ) -> Result<RunningGateway, BootstrapError> {
        let Self {
            config,
            dispatcher,
            reporter,
            ..
        } = self;

        let give_up = |error| abandon(&dispatcher, reporter.as_ref(), error);

        let queue = CommandQueue::with_handler(
            Arc::clone(&dispatcher),
            QueueSettings::from_config(&config),
            handler,
        )
        .map_err(|source| give_up(BootstrapError::Queue { source }))?;
        queue
            .start()
            .map_err(|source| give_up(BootstrapError::Queue { source }))?;

        let monitor = HealthMonitor::new(config.health_interval());
        if let Err(source) = monitor.start(dispatcher.registry()) {
            if let Err(error) = queue.stop() {
                warn!(target: QUEUE_TARGET, %error, "command queue stopped uncleanly");
            }
            return Err(give_up(BootstrapError::Monitor { source }));
        }

        Ok(RunningGateway {
            dispatcher,
            queue,
            monitor,
            reporter,
        })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Gateway with its worker pool and health monitor running.
pub struct RunningGateway {
    dispatcher: Arc<Dispatcher>,
    queue: CommandQueue,
    monitor: HealthMonitor,
    reporter: Arc<dyn HealthReporter>,
}

impl RunningGateway {
    /// Queues a raw command for asynchronous routing.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] when a bounded queue has no free slot.
    pub fn enqueue(&self, payload: impl Into<String>) -> Result<(), QueueError> {
        self.queue.enqueue(payload)
    }

    /// Latest health observation for every provider.
    #[must_use]
    pub fn health(&self) -> Vec<HealthStatus> {
        self.monitor.statuses()
    }

    /// Dispatcher used by the workers, for synchronous routing.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Number of commands routed by the workers so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.queue.processed()
    }

    /// Stops the gateway: drains and joins the queue, stops the monitor,
    /// then tears every provider down.
    ///
    /// Every step runs even when an earlier one fails.
    #[must_use = "the report carries thread and cleanup failures"]
    pub fn shutdown(self) -> ShutdownReport {
        let queue = self.queue.stop();
        let monitor = self.monitor.stop();
        let cleanup_failures = self.dispatcher.cleanup_all();
        let report = ShutdownReport {
            processed: self.queue.processed(),
            queue,
            monitor,
            cleanup_failures,
        };
        self.reporter.shutdown_completed();
        report
    }
}

impl std::fmt::Debug for RunningGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningGateway")
            .field("queue", &self.queue)
            .field("monitor", &self.monitor)
            .finish_non_exhaustive()
    }
}

/// Outcome of [`RunningGateway::shutdown`].
#[derive(Debug)]
pub struct ShutdownReport {
    /// Commands routed before the queue stopped.
    pub processed: usize,
    /// Result of stopping the worker pool.
    pub queue: Result<(), QueueError>,
    /// Result of stopping the health monitor.
    pub monitor: Result<(), MonitorError>,
    /// Providers whose teardown failed.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl ShutdownReport {
    /// Returns `true` when every background thread exited without panicking.
    ///
    /// Provider teardown failures are logged and do not count.
    #[must_use]
    pub const fn threads_exited_cleanly(&self) -> bool {
        self.queue.is_ok() && self.monitor.is_ok()
    }
}

/// Bootstraps the gateway using the supplied collaborators.
///
/// # Errors
///
/// Returns a [`BootstrapError`] when configuration, telemetry or the
/// provider table cannot be loaded. Each failure is also passed to
/// [`HealthReporter::bootstrap_failed`].
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    catalog: &ProviderCatalog,
) -> Result<Gateway, BootstrapError> {
    reporter.bootstrap_starting();

    let config = loader
        .load()
        .map_err(|source| fail(reporter.as_ref(), BootstrapError::Configuration { source }))?;

    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(reporter.as_ref(), BootstrapError::Telemetry { source }))?;

    let table = RegistryConfig::from_path(config.providers_path())
        .map_err(|source| fail(reporter.as_ref(), BootstrapError::Providers { source }))?;

    let registry = ProviderRegistry::load(catalog, &table);
    for target in registry.targets() {
        reporter.provider_ready(target);
    }
    for failure in registry.failures() {
        reporter.provider_failed(failure);
    }

    let schemas = SchemaRegistry::builtin()
        .map_err(|source| fail(reporter.as_ref(), BootstrapError::Schemas { source }))?;
    let mut dispatcher = Dispatcher::new(registry, schemas);
    dispatcher.add_middleware(LoggingMiddleware::new());

    reporter.bootstrap_succeeded(&config);
    Ok(Gateway {
        config,
        dispatcher: Arc::new(dispatcher),
        telemetry,
        reporter,
    })
}

fn fail(reporter: &dyn HealthReporter, error: BootstrapError) -> BootstrapError {
    reporter.bootstrap_failed(&error);
    error
}

/// Tears the providers down after a failed start, then reports `error`.
fn abandon(
    dispatcher: &Dispatcher,
    reporter: &dyn HealthReporter,
    error: BootstrapError,
) -> BootstrapError {
    for failure in dispatcher.cleanup_all() {
        warn!(
            target: BOOTSTRAP_TARGET,
            target_name = %failure.target,
            error_message = failure.error.message(),
            "provider cleanup failed"
        );
    }
    fail(reporter, error)
}
