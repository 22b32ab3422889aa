//! Command-dispatch daemon for the Prism gateway.
//!
//! The daemon accepts JSON commands addressed to named targets, validates
//! them against per-command schemas, passes them through a middleware chain
//! and routes each one to the capability provider registered for its target.
//! Every failure leaves the [`Dispatcher`] as a coded
//! [`CommandError`](prism_providers::CommandError), so callers always receive
//! either the provider's result or an `{"error": {"code", "message"}}`
//! envelope.
//!
//! Around the dispatcher sit two background services:
//!
//! - the [`CommandQueue`], a worker pool draining a shared FIFO of raw
//!   commands so producers never wait for processing;
//! - the [`HealthMonitor`], which polls every provider's optional health
//!   check on a fixed interval and keeps the latest state per target.
//!
//! [`bootstrap_with`] wires everything from configuration: it installs
//! structured telemetry, reads the provider table, loads the registry through
//! a provider catalogue and reports each lifecycle step to a
//! [`HealthReporter`]. A provider that fails to load is left out without
//! stopping the gateway.

pub mod dispatch;

mod bootstrap;
mod health;
mod monitor;
mod process;
mod queue;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Gateway, RunningGateway, ShutdownReport, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use dispatch::Dispatcher;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use monitor::{HealthMonitor, HealthStatus, MonitorError, UNSUPPORTED_DETAIL};
pub use process::{LaunchError, LaunchPlan, run_gateway, run_gateway_with};
pub use queue::{
    CommandQueue, DEFAULT_WORKER_COUNT, LoggingResponseHandler, QueueError, QueueSettings,
    ResponseHandler,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
