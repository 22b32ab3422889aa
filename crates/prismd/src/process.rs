//! Runs the gateway over a line-delimited command stream.
//!
//! Every non-empty line of the input is one JSON command handed to the
//! queue. End of input starts a graceful shutdown: queued commands are
//! drained before the workers, the monitor and the providers are stopped.

use std::io::{self, BufRead};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use prism_providers::{ProviderCatalog, builtin};

use crate::bootstrap::{BootstrapError, ConfigLoader, ShutdownReport, SystemConfigLoader};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::queue::QueueError;

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::process");

/// Errors surfaced while running the gateway process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The gateway could not be brought up.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Reading the command stream failed. The gateway was still shut down.
    #[error("failed to read commands: {source}")]
    Input {
        /// Underlying IO error.
        #[source]
        source: io::Error,
        /// Shutdown performed after the read failure.
        report: Box<ShutdownReport>,
    },
}

/// Collaborators needed to run the gateway.
pub struct LaunchPlan<'a, R> {
    /// Configuration source.
    pub loader: &'a dyn ConfigLoader,
    /// Lifecycle observer.
    pub reporter: Arc<dyn HealthReporter>,
    /// Provider kinds available to the provider table.
    pub catalog: &'a ProviderCatalog,
    /// Line-delimited command stream.
    pub input: R,
}

/// Runs the gateway with the production collaborators, reading commands
/// from standard input.
///
/// # Errors
///
/// As for [`run_gateway_with`].
pub fn run_gateway() -> Result<ShutdownReport, LaunchError> {
    let catalog = builtin::catalog();
    run_gateway_with(LaunchPlan {
        loader: &SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        catalog: &catalog,
        input: io::stdin().lock(),
    })
}

/// Runs the gateway until `plan.input` is exhausted.
///
/// # Errors
///
/// Returns [`LaunchError::Bootstrap`] when the gateway cannot start and
/// [`LaunchError::Input`] when the stream cannot be read.
pub fn run_gateway_with<R: BufRead>(plan: LaunchPlan<'_, R>) -> Result<ShutdownReport, LaunchError> {
    let LaunchPlan {
        loader,
        reporter,
        catalog,
        input,
    } = plan;

    let gateway = crate::bootstrap::bootstrap_with(loader, reporter, catalog)?.start()?;
    info!(target: PROCESS_TARGET, "reading commands");

    let mut accepted = 0_usize;
    let mut read_error = None;
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(source) => {
                read_error = Some(source);
                break;
            }
        };
        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }
        match gateway.enqueue(payload) {
            Ok(()) => accepted += 1,
            Err(error @ QueueError::Full { .. }) => {
                warn!(target: PROCESS_TARGET, %error, "command dropped");
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, %error, "command queue closed");
                break;
            }
        }
    }

    info!(target: PROCESS_TARGET, accepted, "input exhausted, shutting down");
    let report = gateway.shutdown();
    for failure in &report.cleanup_failures {
        warn!(
            target: PROCESS_TARGET,
            target_name = %failure.target,
            error_message = failure.error.message(),
            "provider cleanup failed"
        );
    }
    info!(
        target: PROCESS_TARGET,
        processed = report.processed,
        "shutdown sequence completed"
    );

    match read_error {
        Some(source) => Err(LaunchError::Input {
            source,
            report: Box::new(report),
        }),
        None => Ok(report),
    }
}
