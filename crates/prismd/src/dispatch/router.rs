//! Command routing from raw text to provider result.
//!
//! [`Dispatcher::route`] is the single normalisation point of the gateway:
//! every failure along the way, including a panic inside a provider or a
//! middleware stage, leaves it as a [`CommandError`]. The steps run in a
//! fixed order:
//!
//! 1. parse the raw text into a [`Command`];
//! 2. validate it against the schema selected by its key;
//! 3. run the middleware chain;
//! 4. check the action against [`Action`];
//! 5. look up the provider registered for the target;
//! 6. execute the command on that provider.

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use prism_providers::{
    Action, CleanupFailure, Command, CommandError, ErrorKind, ProviderRegistry, describe_panic,
};

use super::middleware::{Middleware, Pipeline};
use super::schema::SchemaRegistry;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::dispatch");

/// Routes commands to the providers registered for their targets.
///
/// The registry and schema table are fixed at construction; middleware is
/// added during startup wiring through [`Dispatcher::add_middleware`]. Routing
/// only needs `&self`, so one dispatcher is shared by every queue worker.
pub struct Dispatcher {
    registry: ProviderRegistry,
    schemas: SchemaRegistry,
    pipeline: Pipeline,
}

impl Dispatcher {
    /// Creates a dispatcher over a loaded registry.
    #[must_use]
    pub fn new(registry: ProviderRegistry, schemas: SchemaRegistry) -> Self {
        Self {
            registry,
            schemas,
            pipeline: Pipeline::default(),
        }
    }

    /// Appends `middleware` to the end of the chain.
    pub fn add_middleware(&mut self, middleware: impl Middleware + 'static) {
        self.pipeline.push(Box::new(middleware));
    }

    /// Names of the registered middleware, in application order.
    pub fn middleware_names(&self) -> impl Iterator<Item = &str> {
        self.pipeline.names()
    }

    /// Number of registered middleware stages.
    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.pipeline.len()
    }

    /// Provider registry the dispatcher routes to.
    #[must_use]
    pub const fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Routes a raw JSON command.
    ///
    /// # Errors
    ///
    /// Returns the [`CommandError`] describing the first step that failed.
    /// Panics raised while routing are reported as
    /// [`ErrorKind::InternalError`](prism_providers::ErrorKind::InternalError).
    pub fn route(&self, raw: &str) -> Result<Value, CommandError> {
        guarded(|| Command::parse(raw).and_then(|command| self.dispatch(command)))
    }

    /// Routes an already parsed command, starting at schema validation.
    ///
    /// # Errors
    ///
    /// As for [`Dispatcher::route`].
    pub fn route_command(&self, command: Command) -> Result<Value, CommandError> {
        guarded(|| self.dispatch(command))
    }

    /// Routes a raw command and renders the outcome as JSON.
    ///
    /// Successful results are returned unchanged; failures become the
    /// `{"error": {"code", "message"}}` envelope.
    #[must_use]
    pub fn route_envelope(&self, raw: &str) -> Value {
        self.route(raw).unwrap_or_else(|error| error.to_json())
    }

    /// Runs every provider's teardown and returns the failures.
    pub fn cleanup_all(&self) -> Vec<CleanupFailure> {
        self.registry.cleanup_all()
    }

    fn dispatch(&self, command: Command) -> Result<Value, CommandError> {
        let validation = self.schemas.validate(&command);
        if !validation.is_valid() {
            return Err(CommandError::invalid_command(validation.message()));
        }

        let command = self.pipeline.run(command)?;

        let action = Action::parse(command.action().unwrap_or_default())?;
        let target = command.target().unwrap_or_default();
        let provider = self.registry.get(target).ok_or_else(|| {
            CommandError::unknown_target(format!("no provider found for target: {target}"))
        })?;

        info!(
            target: DISPATCH_TARGET,
            action = action.as_str(),
            target_name = target,
            "routing command"
        );
        let result = provider
            .execute(&command)
            .map_err(|failure| CommandError::new(failure.kind(), failure.message()))?;
        debug!(
            target: DISPATCH_TARGET,
            target_name = target,
            result = %result,
            "provider responded"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("schemas", &self.schemas.len())
            .field("middleware", &self.middleware_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Runs a routing step, converting an escaping panic to an internal error.
fn guarded(route: impl FnOnce() -> Result<Value, CommandError>) -> Result<Value, CommandError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(route)).unwrap_or_else(|payload| {
        Err(CommandError::internal(format!(
            "an unexpected error occurred: {}",
            describe_panic(payload.as_ref())
        )))
    });
    if let Err(failure) = &outcome {
        log_failure(failure);
    }
    outcome
}

fn log_failure(failure: &CommandError) {
    match failure.kind() {
        ErrorKind::InvalidCommand | ErrorKind::UnknownAction | ErrorKind::UnknownTarget => warn!(
            target: DISPATCH_TARGET,
            code = failure.code(),
            error_message = failure.message(),
            "command rejected"
        ),
        ErrorKind::AdapterInitializationFailed
        | ErrorKind::AdapterExecutionFailed
        | ErrorKind::InternalError => error!(
            target: DISPATCH_TARGET,
            code = failure.code(),
            error_message = failure.message(),
            "command failed"
        ),
    }
}
