//! Ordered transform pipeline applied to validated commands.

use std::sync::Arc;

use tracing::info;

use prism_providers::{Command, CommandError};

use super::router::DISPATCH_TARGET;

/// Transform applied to every command after schema validation.
///
/// Implementations return a new command, typically built with
/// [`Command::with_field`], and must keep `action` and `target` unless they
/// document otherwise. Returning an error aborts the chain and becomes the
/// command's result.
pub trait Middleware: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Transforms `command`.
    ///
    /// # Errors
    ///
    /// Returns the error that should be reported for the command.
    fn process(&self, command: Command) -> Result<Command, CommandError>;
}

impl<T> Middleware for Arc<T>
where
    T: Middleware + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&self, command: Command) -> Result<Command, CommandError> {
        (**self).process(command)
    }
}

/// Logs each command and passes it through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Builds the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &str {
        "logging"
    }

    fn process(&self, command: Command) -> Result<Command, CommandError> {
        info!(
            target: DISPATCH_TARGET,
            middleware = self.name(),
            command = %command,
            "processing command"
        );
        Ok(command)
    }
}

/// Middleware chain applied in registration order.
#[derive(Default)]
pub(crate) struct Pipeline {
    stages: Vec<Box<dyn Middleware>>,
}

impl Pipeline {
    pub(crate) fn push(&mut self, middleware: Box<dyn Middleware>) {
        info!(
            target: DISPATCH_TARGET,
            middleware = middleware.name(),
            position = self.stages.len(),
            "middleware added"
        );
        self.stages.push(middleware);
    }

    pub(crate) fn len(&self) -> usize {
        self.stages.len()
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|stage| stage.name())
    }

    /// Pipes `command` through every stage, stopping at the first error.
    pub(crate) fn run(&self, command: Command) -> Result<Command, CommandError> {
        self.stages
            .iter()
            .try_fold(command, |command, stage| stage.process(command))
    }
}
