//! Provider used to smoke-test a deployment.

use serde_json::{Value, json};
use tracing::info;

use super::BUILTIN_TARGET;
use crate::capability::Provider;
use crate::command::Command;
use crate::error::CommandError;

/// Accepts only the `TEST` action addressed to `dummy_adapter`.
#[derive(Debug, Default)]
pub struct DummyProvider;

impl DummyProvider {
    /// Creates the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Provider for DummyProvider {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        match (command.action(), command.target()) {
            (Some("TEST"), Some(super::DUMMY_ADAPTER)) => {
                info!(target: BUILTIN_TARGET, "dummy action executed");
                Ok(json!({"status": "Dummy action executed successfully."}))
            }
            _ => Err(CommandError::execution_failed(
                "unsupported action or target for dummy provider",
            )),
        }
    }
}
