//! Simulated HTTP-controlled light.

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{BUILTIN_TARGET, unsupported};
use crate::capability::{HealthCheck, Provider, ProviderHealth};
use crate::command::Command;
use crate::error::CommandError;

fn default_endpoint() -> String {
    String::from("http://localhost:5000/api/lights/living_room")
}

/// Constructor parameters for [`LightController`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightParams {
    /// Controller endpoint the state would be posted to.
    #[serde(default = "default_endpoint")]
    pub api_endpoint: String,
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            api_endpoint: default_endpoint(),
        }
    }
}

/// Light whose state lives in memory.
#[derive(Debug)]
pub struct LightController {
    endpoint: String,
    state: Mutex<Option<String>>,
}

impl LightController {
    /// Binds the controller to its endpoint.
    #[must_use]
    pub fn new(params: LightParams) -> Self {
        info!(
            target: BUILTIN_TARGET,
            endpoint = %params.api_endpoint,
            "light controller ready"
        );
        Self {
            endpoint: params.api_endpoint,
            state: Mutex::new(None),
        }
    }

    /// Last state the light was set to.
    #[must_use]
    pub fn state(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn actuate(&self, value: Option<&Value>) -> Result<Value, CommandError> {
        let rendered = match value {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => {
                return Err(CommandError::execution_failed(
                    "error actuating light: no state value supplied",
                ));
            }
        };
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(rendered.clone());
        info!(
            target: BUILTIN_TARGET,
            endpoint = %self.endpoint,
            state = %rendered,
            "light state set"
        );
        Ok(json!({"status": format!("Light set to {rendered}")}))
    }
}

impl Provider for LightController {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        match (command.action(), command.property()) {
            (Some("ACTUATE"), Some("state")) => self.actuate(command.value()),
            _ => Err(unsupported("light controller", command)),
        }
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for LightController {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        let state = self.state();
        Ok(ProviderHealth::ok_with(format!(
            "{} ({})",
            self.endpoint,
            state.as_deref().unwrap_or("state unknown")
        )))
    }
}
