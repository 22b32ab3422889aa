//! Simulated serial thermometer.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{BUILTIN_TARGET, unsupported};
use crate::capability::{HealthCheck, Provider, ProviderHealth};
use crate::command::Command;
use crate::error::CommandError;

/// Reading returned by the simulation, in degrees Celsius.
const SIMULATED_CELSIUS: f64 = 25.0;

fn default_port() -> String {
    String::from("/dev/ttyUSB0")
}

const fn default_baudrate() -> u32 {
    9600
}

/// Constructor parameters for [`TemperatureSensor`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemperatureParams {
    /// Serial device path.
    #[serde(default = "default_port")]
    pub port: String,
    /// Serial line speed.
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
}

impl Default for TemperatureParams {
    fn default() -> Self {
        Self {
            port: default_port(),
            baudrate: default_baudrate(),
        }
    }
}

/// Thermometer that always reads room temperature.
#[derive(Debug)]
pub struct TemperatureSensor {
    params: TemperatureParams,
}

impl TemperatureSensor {
    /// Opens the configured serial line.
    #[must_use]
    pub fn new(params: TemperatureParams) -> Self {
        info!(
            target: BUILTIN_TARGET,
            port = %params.port,
            baudrate = params.baudrate,
            "temperature sensor ready"
        );
        Self { params }
    }
}

impl Provider for TemperatureSensor {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        match (command.action(), command.property()) {
            (Some("OBSERVE"), Some("current_temperature")) => {
                Ok(json!({"current_temperature": SIMULATED_CELSIUS}))
            }
            _ => Err(unsupported("temperature sensor", command)),
        }
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for TemperatureSensor {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        Ok(ProviderHealth::ok_with(format!(
            "serial {} at {} baud",
            self.params.port, self.params.baudrate
        )))
    }
}
