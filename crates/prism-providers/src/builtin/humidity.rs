//! Simulated I2C hygrometer.
//!
//! The sensor returns a 16-bit raw reading that converts to relative humidity
//! as `raw * 125 / 65536 - 6`. The simulation answers every read with a fixed
//! raw value, configurable through `simulated_raw`.

use std::sync::{Mutex, PoisonError};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{BUILTIN_TARGET, unsupported};
use crate::capability::{HealthCheck, Provider, ProviderHealth};
use crate::command::Command;
use crate::error::CommandError;

const fn default_bus() -> u8 {
    1
}

fn default_address() -> String {
    String::from("0x40")
}

const fn default_raw() -> u16 {
    0x8000
}

/// Constructor parameters for [`HumiditySensor`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HumidityParams {
    /// I2C bus number.
    #[serde(default = "default_bus")]
    pub bus: u8,
    /// Device address as a hexadecimal string, with or without `0x`.
    #[serde(default = "default_address")]
    pub address: String,
    /// Raw reading the simulated device reports.
    #[serde(default = "default_raw")]
    pub simulated_raw: u16,
}

impl Default for HumidityParams {
    fn default() -> Self {
        Self {
            bus: default_bus(),
            address: default_address(),
            simulated_raw: default_raw(),
        }
    }
}

/// Converts a raw sensor word to percent relative humidity.
#[must_use]
pub fn relative_humidity(raw: u16) -> f64 {
    f64::from(raw) * 125.0 / 65536.0 - 6.0
}

fn parse_address(text: &str) -> Result<u8, CommandError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u8::from_str_radix(digits, 16).map_err(|error| {
        CommandError::initialization_failed(format!(
            "invalid I2C address '{text}' for humidity sensor: {error}"
        ))
    })
}

#[derive(Debug)]
struct Bus {
    open: bool,
    raw: u16,
}

/// Hygrometer on a simulated I2C bus.
#[derive(Debug)]
pub struct HumiditySensor {
    bus_number: u8,
    address: u8,
    bus: Mutex<Bus>,
}

impl HumiditySensor {
    /// Opens the bus and resolves the device address.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterInitializationFailed` error when `address` is not a
    /// hexadecimal byte.
    pub fn new(params: HumidityParams) -> Result<Self, CommandError> {
        let address = parse_address(&params.address)?;
        info!(
            target: BUILTIN_TARGET,
            bus = params.bus,
            address = format_args!("{address:#04x}"),
            "humidity sensor ready"
        );
        Ok(Self {
            bus_number: params.bus,
            address,
            bus: Mutex::new(Bus {
                open: true,
                raw: params.simulated_raw,
            }),
        })
    }

    fn read_raw(&self) -> Result<u16, CommandError> {
        let bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        if !bus.open {
            return Err(CommandError::execution_failed(format!(
                "error reading humidity sensor: I2C bus {} is closed",
                self.bus_number
            )));
        }
        Ok(bus.raw)
    }
}

impl Provider for HumiditySensor {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        match (command.action(), command.property()) {
            (Some("OBSERVE"), Some("current_humidity")) => {
                let humidity = relative_humidity(self.read_raw()?);
                Ok(json!({"current_humidity": humidity}))
            }
            _ => Err(unsupported("humidity sensor", command)),
        }
    }

    fn cleanup(&self) -> Result<(), CommandError> {
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        if bus.open {
            bus.open = false;
            info!(target: BUILTIN_TARGET, bus = self.bus_number, "I2C bus closed");
        }
        Ok(())
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for HumiditySensor {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        self.read_raw()?;
        Ok(ProviderHealth::ok_with(format!(
            "I2C bus {} address {:#04x}",
            self.bus_number, self.address
        )))
    }
}
