//! Simulated GPIO motion sensor.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::{BUILTIN_TARGET, unsupported};
use crate::capability::{HealthCheck, Provider, ProviderHealth};
use crate::command::Command;
use crate::error::CommandError;

const fn default_pin() -> u8 {
    17
}

/// Constructor parameters for [`MotionSensor`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionParams {
    /// BCM pin the sensor is wired to.
    #[serde(default = "default_pin")]
    pub pin: u8,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self { pin: default_pin() }
    }
}

/// Motion sensor that never sees motion.
#[derive(Debug)]
pub struct MotionSensor {
    pin: u8,
    released: AtomicBool,
}

impl MotionSensor {
    /// Claims the configured pin.
    #[must_use]
    pub fn new(params: MotionParams) -> Self {
        info!(target: BUILTIN_TARGET, pin = params.pin, "motion sensor ready");
        Self {
            pin: params.pin,
            released: AtomicBool::new(false),
        }
    }
}

impl Provider for MotionSensor {
    fn execute(&self, command: &Command) -> Result<Value, CommandError> {
        match (command.action(), command.property()) {
            (Some("OBSERVE"), Some("motion_detected")) => Ok(json!({"motion_detected": false})),
            _ => Err(unsupported("motion sensor", command)),
        }
    }

    fn cleanup(&self) -> Result<(), CommandError> {
        if !self.released.swap(true, Ordering::SeqCst) {
            info!(target: BUILTIN_TARGET, pin = self.pin, "gpio pin released");
        }
        Ok(())
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for MotionSensor {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        if self.released.load(Ordering::SeqCst) {
            return Ok(ProviderHealth::error(format!(
                "gpio pin {} has been released",
                self.pin
            )));
        }
        Ok(ProviderHealth::ok_with(format!("gpio pin {}", self.pin)))
    }
}
