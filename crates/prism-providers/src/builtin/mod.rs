//! Simulated providers shipped with the gateway.
//!
//! Each provider mirrors a device family the gateway was first deployed
//! against (GPIO motion sensors, serial thermometers, I2C hygrometers and
//! HTTP-controlled lights) but reads from an in-process simulation instead of
//! hardware. They exist so a stock installation can route every built-in
//! schema end to end, and so tests have realistic providers to exercise.

mod dummy;
mod humidity;
mod light;
mod motion;
mod temperature;

use std::sync::Arc;

use crate::capability::Provider;
use crate::command::Command;
use crate::error::CommandError;
use crate::registry::{ProviderCatalog, decode_params};

pub use self::dummy::DummyProvider;
pub use self::humidity::{HumidityParams, HumiditySensor};
pub use self::light::{LightController, LightParams};
pub use self::motion::{MotionParams, MotionSensor};
pub use self::temperature::{TemperatureParams, TemperatureSensor};

const BUILTIN_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::builtin");

/// Catalogue key of [`DummyProvider`].
pub const DUMMY_ADAPTER: &str = "dummy_adapter";
/// Catalogue key of [`MotionSensor`].
pub const MOTION_SENSOR_ADAPTER: &str = "motion_sensor_adapter";
/// Catalogue key of [`TemperatureSensor`].
pub const TEMPERATURE_ADAPTER: &str = "temperature_adapter";
/// Catalogue key of [`HumiditySensor`].
pub const HUMIDITY_SENSOR_ADAPTER: &str = "humidity_sensor_adapter";
/// Catalogue key of [`LightController`].
pub const LIGHT_ADAPTER: &str = "light_adapter";

/// Catalogue holding every built-in provider kind.
#[must_use]
pub fn catalog() -> ProviderCatalog {
    let mut catalog = ProviderCatalog::new();
    register(&mut catalog);
    catalog
}

/// Adds the built-in provider kinds to an existing catalogue.
pub fn register(catalog: &mut ProviderCatalog) {
    catalog
        .register(DUMMY_ADAPTER, |_params| {
            Ok(Arc::new(DummyProvider::new()) as Arc<dyn Provider>)
        })
        .register(MOTION_SENSOR_ADAPTER, |params| {
            let params = decode_params(MOTION_SENSOR_ADAPTER, params)?;
            Ok(Arc::new(MotionSensor::new(params)) as Arc<dyn Provider>)
        })
        .register(TEMPERATURE_ADAPTER, |params| {
            let params = decode_params(TEMPERATURE_ADAPTER, params)?;
            Ok(Arc::new(TemperatureSensor::new(params)) as Arc<dyn Provider>)
        })
        .register(HUMIDITY_SENSOR_ADAPTER, |params| {
            let params = decode_params(HUMIDITY_SENSOR_ADAPTER, params)?;
            Ok(Arc::new(HumiditySensor::new(params)?) as Arc<dyn Provider>)
        })
        .register(LIGHT_ADAPTER, |params| {
            let params = decode_params(LIGHT_ADAPTER, params)?;
            Ok(Arc::new(LightController::new(params)) as Arc<dyn Provider>)
        });
}

/// Error returned for action/property pairs a provider does not handle.
fn unsupported(provider: &str, command: &Command) -> CommandError {
    CommandError::execution_failed(format!(
        "unsupported action or property for {provider}: {} {}",
        command.action().unwrap_or("<none>"),
        command.property().unwrap_or("<none>"),
    ))
}

#[cfg(test)]
mod tests;
