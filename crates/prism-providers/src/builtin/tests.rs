//! Unit tests for the built-in providers.

use rstest::rstest;
use serde_json::{Map, Value, json};

use super::humidity::relative_humidity;
use super::*;
use crate::capability::{HealthCheck, HealthState};
use crate::error::ErrorKind;
use crate::registry::{ProviderRegistration, ProviderRegistry, RegistryConfig};

fn observe(target: &str, property: &str) -> Command {
    Command::new("OBSERVE", target, property, None)
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

#[test]
fn catalog_lists_every_builtin_kind() {
    let kinds: Vec<_> = catalog().kinds().map(str::to_owned).collect();
    assert_eq!(
        kinds,
        [
            DUMMY_ADAPTER,
            HUMIDITY_SENSOR_ADAPTER,
            LIGHT_ADAPTER,
            MOTION_SENSOR_ADAPTER,
            TEMPERATURE_ADAPTER,
        ]
    );
}

#[rstest]
#[case::motion(MOTION_SENSOR_ADAPTER, json!({"pin": "seventeen"}))]
#[case::temperature(TEMPERATURE_ADAPTER, json!({"baudrate": -1}))]
#[case::humidity_address(HUMIDITY_SENSOR_ADAPTER, json!({"address": "zz"}))]
#[case::humidity_unknown(HUMIDITY_SENSOR_ADAPTER, json!({"channel": 2}))]
#[case::light(LIGHT_ADAPTER, json!({"api_endpoint": 5}))]
fn incompatible_params_fail_initialisation(#[case] kind: &str, #[case] raw: Value) {
    let error = catalog()
        .build(kind, &params(raw))
        .err()
        .expect("construction fails");
    assert_eq!(error.kind(), ErrorKind::AdapterInitializationFailed);
}

#[test]
fn registry_loads_builtins_from_configuration() {
    let config = RegistryConfig::from_registrations(vec![
        ProviderRegistration::new("motion_sensor_1", MOTION_SENSOR_ADAPTER, params(json!({"pin": 4}))),
        ProviderRegistration::new("living_room_light", LIGHT_ADAPTER, Map::new()),
    ]);

    let registry = ProviderRegistry::load(&catalog(), &config);

    assert_eq!(registry.len(), 2);
    assert!(registry.failures().is_empty());
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

#[test]
fn dummy_accepts_only_its_test_action() {
    let provider = DummyProvider::new();
    let accepted = Command::new("TEST", DUMMY_ADAPTER, "anything", None);
    assert_eq!(
        provider.execute(&accepted).expect("test action"),
        json!({"status": "Dummy action executed successfully."})
    );

    let rejected = observe(DUMMY_ADAPTER, "anything");
    let error = provider.execute(&rejected).expect_err("unsupported");
    assert_eq!(error.kind(), ErrorKind::AdapterExecutionFailed);
    assert!(provider.health().is_none());
}

#[test]
fn motion_sensor_reports_no_motion() {
    let sensor = MotionSensor::new(MotionParams::default());
    assert_eq!(
        sensor.health_check().expect("health check").detail.as_deref(),
        Some("gpio pin 17")
    );
    assert_eq!(
        sensor
            .execute(&observe("motion_sensor_1", "motion_detected"))
            .expect("observe"),
        json!({"motion_detected": false})
    );
}

#[test]
fn temperature_sensor_reads_room_temperature() {
    let sensor = TemperatureSensor::new(TemperatureParams::default());
    assert_eq!(
        sensor.health_check().expect("health check").detail.as_deref(),
        Some("serial /dev/ttyUSB0 at 9600 baud")
    );
    assert_eq!(
        sensor
            .execute(&observe("temperature_sensor_1", "current_temperature"))
            .expect("observe"),
        json!({"current_temperature": 25.0})
    );
}

#[rstest]
#[case::midpoint(0x8000, 56.5)]
#[case::floor(0, -6.0)]
#[case::quarter(0x4000, 25.25)]
fn humidity_conversion(#[case] raw: u16, #[case] expected: f64) {
    assert!((relative_humidity(raw) - expected).abs() < f64::EPSILON);
}

#[rstest]
#[case::prefixed("0x40", "0x40")]
#[case::upper_prefix("0X1F", "0x1f")]
#[case::bare("44", "0x44")]
fn humidity_accepts_hex_addresses(#[case] address: &str, #[case] expected: &str) {
    let sensor = HumiditySensor::new(HumidityParams {
        address: address.to_owned(),
        ..HumidityParams::default()
    })
    .expect("valid address");
    assert_eq!(
        sensor.health_check().expect("health check").detail,
        Some(format!("I2C bus 1 address {expected}"))
    );
}

#[test]
fn humidity_sensor_reads_simulated_word() {
    let sensor = HumiditySensor::new(HumidityParams::default()).expect("defaults valid");
    assert_eq!(
        sensor
            .execute(&observe("humidity_sensor_1", "current_humidity"))
            .expect("observe"),
        json!({"current_humidity": 56.5})
    );
}

#[test]
fn humidity_sensor_fails_after_bus_closed() {
    let sensor = HumiditySensor::new(HumidityParams::default()).expect("defaults valid");
    sensor.cleanup().expect("first cleanup");
    sensor.cleanup().expect("second cleanup");

    let error = sensor
        .execute(&observe("humidity_sensor_1", "current_humidity"))
        .expect_err("bus closed");
    assert_eq!(error.kind(), ErrorKind::AdapterExecutionFailed);
    assert!(
        sensor
            .health()
            .expect("health capability")
            .health_check()
            .is_err()
    );
}

#[test]
fn light_remembers_last_state() {
    let light = LightController::new(LightParams::default());
    assert_eq!(light.state(), None);

    let on = Command::new("ACTUATE", "living_room_light", "state", Some(json!("ON")));
    assert_eq!(
        light.execute(&on).expect("actuate"),
        json!({"status": "Light set to ON"})
    );
    assert_eq!(light.state().as_deref(), Some("ON"));

    let report = light
        .health()
        .expect("health capability")
        .health_check()
        .expect("health check");
    assert_eq!(report.state, HealthState::Ok);
    assert!(report.detail.expect("detail").contains("ON"));
}

#[test]
fn light_requires_a_value() {
    let light = LightController::new(LightParams::default());
    let command = Command::new("ACTUATE", "living_room_light", "state", None);
    let error = light.execute(&command).expect_err("value missing");
    assert_eq!(error.kind(), ErrorKind::AdapterExecutionFailed);
}

#[rstest]
#[case::motion(MOTION_SENSOR_ADAPTER, "current_temperature")]
#[case::temperature(TEMPERATURE_ADAPTER, "motion_detected")]
#[case::humidity(HUMIDITY_SENSOR_ADAPTER, "state")]
#[case::light(LIGHT_ADAPTER, "state")]
fn unsupported_commands_fail_execution(#[case] kind: &str, #[case] property: &str) {
    let provider = catalog().build(kind, &Map::new()).expect("defaults valid");
    let error = provider
        .execute(&observe("some_target", property))
        .expect_err("unsupported");
    assert_eq!(error.kind(), ErrorKind::AdapterExecutionFailed);
    assert!(error.message().contains("unsupported"), "got {}", error.message());
}

#[test]
fn released_motion_sensor_reports_error_health() {
    let sensor = MotionSensor::new(MotionParams::default());
    let check = sensor.health().expect("health capability");
    assert_eq!(check.health_check().expect("health check").state, HealthState::Ok);

    sensor.cleanup().expect("cleanup");
    assert_eq!(
        check.health_check().expect("health check").state,
        HealthState::Error
    );
}

#[test]
fn events_use_the_crate_path_as_target() {
    assert_eq!(BUILTIN_TARGET, "prism_providers::builtin");
}
