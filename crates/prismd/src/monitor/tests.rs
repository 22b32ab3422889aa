//! Unit tests for the provider health monitor.

use std::sync::atomic::AtomicUsize;
use std::time::Instant;

use prism_providers::{Command, CommandError, HealthCheck, ProviderHealth};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;

const SHORT_INTERVAL: Duration = Duration::from_millis(10);
const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// Provider whose health outcome is fixed at construction.
struct Scripted {
    outcome: Result<ProviderHealth, CommandError>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(outcome: Result<ProviderHealth, CommandError>) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for Scripted {
    fn execute(&self, _command: &Command) -> Result<Value, CommandError> {
        Ok(json!({}))
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for Scripted {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Provider without a health check.
struct Silent;

impl Provider for Silent {
    fn execute(&self, _command: &Command) -> Result<Value, CommandError> {
        Ok(json!({}))
    }
}

/// Provider whose health check panics.
struct Fragile;

impl Provider for Fragile {
    fn execute(&self, _command: &Command) -> Result<Value, CommandError> {
        Ok(json!({}))
    }

    fn health(&self) -> Option<&dyn HealthCheck> {
        Some(self)
    }
}

impl HealthCheck for Fragile {
    fn health_check(&self) -> Result<ProviderHealth, CommandError> {
        panic!("sensor shorted");
    }
}

fn shared(provider: impl Provider + 'static) -> Arc<dyn Provider> {
    Arc::new(provider)
}

fn registry(providers: Vec<(&str, Arc<dyn Provider>)>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for (target, provider) in providers {
        registry.insert(target, provider).expect("insert provider");
    }
    registry
}

fn wait_for_cycles(monitor: &HealthMonitor, cycles: u64) {
    let deadline = Instant::now() + WAIT_LIMIT;
    while monitor.cycles() < cycles {
        assert!(Instant::now() < deadline, "monitor did not reach {cycles} cycles");
        thread::sleep(SHORT_INTERVAL);
    }
}

#[fixture]
fn monitor() -> HealthMonitor {
    HealthMonitor::new(SHORT_INTERVAL)
}

#[rstest]
fn failing_health_check_is_recorded_each_cycle(monitor: HealthMonitor) {
    let failing = Arc::new(Scripted::new(Err(CommandError::execution_failed(
        "bus timeout",
    ))));
    let healthy = Arc::new(Scripted::new(Ok(ProviderHealth::ok_with("serial ready"))));
    let registry = registry(vec![
        ("cellar", Arc::clone(&failing) as Arc<dyn Provider>),
        ("attic", Arc::clone(&healthy) as Arc<dyn Provider>),
    ]);

    monitor.start(&registry).expect("start");
    wait_for_cycles(&monitor, 3);
    monitor.stop().expect("stop");

    assert!(failing.calls() >= 3);
    assert_eq!(failing.calls(), healthy.calls());
    assert_eq!(
        monitor.status("cellar"),
        Some(HealthStatus {
            target: String::from("cellar"),
            state: HealthState::Error,
            detail: Some(String::from("bus timeout")),
        })
    );
    assert_eq!(
        monitor.status("attic").map(|status| status.state),
        Some(HealthState::Ok)
    );
}

#[rstest]
fn unsupported_health_check_is_reported_healthy(monitor: HealthMonitor) {
    monitor.poll(&registry(vec![("porch", shared(Silent))]));

    let status = monitor.status("porch").expect("porch polled");
    assert_eq!(status.state, HealthState::Ok);
    assert_eq!(status.detail.as_deref(), Some(UNSUPPORTED_DETAIL));
    assert_eq!(monitor.cycles(), 1);
}

#[rstest]
fn panicking_health_check_is_isolated(monitor: HealthMonitor) {
    let healthy = Arc::new(Scripted::new(Ok(ProviderHealth::ok())));
    monitor.poll(&registry(vec![
        ("garage", shared(Fragile)),
        ("hall", Arc::clone(&healthy) as Arc<dyn Provider>),
    ]));

    let garage = monitor.status("garage").expect("garage polled");
    assert_eq!(garage.state, HealthState::Error);
    assert_eq!(
        garage.detail.as_deref(),
        Some("health check panicked: sensor shorted")
    );
    assert_eq!(healthy.calls(), 1);
}

#[rstest]
fn reported_error_state_is_kept(monitor: HealthMonitor) {
    monitor.poll(&registry(vec![(
        "pump",
        shared(Scripted::new(Ok(ProviderHealth::error("pressure low")))),
    )]));

    let status = monitor.status("pump").expect("pump polled");
    assert_eq!(status.state, HealthState::Error);
    assert_eq!(status.detail.as_deref(), Some("pressure low"));
}

#[rstest]
fn statuses_are_ordered_by_target(monitor: HealthMonitor) {
    monitor.poll(&registry(vec![
        ("zeta", shared(Silent)),
        ("alpha", shared(Silent)),
    ]));

    let targets: Vec<String> = monitor
        .statuses()
        .into_iter()
        .map(|status| status.target)
        .collect();
    assert_eq!(targets, ["alpha", "zeta"]);
}

#[test]
fn stop_interrupts_a_long_interval() {
    let monitor = HealthMonitor::new(Duration::from_secs(3600));
    monitor
        .start(&registry(vec![("porch", shared(Silent))]))
        .expect("start");
    wait_for_cycles(&monitor, 1);

    let started = Instant::now();
    monitor.stop().expect("stop");

    assert!(started.elapsed() < WAIT_LIMIT);
    assert!(!monitor.is_running());
    assert_eq!(monitor.cycles(), 1);
}

#[rstest]
fn start_twice_is_rejected(monitor: HealthMonitor) {
    let registry = registry(vec![("porch", shared(Silent))]);
    monitor.start(&registry).expect("start");
    assert!(matches!(
        monitor.start(&registry),
        Err(MonitorError::AlreadyStarted)
    ));
    monitor.stop().expect("stop");
    monitor.stop().expect("second stop");
}

#[test]
fn status_serialises_without_empty_detail() {
    let status = HealthStatus {
        target: String::from("porch"),
        state: HealthState::Ok,
        detail: None,
    };
    assert_eq!(
        serde_json::to_value(&status).expect("serialise"),
        json!({"target": "porch", "state": "ok"})
    );
}
