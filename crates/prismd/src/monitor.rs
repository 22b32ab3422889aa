//! Periodic health polling of registered providers.
//!
//! The monitor takes a snapshot of the registry when started and polls every
//! provider from one background thread, sleeping for the configured interval
//! between cycles. Each poll overwrites the target's entry in a shared map.
//! A failing or panicking health check is recorded as an `error` state for that
//! target only; the cycle carries on with the remaining providers.

use std::collections::BTreeMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use prism_providers::{HealthState, Provider, ProviderRegistry, describe_panic};

pub(crate) const MONITOR_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::monitor");

/// Detail recorded for providers without a health check.
pub const UNSUPPORTED_DETAIL: &str = "health check not supported";

/// Latest health observation for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Target the observation belongs to.
    pub target: String,
    /// Observed state.
    pub state: HealthState,
    /// Health detail or failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Errors reported while running the monitor thread.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    /// [`HealthMonitor::start`] was called while polling.
    #[error("the health monitor is already running")]
    AlreadyStarted,
    /// The polling thread could not be spawned.
    #[error("failed to spawn health monitor thread: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The polling thread terminated by panicking.
    #[error("the health monitor thread panicked")]
    ThreadPanicked,
}

#[derive(Default)]
struct Shared {
    statuses: RwLock<BTreeMap<String, HealthStatus>>,
    cycles: AtomicU64,
}

impl Shared {
    fn poll(&self, providers: &[(String, Arc<dyn Provider>)]) {
        for (target, provider) in providers {
            let status = check_health(target, provider.as_ref());
            self.statuses
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(target.clone(), status);
        }
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: MONITOR_TARGET, cycle, "health cycle completed");
    }
}

struct Running {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

/// Background poller recording the health of every provider.
pub struct HealthMonitor {
    interval: Duration,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl HealthMonitor {
    /// Creates an idle monitor polling every `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            shared: Arc::new(Shared::default()),
            running: Mutex::new(None),
        }
    }

    /// Interval between polling cycles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Starts polling the providers currently in `registry`.
    ///
    /// The first cycle runs immediately.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AlreadyStarted`] when already polling or
    /// [`MonitorError::Spawn`] when the thread cannot be created.
    pub fn start(&self, registry: &ProviderRegistry) -> Result<(), MonitorError> {
        let mut running = self.lock_running();
        if running.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }

        let providers = registry.snapshot();
        let (stop, stopped) = crossbeam_channel::bounded(1);
        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        let thread = thread::Builder::new()
            .name(String::from("prism-health-monitor"))
            .spawn(move || run_loop(&shared, &providers, interval, &stopped))
            .map_err(|source| MonitorError::Spawn {
                source: Arc::new(source),
            })?;

        info!(
            target: MONITOR_TARGET,
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            providers = registry.len(),
            "health monitoring started"
        );
        *running = Some(Running { stop, thread });
        Ok(())
    }

    /// Runs one polling cycle on the calling thread.
    pub fn poll(&self, registry: &ProviderRegistry) {
        self.shared.poll(&registry.snapshot());
    }

    /// Signals the polling thread and waits for it to exit.
    ///
    /// A cycle already in progress completes first. Stopping an idle monitor
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ThreadPanicked`] when the thread died by
    /// panicking.
    pub fn stop(&self) -> Result<(), MonitorError> {
        let Some(Running { stop, thread }) = self.lock_running().take() else {
            return Ok(());
        };
        drop(stop);
        let joined = thread.join().map_err(|_| MonitorError::ThreadPanicked);
        info!(target: MONITOR_TARGET, "health monitoring stopped");
        joined
    }

    /// Returns `true` while the polling thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Latest observation for every polled target, in target order.
    #[must_use]
    pub fn statuses(&self) -> Vec<HealthStatus> {
        self.shared
            .statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Latest observation for `target`.
    #[must_use]
    pub fn status(&self, target: &str) -> Option<HealthStatus> {
        self.shared
            .statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(target)
            .cloned()
    }

    /// Number of completed polling cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::SeqCst)
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            error!(target: MONITOR_TARGET, %error, "health monitor stopped uncleanly");
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("interval", &self.interval)
            .field("cycles", &self.cycles())
            .field("running", &self.is_running())
            .finish()
    }
}

fn run_loop(
    shared: &Shared,
    providers: &[(String, Arc<dyn Provider>)],
    interval: Duration,
    stopped: &Receiver<()>,
) {
    loop {
        shared.poll(providers);
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Checks one provider, converting every failure to an `error` status.
fn check_health(target: &str, provider: &dyn Provider) -> HealthStatus {
    let Some(check) = provider.health() else {
        return HealthStatus {
            target: target.to_owned(),
            state: HealthState::Ok,
            detail: Some(UNSUPPORTED_DETAIL.to_owned()),
        };
    };

    let (state, detail) = match panic::catch_unwind(AssertUnwindSafe(|| check.health_check())) {
        Ok(Ok(report)) => (report.state, report.detail),
        Ok(Err(failure)) => (HealthState::Error, Some(failure.message().to_owned())),
        Err(payload) => (
            HealthState::Error,
            Some(format!(
                "health check panicked: {}",
                describe_panic(payload.as_ref())
            )),
        ),
    };

    match state {
        HealthState::Ok => debug!(
            target: MONITOR_TARGET,
            target_name = target,
            detail = detail.as_deref().unwrap_or_default(),
            "provider healthy"
        ),
        HealthState::Error => error!(
            target: MONITOR_TARGET,
            target_name = target,
            detail = detail.as_deref().unwrap_or_default(),
            "provider unhealthy"
        ),
    }

    HealthStatus {
        target: target.to_owned(),
        state,
        detail,
    }
}

#[cfg(test)]
mod tests;
