//! Asynchronous command intake served by a pool of worker threads.
//!
//! Producers hand raw command text to [`CommandQueue::enqueue`], which never
//! waits for processing. Workers share one FIFO channel, route each payload
//! through the [`Dispatcher`] and pass the outcome to a [`ResponseHandler`].
//!
//! [`CommandQueue::stop`] closes the intake: payloads already queued are
//! still processed, after which every worker observes the closed channel,
//! exits, and is joined before `stop` returns.

use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use prism_config::Config;
use prism_providers::{CommandError, describe_panic};

use crate::dispatch::Dispatcher;

pub(crate) const QUEUE_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::queue");

/// Worker count used when none is configured.
pub const DEFAULT_WORKER_COUNT: usize = prism_config::DEFAULT_WORKER_COUNT;

/// Sizing of the worker pool and its intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSettings {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Maximum number of queued payloads; unbounded when `None` or zero.
    pub capacity: Option<usize>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            capacity: None,
        }
    }
}

impl QueueSettings {
    /// Settings resolved from the gateway configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            worker_count: config.worker_count(),
            capacity: config.queue_capacity(),
        }
    }
}

/// Errors reported by the command queue.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The pool was configured without workers.
    #[error("the command queue needs at least one worker")]
    NoWorkers,
    /// [`CommandQueue::start`] was called on a running queue.
    #[error("the command queue is already running")]
    AlreadyStarted,
    /// The queue is not accepting payloads.
    #[error("the command queue is not running")]
    Stopped,
    /// A bounded queue has no free slot.
    #[error("the command queue is full ({capacity} payloads pending)")]
    Full {
        /// Configured bound.
        capacity: usize,
    },
    /// A worker thread could not be spawned.
    #[error("failed to spawn queue worker: {source}")]
    Spawn {
        /// Underlying OS error.
        #[source]
        source: Arc<io::Error>,
    },
    /// One or more workers terminated by panicking.
    #[error("{count} queue worker(s) panicked")]
    WorkerPanicked {
        /// Number of workers that panicked.
        count: usize,
    },
}

/// Receives the outcome of every routed payload.
#[cfg_attr(test, mockall::automock)]
pub trait ResponseHandler: Send + Sync {
    /// Handles the result of routing `payload`.
    fn handle(&self, payload: &str, outcome: &Result<Value, CommandError>);
}

/// Default handler writing outcomes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingResponseHandler;

impl ResponseHandler for LoggingResponseHandler {
    fn handle(&self, _payload: &str, outcome: &Result<Value, CommandError>) {
        match outcome {
            Ok(result) => info!(
                target: QUEUE_TARGET,
                result = %result,
                "command completed"
            ),
            Err(failure) => warn!(
                target: QUEUE_TARGET,
                envelope = %failure.to_json(),
                "command failed"
            ),
        }
    }
}

enum QueueState {
    Idle,
    Running {
        sender: Sender<String>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Worker pool consuming a shared FIFO of raw commands.
pub struct CommandQueue {
    dispatcher: Arc<Dispatcher>,
    handler: Arc<dyn ResponseHandler>,
    settings: QueueSettings,
    processed: Arc<AtomicUsize>,
    state: Mutex<QueueState>,
}

impl CommandQueue {
    /// Creates a stopped queue logging outcomes through
    /// [`LoggingResponseHandler`].
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoWorkers`] when `settings.worker_count` is zero.
    pub fn new(dispatcher: Arc<Dispatcher>, settings: QueueSettings) -> Result<Self, QueueError> {
        Self::with_handler(dispatcher, settings, Arc::new(LoggingResponseHandler))
    }

    /// Creates a stopped queue delivering outcomes to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoWorkers`] when `settings.worker_count` is zero.
    pub fn with_handler(
        dispatcher: Arc<Dispatcher>,
        settings: QueueSettings,
        handler: Arc<dyn ResponseHandler>,
    ) -> Result<Self, QueueError> {
        if settings.worker_count == 0 {
            return Err(QueueError::NoWorkers);
        }
        Ok(Self {
            dispatcher,
            handler,
            settings,
            processed: Arc::new(AtomicUsize::new(0)),
            state: Mutex::new(QueueState::Idle),
        })
    }

    /// Settings the queue was built with.
    #[must_use]
    pub const fn settings(&self) -> QueueSettings {
        self.settings
    }

    /// Number of payloads routed so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Number of payloads waiting for a worker.
    #[must_use]
    pub fn pending(&self) -> usize {
        match &*self.lock_state() {
            QueueState::Running { sender, .. } => sender.len(),
            QueueState::Idle | QueueState::Stopped => 0,
        }
    }

    /// Returns `true` while workers are accepting payloads.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*self.lock_state(), QueueState::Running { .. })
    }

    /// Spawns the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyStarted`] when running,
    /// [`QueueError::Stopped`] after [`CommandQueue::stop`], or
    /// [`QueueError::Spawn`] when a thread cannot be created. A failed start
    /// leaves the queue idle with no worker running.
    pub fn start(&self) -> Result<(), QueueError> {
        let mut state = self.lock_state();
        match &*state {
            QueueState::Running { .. } => return Err(QueueError::AlreadyStarted),
            QueueState::Stopped => return Err(QueueError::Stopped),
            QueueState::Idle => {}
        }

        let (sender, receiver) = match self.settings.capacity {
            Some(capacity) if capacity > 0 => crossbeam_channel::bounded(capacity),
            _ => crossbeam_channel::unbounded(),
        };

        let mut workers = Vec::with_capacity(self.settings.worker_count);
        for index in 1..=self.settings.worker_count {
            match self.spawn_worker(index, receiver.clone()) {
                Ok(worker) => workers.push(worker),
                Err(source) => {
                    drop(sender);
                    join_all(workers);
                    return Err(QueueError::Spawn {
                        source: Arc::new(source),
                    });
                }
            }
        }

        info!(
            target: QUEUE_TARGET,
            workers = workers.len(),
            capacity = ?self.settings.capacity,
            "command queue started"
        );
        *state = QueueState::Running { sender, workers };
        Ok(())
    }

    /// Queues `payload` for routing without waiting for it to be processed.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Stopped`] when the queue is not running and
    /// [`QueueError::Full`] when a bounded queue has no free slot.
    pub fn enqueue(&self, payload: impl Into<String>) -> Result<(), QueueError> {
        let state = self.lock_state();
        let QueueState::Running { sender, .. } = &*state else {
            return Err(QueueError::Stopped);
        };
        let payload = payload.into();
        let length = payload.len();
        match sender.try_send(payload) {
            Ok(()) => {
                debug!(target: QUEUE_TARGET, bytes = length, "command enqueued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.settings.capacity.unwrap_or_default(),
            }),
            Err(TrySendError::Disconnected(_)) => Err(QueueError::Stopped),
        }
    }

    /// Closes the intake, drains queued payloads and joins every worker.
    ///
    /// Calling `stop` more than once, or before `start`, is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::WorkerPanicked`] when a worker thread died by
    /// panicking. The remaining workers are still joined.
    pub fn stop(&self) -> Result<(), QueueError> {
        let previous = mem::replace(&mut *self.lock_state(), QueueState::Stopped);
        let QueueState::Running { sender, workers } = previous else {
            return Ok(());
        };

        drop(sender);
        let panicked = join_all(workers);
        info!(
            target: QUEUE_TARGET,
            processed = self.processed(),
            "command queue stopped"
        );
        if panicked > 0 {
            return Err(QueueError::WorkerPanicked { count: panicked });
        }
        Ok(())
    }

    fn spawn_worker(&self, index: usize, receiver: Receiver<String>) -> io::Result<JoinHandle<()>> {
        let name = format!("prism-worker-{index}");
        let worker = Worker {
            name: name.clone(),
            receiver,
            dispatcher: Arc::clone(&self.dispatcher),
            handler: Arc::clone(&self.handler),
            processed: Arc::clone(&self.processed),
        };
        thread::Builder::new().name(name).spawn(move || worker.run())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(target: QUEUE_TARGET, %error, "command queue stopped uncleanly");
        }
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("settings", &self.settings)
            .field("processed", &self.processed())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

struct Worker {
    name: String,
    receiver: Receiver<String>,
    dispatcher: Arc<Dispatcher>,
    handler: Arc<dyn ResponseHandler>,
    processed: Arc<AtomicUsize>,
}

impl Worker {
    fn run(self) {
        debug!(target: QUEUE_TARGET, worker = %self.name, "worker started");
        // The iterator ends once the intake is closed and drained.
        for payload in &self.receiver {
            debug!(
                target: QUEUE_TARGET,
                worker = %self.name,
                payload = %payload,
                "processing command"
            );
            let outcome = self.dispatcher.route(&payload);
            self.processed.fetch_add(1, Ordering::SeqCst);
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                self.handler.handle(&payload, &outcome);
            }));
            if let Err(payload) = delivered {
                error!(
                    target: QUEUE_TARGET,
                    worker = %self.name,
                    panic = %describe_panic(payload.as_ref()),
                    "response handler panicked"
                );
            }
        }
        debug!(target: QUEUE_TARGET, worker = %self.name, "worker stopped");
    }
}

/// Joins every worker, returning how many panicked.
fn join_all(workers: Vec<JoinHandle<()>>) -> usize {
    workers
        .into_iter()
        .map(JoinHandle::join)
        .filter(Result::is_err)
        .count()
}
