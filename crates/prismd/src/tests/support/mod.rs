//! Test harness utilities shared by the gateway suites.

mod captured_log;
mod config_loader;
mod reporter;

pub use captured_log::CapturedLog;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
