//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use prism_config::Config;
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Provider table covering every built-in kind plus one broken entry.
pub const PROVIDERS: &str = r#"{
    "motion_sensor_1": {"module": "motion_sensor_adapter", "params": {"pin": 17}},
    "temperature_sensor_1": {"module": "temperature_adapter"},
    "humidity_sensor_1": {"module": "humidity_sensor_adapter", "params": {"bus": 1, "address": "0x40"}},
    "living_room_light": {"module": "light_adapter"},
    "dummy_adapter": {"module": "dummy_adapter"},
    "garage_door": {"module": "garage_door_adapter"}
}"#;

/// Loader that writes a provider table under a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    worker_count: usize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::with_providers(PROVIDERS)
    }

    #[must_use]
    pub fn with_providers(table: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for providers");
        fs::write(dir.path().join("providers.json"), table).expect("write provider table");
        Self {
            dir,
            worker_count: 2,
        }
    }

    /// Loader whose provider table does not exist.
    #[must_use]
    pub fn without_providers() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temporary directory for providers"),
            worker_count: 2,
        }
    }

    #[must_use]
    pub fn workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    fn providers_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("providers.json"))
            .expect("temporary provider path was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            providers_path: self.providers_path(),
            worker_count: self.worker_count,
            log_filter: String::from("warn"),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("prismd"),
            OsString::from("--worker-count"),
            OsString::from("several"),
        ];
        Config::load_from_iter(args)
    }
}
