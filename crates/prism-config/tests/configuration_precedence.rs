//! Layer precedence for gateway configuration: defaults < file < env < CLI.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use prism_config::{Config, LogFormat, default_log_filter, default_providers_path};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Serialises environment access and restores overridden variables on drop.
struct EnvScope {
    overrides: Vec<(&'static str, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvScope {
    fn new() -> Self {
        let guard = ENV_MUTEX
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Self {
            overrides: Vec::new(),
            _guard: guard,
        }
    }

    fn set(&mut self, key: &'static str, value: impl AsRef<OsStr>) {
        let previous = std::env::var_os(key);
        // Environment mutation is `unsafe` in edition 2024; the scope holds
        // the mutex and restores the previous value in `Drop`.
        unsafe { std::env::set_var(key, value) };
        self.overrides.push((key, previous));
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        while let Some((key, previous)) = self.overrides.pop() {
            match previous {
                Some(value) => unsafe { std::env::set_var(key, value) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }
}

struct Harness {
    temp_dir: TempDir,
    args: Vec<OsString>,
}

impl Harness {
    fn write_config(&mut self, contents: &str) {
        let path = self.temp_dir.path().join("prism.toml");
        fs::write(&path, contents).expect("write configuration file");
        self.args.push(OsString::from("--config-path"));
        self.args.push(path.into_os_string());
    }

    fn push_arg(&mut self, arg: &str) {
        self.args.push(OsString::from(arg));
    }

    fn load(&self) -> Config {
        Config::load_from_iter(self.args.clone()).expect("configuration should load")
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        temp_dir: TempDir::new().expect("create temporary directory"),
        args: vec![OsString::from("prismd")],
    }
}

#[rstest]
fn defaults_apply_without_overrides(harness: Harness) {
    let _env = EnvScope::new();
    let config = harness.load();

    assert_eq!(config.providers_path, default_providers_path());
    assert_eq!(config.worker_count(), 2);
    assert_eq!(config.queue_capacity(), None);
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), LogFormat::Json);
}

#[rstest]
fn file_overrides_defaults(mut harness: Harness) {
    let _env = EnvScope::new();
    harness.write_config("worker_count = 4\nlog_format = \"compact\"\n");

    let config = harness.load();

    assert_eq!(config.worker_count(), 4);
    assert_eq!(config.log_format(), LogFormat::Compact);
}

#[rstest]
fn environment_overrides_file(mut harness: Harness) {
    let mut env = EnvScope::new();
    harness.write_config("worker_count = 4\n");
    env.set("PRISM_WORKER_COUNT", "6");

    let config = harness.load();

    assert_eq!(config.worker_count(), 6);
}

#[rstest]
fn cli_overrides_environment(mut harness: Harness) {
    let mut env = EnvScope::new();
    env.set("PRISM_HEALTH_INTERVAL_SECS", "30");
    harness.push_arg("--health-interval-secs");
    harness.push_arg("5");

    let config = harness.load();

    assert_eq!(config.health_interval_secs, 5);
}
