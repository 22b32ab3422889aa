//! Declarative provider table read once at startup.
//!
//! The table is a JSON object keyed by target name:
//!
//! ```json
//! {
//!   "motion_sensor_1": { "module": "motion_sensor_adapter", "params": { "pin": 17 } },
//!   "living_room_light": { "module": "light_adapter" }
//! }
//! ```
//!
//! Only a file that cannot be read or is not a JSON object is fatal. A
//! malformed entry is kept as an [`InvalidRegistration`] so the registry can
//! report it per target while loading the rest.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that prevent the provider table from being read at all.
#[derive(Debug, Error)]
pub enum RegistryConfigError {
    /// The file could not be read.
    #[error("failed to read provider configuration '{path}': {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The document is not valid JSON.
    #[error("provider configuration is not valid JSON: {source}")]
    Parse {
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The document is valid JSON but not an object.
    #[error("provider configuration must be a JSON object keyed by target")]
    NotAnObject,
}

/// How to construct the provider for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRegistration {
    /// Target name commands address.
    pub target: String,
    /// Catalogue key of the provider constructor.
    pub provider_kind: String,
    /// Constructor parameters.
    pub params: Map<String, Value>,
}

impl ProviderRegistration {
    /// Creates a registration.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        provider_kind: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self {
            target: target.into(),
            provider_kind: provider_kind.into(),
            params,
        }
    }
}

/// Entry whose shape did not match `{ "module": ..., "params": {...} }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRegistration {
    /// Target the entry was keyed under.
    pub target: String,
    /// Why the entry was rejected.
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    module: String,
    #[serde(default)]
    params: Map<String, Value>,
}

/// Parsed provider table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryConfig {
    registrations: Vec<ProviderRegistration>,
    invalid: Vec<InvalidRegistration>,
}

impl RegistryConfig {
    /// Builds a table from explicit registrations.
    #[must_use]
    pub const fn from_registrations(registrations: Vec<ProviderRegistration>) -> Self {
        Self {
            registrations,
            invalid: Vec::new(),
        }
    }

    /// Parses the JSON text of a provider table.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryConfigError::Parse`] for invalid JSON and
    /// [`RegistryConfigError::NotAnObject`] when the top level is not an
    /// object.
    pub fn from_json_str(text: &str) -> Result<Self, RegistryConfigError> {
        let document: Value = serde_json::from_str(text).map_err(|source| {
            RegistryConfigError::Parse {
                source: Arc::new(source),
            }
        })?;
        let Value::Object(entries) = document else {
            return Err(RegistryConfigError::NotAnObject);
        };

        let mut config = Self::default();
        for (target, entry) in entries {
            match serde_json::from_value::<RawEntry>(entry) {
                Ok(raw) => config.registrations.push(ProviderRegistration {
                    target,
                    provider_kind: raw.module,
                    params: raw.params,
                }),
                Err(error) => config.invalid.push(InvalidRegistration {
                    target,
                    message: error.to_string(),
                }),
            }
        }
        Ok(config)
    }

    /// Reads and parses a provider table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryConfigError::Read`] when the file cannot be read, or
    /// any error reported by [`RegistryConfig::from_json_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegistryConfigError::Read {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;
        Self::from_json_str(&text)
    }

    /// Well-formed registrations, in target order.
    #[must_use]
    pub fn registrations(&self) -> &[ProviderRegistration] {
        &self.registrations
    }

    /// Entries rejected while parsing.
    #[must_use]
    pub fn invalid(&self) -> &[InvalidRegistration] {
        &self.invalid
    }
}
