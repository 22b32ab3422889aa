//! Provider registry: one provider instance per target.
//!
//! [`ProviderRegistry::load`] builds every provider named in a
//! [`RegistryConfig`] through a [`ProviderCatalog`]. Failures are isolated per
//! target: an unknown kind, a failing constructor, incompatible parameters or
//! a malformed entry leaves that target out of the registry, is logged as
//! `AdapterInitializationFailed`, and is kept in
//! [`ProviderRegistry::failures`]. Partial success is the normal outcome of a
//! load.

mod catalog;
mod config;

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, info};

use crate::capability::Provider;
use crate::error::{CommandError, describe_panic};

pub use self::catalog::{ProviderCatalog, ProviderFactory, decode_params};
pub use self::config::{
    InvalidRegistration, ProviderRegistration, RegistryConfig, RegistryConfigError,
};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_CRATE_NAME"), "::registry");

/// Target that could not be brought up during a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    /// Target left out of the registry.
    pub target: String,
    /// Initialisation error, always `AdapterInitializationFailed`.
    pub error: CommandError,
}

/// Provider whose teardown failed during [`ProviderRegistry::cleanup_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    /// Target whose provider failed.
    pub target: String,
    /// Teardown error, always `AdapterExecutionFailed`.
    pub error: CommandError,
}

/// Mapping from target name to its provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    failures: Vec<RegistrationFailure>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the providers described by `config`.
    #[must_use]
    pub fn load(catalog: &ProviderCatalog, config: &RegistryConfig) -> Self {
        let mut registry = Self::new();

        for invalid in config.invalid() {
            registry.record_failure(
                &invalid.target,
                CommandError::initialization_failed(format!(
                    "malformed registration for '{}': {}",
                    invalid.target, invalid.message
                )),
            );
        }

        for registration in config.registrations() {
            if registry.contains(&registration.target) {
                registry.record_failure(
                    &registration.target,
                    CommandError::initialization_failed(format!(
                        "target '{}' is already registered",
                        registration.target
                    )),
                );
                continue;
            }
            match construct(catalog, registration) {
                Ok(provider) => {
                    info!(
                        target: REGISTRY_TARGET,
                        target_name = %registration.target,
                        kind = %registration.provider_kind,
                        "provider loaded"
                    );
                    registry
                        .providers
                        .insert(registration.target.clone(), provider);
                }
                Err(error) => registry.record_failure(&registration.target, error),
            }
        }

        registry
    }

    /// Adds a provider built outside the catalogue.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterInitializationFailed` error when `target` already
    /// has a provider.
    pub fn insert(
        &mut self,
        target: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<(), CommandError> {
        let target = target.into();
        if self.providers.contains_key(&target) {
            return Err(CommandError::initialization_failed(format!(
                "target '{target}' is already registered"
            )));
        }
        self.providers.insert(target, provider);
        Ok(())
    }

    /// Looks up the provider for `target`.
    #[must_use]
    pub fn get(&self, target: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(target)
    }

    /// Returns `true` when `target` has a provider.
    #[must_use]
    pub fn contains(&self, target: &str) -> bool {
        self.providers.contains_key(target)
    }

    /// Registered targets in lexical order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Shared handles to every provider, for background readers.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn Provider>)> {
        self.providers
            .iter()
            .map(|(target, provider)| (target.clone(), Arc::clone(provider)))
            .collect()
    }

    /// Targets that failed to load.
    #[must_use]
    pub fn failures(&self) -> &[RegistrationFailure] {
        &self.failures
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` when no provider loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Runs every provider's teardown.
    ///
    /// A failing or panicking teardown is logged as `AdapterExecutionFailed`
    /// and does not stop the remaining providers from being cleaned up. The
    /// collected failures are returned for inspection.
    pub fn cleanup_all(&self) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();
        for (target, provider) in &self.providers {
            match guarded(|| provider.cleanup()) {
                Ok(()) => info!(
                    target: REGISTRY_TARGET,
                    target_name = %target,
                    "provider cleaned up"
                ),
                Err(cause) => {
                    let error = CommandError::execution_failed(format!(
                        "error during cleanup of provider '{target}': {}",
                        cause.message()
                    ));
                    error!(
                        target: REGISTRY_TARGET,
                        target_name = %target,
                        code = error.code(),
                        error_message = error.message(),
                        "provider cleanup failed"
                    );
                    failures.push(CleanupFailure {
                        target: target.clone(),
                        error,
                    });
                }
            }
        }
        failures
    }

    fn record_failure(&mut self, target: &str, error: CommandError) {
        error!(
            target: REGISTRY_TARGET,
            target_name = %target,
            code = error.code(),
            error_message = error.message(),
            "provider initialisation failed"
        );
        self.failures.push(RegistrationFailure {
            target: target.to_owned(),
            error,
        });
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("targets", &self.providers.keys().collect::<Vec<_>>())
            .field("failures", &self.failures)
            .finish()
    }
}

/// Builds one provider, converting every failure to an initialisation error.
fn construct(
    catalog: &ProviderCatalog,
    registration: &ProviderRegistration,
) -> Result<Arc<dyn Provider>, CommandError> {
    guarded(|| catalog.build(&registration.provider_kind, &registration.params)).map_err(|cause| {
        CommandError::initialization_failed(format!(
            "failed to initialise provider '{}' ({}): {}",
            registration.target,
            registration.provider_kind,
            cause.message()
        ))
    })
}

/// Runs provider code, turning a panic into an internal error.
fn guarded<T>(call: impl FnOnce() -> Result<T, CommandError>) -> Result<T, CommandError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(CommandError::internal(describe_panic(payload.as_ref()))))
}
