//! Command model, provider contract and provider registry for Prism.
//!
//! The `prism-providers` crate holds everything a capability provider needs
//! to plug into the gateway, independent of the daemon that routes commands
//! to it:
//!
//! - [`CommandError`] and [`ErrorKind`], the error taxonomy shared by every
//!   component, with its stable numeric codes and JSON envelope.
//! - [`Command`] and [`Action`], the structured command model.
//! - [`Provider`] and the optional [`HealthCheck`] capability.
//! - [`ProviderCatalog`], [`RegistryConfig`] and [`ProviderRegistry`], which
//!   turn the declarative provider table into live provider instances.
//! - [`builtin`], simulated providers registered under their configuration
//!   module names.
//!
//! # Example
//!
//! ```
//! use prism_providers::{ProviderRegistry, RegistryConfig, builtin};
//!
//! let config = RegistryConfig::from_json_str(
//!     r#"{"motion_sensor_1": {"module": "motion_sensor_adapter", "params": {"pin": 17}}}"#,
//! )
//! .expect("valid provider table");
//!
//! let registry = ProviderRegistry::load(&builtin::catalog(), &config);
//! assert!(registry.get("motion_sensor_1").is_some());
//! ```

pub mod builtin;
pub mod capability;
pub mod command;
pub mod error;
pub mod registry;

pub use self::capability::{HealthCheck, HealthState, Provider, ProviderHealth};
pub use self::command::{Action, Command};
pub use self::error::{CommandError, ErrorBody, ErrorEnvelope, ErrorKind, describe_panic};
pub use self::registry::{
    CleanupFailure, InvalidRegistration, ProviderCatalog, ProviderFactory, ProviderRegistration,
    ProviderRegistry, RegistrationFailure, RegistryConfig, RegistryConfigError, decode_params,
};
