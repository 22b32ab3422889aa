//! Capability interface implemented by every provider.
//!
//! A provider owns the device-specific behaviour for one target. The only
//! mandatory capability is [`Provider::execute`]. Teardown is a defaulted
//! method so stateless providers need not implement it, and health reporting
//! is an optional secondary interface discovered through
//! [`Provider::health`] rather than by probing for methods at runtime.
//!
//! Providers are invoked concurrently through `&self` by the command queue
//! workers; the dispatcher applies no per-target locking, so implementations
//! that hold mutable state must serialise access internally.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;
use crate::error::CommandError;

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Behaviour bound to a single gateway target.
///
/// # Example
///
/// ```
/// use prism_providers::{Command, CommandError, Provider};
/// use serde_json::{Value, json};
///
/// struct Doorbell;
///
/// impl Provider for Doorbell {
///     fn execute(&self, command: &Command) -> Result<Value, CommandError> {
///         match (command.action(), command.property()) {
///             (Some("OBSERVE"), Some("pressed")) => Ok(json!({"pressed": false})),
///             _ => Err(CommandError::execution_failed("unsupported command")),
///         }
///     }
/// }
///
/// let command = Command::new("OBSERVE", "doorbell", "pressed", None);
/// assert_eq!(Doorbell.execute(&command).unwrap(), json!({"pressed": false}));
/// assert!(Doorbell.health().is_none());
/// ```
pub trait Provider: Send + Sync {
    /// Executes a validated command.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::AdapterExecutionFailed`](crate::ErrorKind::AdapterExecutionFailed)
    /// error for unsupported action/property combinations or device faults.
    fn execute(&self, command: &Command) -> Result<Value, CommandError>;

    /// Releases any resources held by the provider.
    ///
    /// Implementations must tolerate repeated calls.
    ///
    /// # Errors
    ///
    /// Returns an error when teardown fails; callers log it and carry on.
    fn cleanup(&self) -> Result<(), CommandError> {
        Ok(())
    }

    /// Returns the health-check capability when the provider supports it.
    fn health(&self) -> Option<&dyn HealthCheck> {
        None
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Optional capability reporting provider health.
pub trait HealthCheck: Send + Sync {
    /// Checks the health of the provider.
    ///
    /// # Errors
    ///
    /// Returns an error when the check itself fails; the health monitor
    /// records it as an `error` state.
    fn health_check(&self) -> Result<ProviderHealth, CommandError>;
}

/// Coarse health state recorded per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// The provider is usable.
    Ok,
    /// The provider, or its health check, failed.
    Error,
}

impl HealthState {
    /// Wire spelling of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Result of a successful health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Reported state.
    pub state: HealthState,
    /// Optional free-form detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderHealth {
    /// Healthy report without detail.
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            state: HealthState::Ok,
            detail: None,
        }
    }

    /// Healthy report with detail.
    #[must_use]
    pub fn ok_with(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Ok,
            detail: Some(detail.into()),
        }
    }

    /// Unhealthy report with detail.
    #[must_use]
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            state: HealthState::Error,
            detail: Some(detail.into()),
        }
    }
}
