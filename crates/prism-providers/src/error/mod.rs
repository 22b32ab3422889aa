//! Error taxonomy shared by every layer of the gateway.
//!
//! A [`CommandError`] pairs a closed [`ErrorKind`] with a human-readable
//! message. It is the only error value that crosses component boundaries:
//! providers, the schema validator, middleware and the dispatcher all convert
//! their local failures into it. Callers that need a wire representation use
//! [`CommandError::envelope`], which serialises to
//! `{"error": {"code": <integer>, "message": <string>}}`.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Closed set of failure categories reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed, unparseable, or schema-rejected command.
    InvalidCommand,
    /// Action outside the supported enumeration.
    UnknownAction,
    /// No provider is registered for the addressed target.
    UnknownTarget,
    /// A provider could not be constructed.
    AdapterInitializationFailed,
    /// A provider failed at runtime or rejected the action/property pair.
    AdapterExecutionFailed,
    /// Anything the other kinds do not describe.
    InternalError,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 6] = [
        Self::InvalidCommand,
        Self::UnknownAction,
        Self::UnknownTarget,
        Self::AdapterInitializationFailed,
        Self::AdapterExecutionFailed,
        Self::InternalError,
    ];

    /// Numeric tag carried in error envelopes.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::InvalidCommand => 1001,
            Self::UnknownAction => 1002,
            Self::UnknownTarget => 1003,
            Self::AdapterInitializationFailed => 1004,
            Self::AdapterExecutionFailed => 1005,
            Self::InternalError => 1006,
        }
    }

    /// Resolves a numeric tag back to its kind.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Returns the canonical snake-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCommand => "invalid_command",
            Self::UnknownAction => "unknown_action",
            Self::UnknownTarget => "unknown_target",
            Self::AdapterInitializationFailed => "adapter_initialization_failed",
            Self::AdapterExecutionFailed => "adapter_execution_failed",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform error value returned in place of a command result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} ({code}): {message}", code = .kind.code())]
pub struct CommandError {
    kind: ErrorKind,
    message: String,
}

impl CommandError {
    /// Builds an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an [`ErrorKind::InvalidCommand`] error.
    #[must_use]
    pub fn invalid_command(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCommand, message)
    }

    /// Creates an [`ErrorKind::UnknownAction`] error.
    #[must_use]
    pub fn unknown_action(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction, message)
    }

    /// Creates an [`ErrorKind::UnknownTarget`] error.
    #[must_use]
    pub fn unknown_target(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownTarget, message)
    }

    /// Creates an [`ErrorKind::AdapterInitializationFailed`] error.
    #[must_use]
    pub fn initialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AdapterInitializationFailed, message)
    }

    /// Creates an [`ErrorKind::AdapterExecutionFailed`] error.
    #[must_use]
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AdapterExecutionFailed, message)
    }

    /// Creates an [`ErrorKind::InternalError`] error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Numeric tag of the failure category.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Wire representation of this error.
    #[must_use]
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.message.clone(),
            },
        }
    }

    /// Wire representation as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        // String keys and plain fields only; serialisation cannot fail.
        serde_json::to_value(self.envelope()).unwrap_or(serde_json::Value::Null)
    }
}

/// Serialisable `{"error": {...}}` wrapper returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    /// Error payload.
    pub error: ErrorBody,
}

/// Payload of an [`ErrorEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Numeric [`ErrorKind`] tag.
    pub code: u16,
    /// Human-readable description.
    pub message: String,
}

/// Extracts a readable message from a caught panic payload.
#[must_use]
pub fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
