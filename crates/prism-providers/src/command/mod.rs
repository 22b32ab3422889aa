//! Command model addressed to gateway targets.
//!
//! A [`Command`] is an owned JSON object carrying at least `action` and
//! `target`, plus action-specific fields such as `property` and `value`.
//! Commands are never mutated in place: transforms build a new value through
//! [`Command::with_field`]. The [`Action`] enumeration is parsed separately
//! from schema validation so that a schema may admit an action the gateway
//! does not dispatch.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CommandError;

/// Field carrying the command action.
pub const ACTION_FIELD: &str = "action";
/// Field carrying the addressed target.
pub const TARGET_FIELD: &str = "target";
/// Field naming the property the action applies to.
pub const PROPERTY_FIELD: &str = "property";
/// Optional field carrying the requested value.
pub const VALUE_FIELD: &str = "value";

/// Actions understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a property.
    Observe,
    /// Drive an actuator to a value.
    Actuate,
    /// Tune a runtime parameter.
    Parameterize,
    /// Change persistent configuration.
    Configure,
    /// Associate two targets.
    Link,
}

impl Action {
    /// Parses the wire spelling of an action.
    ///
    /// Matching is exact: only the upper-case names are accepted.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::UnknownAction`](crate::ErrorKind::UnknownAction)
    /// error for any other value.
    pub fn parse(value: &str) -> Result<Self, CommandError> {
        match value {
            "OBSERVE" => Ok(Self::Observe),
            "ACTUATE" => Ok(Self::Actuate),
            "PARAMETERIZE" => Ok(Self::Parameterize),
            "CONFIGURE" => Ok(Self::Configure),
            "LINK" => Ok(Self::Link),
            other => Err(CommandError::unknown_action(format!(
                "invalid action: {other}"
            ))),
        }
    }

    /// Returns the wire spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Observe => "OBSERVE",
            Self::Actuate => "ACTUATE",
            Self::Parameterize => "PARAMETERIZE",
            Self::Configure => "CONFIGURE",
            Self::Link => "LINK",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured command addressed to a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Command {
    fields: Map<String, Value>,
}

impl Command {
    /// Parses raw command text.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidCommand`](crate::ErrorKind::InvalidCommand)
    /// error when the text is not JSON or is not a JSON object.
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|error| CommandError::invalid_command(format!("invalid JSON command: {error}")))?;
        Self::from_value(value)
    }

    /// Wraps an already-decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::InvalidCommand`](crate::ErrorKind::InvalidCommand)
    /// error when the document is not an object.
    pub fn from_value(value: Value) -> Result<Self, CommandError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(CommandError::invalid_command("command must be a JSON object")),
        }
    }

    /// Builds a command from its conventional fields.
    #[must_use]
    pub fn new(action: &str, target: &str, property: &str, value: Option<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(ACTION_FIELD.to_owned(), Value::from(action));
        fields.insert(TARGET_FIELD.to_owned(), Value::from(target));
        fields.insert(PROPERTY_FIELD.to_owned(), Value::from(property));
        if let Some(value) = value {
            fields.insert(VALUE_FIELD.to_owned(), value);
        }
        Self { fields }
    }

    /// Returns a new command with `name` set to `value`.
    #[must_use]
    pub fn with_field(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(name.into(), value.into());
        Self { fields }
    }

    /// Raw `action` field when it is a string.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.str_field(ACTION_FIELD)
    }

    /// Raw `target` field when it is a string.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.str_field(TARGET_FIELD)
    }

    /// Raw `property` field when it is a string.
    #[must_use]
    pub fn property(&self) -> Option<&str> {
        self.str_field(PROPERTY_FIELD)
    }

    /// The optional `value` field, whatever its JSON type.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.fields.get(VALUE_FIELD)
    }

    /// Looks up any field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// All fields of the command.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.fields) {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str("<unserialisable command>"),
        }
    }
}

#[cfg(test)]
mod tests;
