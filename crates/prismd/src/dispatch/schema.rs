//! Structural validation of commands against per-target schemas.
//!
//! Each schema is selected by a key derived from the command itself:
//! `"<action>_<target>"`, with the literal `value` appended for `ACTUATE`
//! commands. Schemas are JSON Schema draft-7 documents compiled once when
//! registered.
//!
//! Every violation is collected. Messages are ordered by the instance path
//! they point at, so object-level problems (missing or unexpected fields)
//! come before problems with an individual field.

use std::collections::BTreeMap;

use jsonschema::{Draft, JSONSchema};
use serde_json::{Value, json};
use thiserror::Error;

use prism_providers::command::{ACTION_FIELD, PROPERTY_FIELD, TARGET_FIELD, VALUE_FIELD};
use prism_providers::{Action, Command};

/// Message returned when no schema matches a command's key.
pub const NO_SCHEMA_MESSAGE: &str = "no schema defined for this command";

/// Errors raised while registering a schema.
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// The document is not a valid draft-7 schema.
    #[error("invalid schema for '{key}': {reason}")]
    Invalid {
        /// Key the schema was registered under.
        key: String,
        /// Compiler message.
        reason: String,
    },
}

/// Outcome of validating one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    is_valid: bool,
    errors: Vec<String>,
}

impl ValidationResult {
    /// Successful validation.
    #[must_use]
    pub const fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    /// Failed validation with the collected messages.
    #[must_use]
    pub const fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }

    /// Returns `true` when the command satisfied its schema.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Violation messages in reporting order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Violation messages joined with `"; "`.
    #[must_use]
    pub fn message(&self) -> String {
        self.errors.join("; ")
    }
}

/// Targets served by the built-in providers: action, target, property and,
/// for actuations, the permitted value.
const BUILTIN_SCHEMAS: &[(&str, &str, &str, Option<&str>)] = &[
    ("OBSERVE", "motion_sensor_1", "motion_detected", None),
    ("ACTUATE", "living_room_light", "state", Some("ON")),
    ("ACTUATE", "living_room_light", "state", Some("OFF")),
    ("OBSERVE", "temperature_sensor_1", "current_temperature", None),
    ("OBSERVE", "humidity_sensor_1", "current_humidity", None),
];

/// Draft-7 schema pinning `action`, `target` and `property` (and `value`
/// when given) to a single string each. Undeclared fields are rejected.
#[must_use]
pub fn pinned_schema(action: &str, target: &str, property: &str, value: Option<&str>) -> Value {
    let mut schema = json!({
        "type": "object",
        "properties": {
            ACTION_FIELD: {"type": "string", "enum": [action]},
            TARGET_FIELD: {"type": "string", "enum": [target]},
            PROPERTY_FIELD: {"type": "string", "enum": [property]},
        },
        "required": [ACTION_FIELD, TARGET_FIELD, PROPERTY_FIELD],
        "additionalProperties": false,
    });
    if let Some(value) = value {
        schema["properties"][VALUE_FIELD] = json!({"type": "string", "enum": [value]});
        if let Some(required) = schema["required"].as_array_mut() {
            required.push(Value::from(VALUE_FIELD));
        }
    }
    schema
}

/// Compiled schemas keyed by command key, fixed once routing starts.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, JSONSchema>,
}

impl SchemaRegistry {
    /// Registry without any schema; every command is rejected.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the schemas of the built-in targets.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] if a built-in schema fails to compile.
    pub fn builtin() -> Result<Self, SchemaError> {
        BUILTIN_SCHEMAS
            .iter()
            .try_fold(Self::empty(), |registry, &(action, target, property, value)| {
                let key = match value {
                    Some(value) => format!("{action}_{target}_{value}"),
                    None => format!("{action}_{target}"),
                };
                registry.with_schema(key, &pinned_schema(action, target, property, value))
            })
    }

    /// Compiles `schema` and adds, or replaces, it under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Invalid`] when `schema` is not a valid draft-7
    /// document.
    pub fn with_schema(
        mut self,
        key: impl Into<String>,
        schema: &Value,
    ) -> Result<Self, SchemaError> {
        let key = key.into();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(schema)
            .map_err(|error| SchemaError::Invalid {
                key: key.clone(),
                reason: error.to_string(),
            })?;
        self.schemas.insert(key, compiled);
        Ok(self)
    }

    /// Returns `true` when a schema is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.schemas.contains_key(key)
    }

    /// Registered keys in lexical order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` when no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Validates `command` against the schema selected by its key.
    #[must_use]
    pub fn validate(&self, command: &Command) -> ValidationResult {
        let Some(schema) = self.schemas.get(&schema_key(command)) else {
            return ValidationResult::invalid(vec![NO_SCHEMA_MESSAGE.to_owned()]);
        };
        let instance = Value::Object(command.fields().clone());
        let Err(errors) = schema.validate(&instance) else {
            return ValidationResult::valid();
        };
        let mut located: Vec<(String, String)> = errors
            .map(|error| {
                (
                    error.instance_path.to_string(),
                    error.to_string().replace('\n', " "),
                )
            })
            .collect();
        located.sort_by(|left, right| left.0.cmp(&right.0));
        ValidationResult::invalid(located.into_iter().map(|(_, message)| message).collect())
    }
}

/// Derives the schema key of `command`.
///
/// The literal value is part of the key for `ACTUATE` commands, so every
/// permitted value needs its own schema.
#[must_use]
pub fn schema_key(command: &Command) -> String {
    let action = key_part(command.get(ACTION_FIELD));
    let target = key_part(command.get(TARGET_FIELD));
    if command.action() == Some(Action::Actuate.as_str()) {
        format!("{action}_{target}_{}", key_part(command.value()))
    } else {
        format!("{action}_{target}")
    }
}

fn key_part(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::from("null"),
    }
}
