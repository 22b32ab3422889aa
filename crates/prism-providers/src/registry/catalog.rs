//! Startup-time table from provider kind to constructor.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::capability::Provider;
use crate::error::CommandError;

/// Constructor invoked with a registration's parameters.
pub type ProviderFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn Provider>, CommandError> + Send + Sync>;

/// Maps provider kinds named in configuration to their constructors.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use prism_providers::{Command, CommandError, Provider, ProviderCatalog};
/// use serde_json::Value;
///
/// struct Null;
/// impl Provider for Null {
///     fn execute(&self, _command: &Command) -> Result<Value, CommandError> {
///         Ok(Value::Null)
///     }
/// }
///
/// let mut catalog = ProviderCatalog::new();
/// catalog.register("null_adapter", |_params| Ok(Arc::new(Null) as Arc<dyn Provider>));
/// assert!(catalog.contains("null_adapter"));
/// ```
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers, or replaces, the constructor for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn Provider>, CommandError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    /// Returns `true` when `kind` has a constructor.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds in lexical order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Constructs a provider of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::AdapterInitializationFailed`](crate::ErrorKind::AdapterInitializationFailed)
    /// error when the kind is unknown or its constructor fails.
    pub fn build(
        &self,
        kind: &str,
        params: &Map<String, Value>,
    ) -> Result<Arc<dyn Provider>, CommandError> {
        let factory = self.factories.get(kind).ok_or_else(|| {
            CommandError::initialization_failed(format!("unknown provider kind '{kind}'"))
        })?;
        factory(params)
    }
}

impl fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

/// Decodes constructor parameters into a typed struct.
///
/// # Errors
///
/// Returns an [`ErrorKind::AdapterInitializationFailed`](crate::ErrorKind::AdapterInitializationFailed)
/// error naming `kind` when the parameters do not match `T`.
pub fn decode_params<T>(kind: &str, params: &Map<String, Value>) -> Result<T, CommandError>
where
    T: DeserializeOwned,
{
    serde_json::from_value(Value::Object(params.clone())).map_err(|error| {
        CommandError::initialization_failed(format!("incompatible parameters for {kind}: {error}"))
    })
}
