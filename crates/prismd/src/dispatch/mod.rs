//! Command dispatch: schema validation, middleware and provider routing.
//!
//! A raw command travels through [`Dispatcher::route`], which validates it
//! against the [`SchemaRegistry`], pipes it through the registered
//! [`Middleware`] in order, checks the action, and hands it to the provider
//! registered for its target. The outcome is either the provider's JSON
//! result or a [`prism_providers::CommandError`], rendered on the wire as:
//!
//! ```json
//! {"error": {"code": 1003, "message": "no provider found for target: garage_door"}}
//! ```

mod middleware;
mod router;
mod schema;

pub use self::middleware::{LoggingMiddleware, Middleware};
pub use self::router::Dispatcher;
pub use self::schema::{
    NO_SCHEMA_MESSAGE, SchemaError, SchemaRegistry, ValidationResult, pinned_schema, schema_key,
};
