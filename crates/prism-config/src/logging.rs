use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output encodings understood by the gateway's tracing subscriber.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, flattened for log shippers.
    #[default]
    Json,
    /// Single-line human-readable events for interactive use.
    Compact,
}

impl LogFormat {
    /// Returns `true` when events are emitted as JSON.
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error produced when a [`LogFormat`] cannot be parsed from text.
pub type LogFormatParseError = strum::ParseError;
