//! Domain error types
//!
//! [`ErrorKind`] is the complete taxonomy of reasons a diagnostic value can be
//! missing. Providers never propagate failures; they convert them into one of
//! these kinds and store it in the result map in place of the value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an annotation or attachment has no value
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The source responded but did not include the field
    #[error("missing value")]
    MissingValue,

    /// The collection deadline elapsed before the source answered
    #[error("timeout")]
    Timeout,

    /// The source was unreachable, absent or closed the connection
    #[error("connection error")]
    ConnectionError,

    /// The value was explicitly left unconfigured
    #[error("not set")]
    NotSet,

    /// Caller-supplied error, e.g. when a cached value is invalidated
    #[error("custom error")]
    Custom,
}

impl ErrorKind {
    /// Short stable name used in snapshot metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingValue => "missing_value",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::NotSet => "not_set",
            ErrorKind::Custom => "custom",
        }
    }
}
