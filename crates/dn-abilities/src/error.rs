//! Error types for the ability bridge

use dn_core::OperationError;
use serde_json::{json, Value};

/// Ability invocation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbilityError {
    /// No ability registered under this name
    #[error("unknown ability: {0}")]
    UnknownAbility(String),

    /// Name registered twice
    #[error("ability already registered: {0}")]
    Duplicate(String),

    /// Input or output schema could not be compiled
    #[error("invalid schema for {name}: {reason}")]
    Schema {
        /// Ability name
        name: String,
        /// Compiler message
        reason: String,
    },

    /// Input rejected by the ability's JSON schema
    #[error("input rejected: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    /// Result rejected by the ability's output schema
    #[error("output of {name} rejected: {}", .reasons.join("; "))]
    InvalidOutput {
        /// Ability name
        name: String,
        /// Validator messages
        reasons: Vec<String>,
    },

    /// Permission predicate returned false
    #[error("permission denied for {0}")]
    Forbidden(String),

    /// The shared operation failed
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl AbilityError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAbility(_) => "unknown_ability",
            Self::Duplicate(_) | Self::Schema { .. } => "registry_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidOutput { .. } => "invalid_output",
            Self::Forbidden(_) => "forbidden",
            Self::Operation(err) => err.code(),
        }
    }

    /// HTTP status equivalent
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::UnknownAbility(_) => 404,
            Self::Duplicate(_) | Self::Schema { .. } | Self::InvalidOutput { .. } => 500,
            Self::InvalidInput(_) => 400,
            Self::Forbidden(_) => 403,
            Self::Operation(err) => err.status(),
        }
    }

    /// `{ error, message }` body; conflicts add the current `etag`
    #[must_use]
    pub fn to_body(&self) -> Value {
        match self {
            Self::Operation(err) => err.to_body(),
            other => json!({ "error": other.code(), "message": other.to_string() }),
        }
    }
}
