//! Error types for the operation set
//!
//! [`OperationError`] is what callers of either surface see. Generation
//! failures have their own [`GenerationError`] and are never converted into an
//! operation error: the orchestrator swallows them and falls back to the
//! heuristic.

use crate::phase::PhaseError;
use dn_artifact::{Cid, DocId};
use dn_store::StoreError;
use serde_json::{json, Value};

/// Caller-visible operation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Document absent
    #[error("document {0} not found")]
    NotFound(DocId),

    /// If-Match did not match the current CID
    #[error("If-Match did not match current CID {current}")]
    PreconditionFailed {
        /// Authoritative current CID
        current: Cid,
    },

    /// Permission predicate denied the actor
    #[error("forbidden")]
    Forbidden,

    /// Neither the provider nor the heuristic produced usable output
    #[error("no usable {0} generated")]
    EmptyOutput(&'static str),

    /// The store failed or replied with an unexpected shape
    #[error("upstream write failed: {0}")]
    UnknownError(String),

    /// Malformed request
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl OperationError {
    /// Stable machine-readable code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::Forbidden => "forbidden",
            Self::EmptyOutput(_) => "empty_output",
            Self::UnknownError(_) => "unknown_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// HTTP status equivalent
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::PreconditionFailed { .. } => 412,
            Self::Forbidden => 403,
            Self::EmptyOutput(_) => 422,
            Self::UnknownError(_) => 500,
            Self::InvalidInput(_) => 400,
        }
    }

    /// Current CID carried by a conflict
    #[inline]
    #[must_use]
    pub fn current_cid(&self) -> Option<&Cid> {
        match self {
            Self::PreconditionFailed { current } => Some(current),
            _ => None,
        }
    }

    /// Check if error is a write conflict
    #[inline]
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }

    /// `{ error, message }` body; conflicts add the current `etag`
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut body = json!({ "error": self.code(), "message": self.to_string() });
        if let Self::PreconditionFailed { current } = self {
            body["etag"] = Value::String(current.as_str().to_string());
        }
        body
    }
}

impl From<StoreError> for OperationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRequest(msg) => Self::InvalidInput(msg),
            other => Self::UnknownError(other.to_string()),
        }
    }
}

impl From<PhaseError> for OperationError {
    fn from(err: PhaseError) -> Self {
        Self::UnknownError(err.to_string())
    }
}

/// Generation provider failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// No provider configured
    #[error("generation provider unavailable")]
    Unavailable,

    /// The provider call failed
    #[error("generation failed: {0}")]
    Failed(String),

    /// The provider answered with something unusable
    #[error("unusable generation output: {0}")]
    Unusable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_line_up() {
        let cases = [
            (OperationError::NotFound(DocId(1)), "not_found", 404),
            (
                OperationError::PreconditionFailed {
                    current: Cid::new("x"),
                },
                "precondition_failed",
                412,
            ),
            (OperationError::Forbidden, "forbidden", 403),
            (OperationError::EmptyOutput("summary"), "empty_output", 422),
            (OperationError::UnknownError("x".into()), "unknown_error", 500),
            (OperationError::InvalidInput("x".into()), "invalid_input", 400),
        ];
        for (err, code, status) in cases {
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
            assert_eq!(err.to_body()["error"], code);
        }
    }

    #[test]
    fn conflict_body_carries_etag() {
        let err = OperationError::PreconditionFailed {
            current: Cid::new("def456"),
        };
        assert!(err.is_conflict());
        assert_eq!(err.current_cid(), Some(&Cid::new("def456")));
        assert_eq!(err.to_body()["etag"], "def456");
    }

    #[test]
    fn store_errors_map_to_unknown_or_invalid() {
        assert_eq!(
            OperationError::from(StoreError::InvalidRequest("bad".into())),
            OperationError::InvalidInput("bad".into())
        );
        assert!(matches!(
            OperationError::from(StoreError::Unavailable("down".into())),
            OperationError::UnknownError(_)
        ));
    }
}
