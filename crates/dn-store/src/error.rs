//! Error types for the store boundary

/// Errors raised by a document store implementation
///
/// Business outcomes (missing document, precondition mismatch) are not
/// errors at this layer; they travel inside [`crate::StoreReply`] or
/// [`crate::TitleWrite`]. These variants mean the store itself misbehaved.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached or refused the call
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend returned data that could not be encoded or decoded
    #[error("malformed store data: {0}")]
    Malformed(String),

    /// Request was rejected before reaching the backend
    #[error("invalid store request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
