//! Record error types

use thiserror::Error;

/// Errors from record construction and formatting
#[derive(Debug, Error)]
pub enum RecordError {
    /// String does not name a known entry kind
    #[error("unknown entry kind: {0}")]
    UnknownKind(String),

    /// JSON encoding failed
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}
