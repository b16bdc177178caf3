//! Dispatch error types

use thiserror::Error;

/// Errors surfaced by dispatcher management operations
///
/// Delivery failures never appear here; they are routed through the
/// `on_sink_error` hook instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered sink carries the requested name
    #[error("unknown sink: {name}")]
    UnknownSink {
        /// Name that failed to match any registered sink
        name: String,
    },
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sink_display() {
        let err = DispatchError::UnknownSink {
            name: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "unknown sink: ghost");
    }
}
