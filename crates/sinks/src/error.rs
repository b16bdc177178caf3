//! Sink error types
//!
//! Every sink reports failures through [`SinkError`]. Callers that only need
//! a coarse category (error callbacks, health reporting) use
//! [`SinkError::kind`] instead of matching the full enum.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to write an entry to the destination
    #[error("write failed: {0}")]
    Write(String),

    /// Failed to shut the sink down cleanly
    #[error("close failed: {0}")]
    Close(String),

    /// Destination path does not exist
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    /// Destination path exists but is not a named pipe
    #[error("not a named pipe: {path}")]
    NotAPipe { path: PathBuf },

    /// Destination path exists but is not accessible
    #[error("permission denied: {path}")]
    Permission { path: PathBuf },

    /// Sink is not supported on this platform
    #[error("sink is not supported on this platform")]
    UnsupportedPlatform,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SinkError {
    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a close error
    pub fn close(msg: impl Into<String>) -> Self {
        Self::Close(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Coarse category for callbacks and health reporting
    pub const fn kind(&self) -> SinkErrorKind {
        match self {
            Self::Write(_) => SinkErrorKind::Write,
            Self::Close(_) => SinkErrorKind::Close,
            Self::NotFound { .. } => SinkErrorKind::NotFound,
            Self::NotAPipe { .. } => SinkErrorKind::NotAPipe,
            Self::Permission { .. } => SinkErrorKind::Permission,
            Self::UnsupportedPlatform => SinkErrorKind::UnsupportedPlatform,
            Self::Config(_) => SinkErrorKind::Config,
            Self::Io(_) => SinkErrorKind::Io,
        }
    }
}

/// Coarse error category, stable across error message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkErrorKind {
    Write,
    Close,
    NotFound,
    NotAPipe,
    Permission,
    UnsupportedPlatform,
    Config,
    Io,
}

impl SinkErrorKind {
    /// Stable string name for the category
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Close => "close",
            Self::NotFound => "not_found",
            Self::NotAPipe => "not_a_pipe",
            Self::Permission => "permission",
            Self::UnsupportedPlatform => "unsupported_platform",
            Self::Config => "config",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for SinkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;
