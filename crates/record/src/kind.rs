//! Entry kinds for Scribe records
//!
//! The kind classifies an entry for level filtering and display. Kinds are
//! ordered by severity; `Raw` sits outside the ordering and always passes
//! level filters.

use std::str::FromStr;

use crate::error::RecordError;

/// Severity/category of a log entry
///
/// Ordered for filtering: `Trace < Debug < Info < Warning < Error < Fatal`.
/// `Raw` marks a pre-formatted passthrough line and is never filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EntryKind {
    /// Fine-grained diagnostic output
    Trace = 0,
    /// Developer debugging information
    Debug = 1,
    /// Normal operational messages
    Info = 2,
    /// Something unexpected but recoverable
    Warning = 3,
    /// An operation failed
    Error = 4,
    /// The process cannot continue
    Fatal = 5,
    /// Pre-formatted passthrough line (bypasses level filtering)
    Raw = 6,
}

impl EntryKind {
    /// Check whether this kind passes a minimum-level filter
    ///
    /// `Raw` entries always pass.
    #[inline]
    pub const fn meets(self, min: EntryKind) -> bool {
        matches!(self, Self::Raw) || self as u8 >= min as u8
    }

    /// Get the lowercase string name of this kind
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "raw" => Ok(Self::Raw),
            _ => Err(RecordError::UnknownKind(s.to_string())),
        }
    }
}
