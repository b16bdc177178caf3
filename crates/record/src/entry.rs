//! Log entry record and builder
//!
//! A `LogEntry` is immutable once built. The dispatcher wraps it in `Arc` and
//! every sink reads the same instance; a sink that needs a modified view
//! clones its own copy.

use std::sync::Arc;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;

use crate::kind::EntryKind;

/// Ordered string-keyed parameter tree attached to an entry
pub type Params = IndexMap<String, Value>;

/// A single log record flowing through the pipeline
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch, UTC
    pub timestamp: i64,

    /// Severity/category classification
    pub kind: EntryKind,

    /// Originating service, if known
    pub service_name: Option<String>,

    /// Originating entity within the service, if known
    pub entity_name: Option<String>,

    /// Message template before interpolation
    pub template: String,

    /// Fully interpolated message
    pub message: String,

    /// Structured parameters as supplied by the caller
    pub params: Option<Params>,

    /// Parameters after redaction was applied (set by the dispatcher)
    ///
    /// `Some` only when `params` was non-empty and at least one key was
    /// actually redacted.
    pub redacted_params: Option<Params>,

    /// Dotted paths of the keys that were redacted
    pub redacted_keys: Option<Vec<String>>,

    /// Opaque causal error payload
    pub error: Option<Arc<dyn std::error::Error + Send + Sync>>,

    /// When set, the dispatcher runs the exit sequence after fan-out
    pub exit_code: Option<i32>,

    /// Free-form tags; `Some` only when non-empty
    pub tags: Option<Vec<String>>,
}

impl LogEntry {
    /// Start building an entry of the given kind
    pub fn builder(kind: EntryKind, message: impl Into<String>) -> LogEntryBuilder {
        LogEntryBuilder::new(kind, message)
    }

    /// Create an entry with defaults for everything but kind and message
    pub fn new(kind: EntryKind, message: impl Into<String>) -> Self {
        Self::builder(kind, message).build()
    }

    /// Create a pre-formatted passthrough entry
    pub fn raw(message: impl Into<String>) -> Self {
        Self::builder(EntryKind::Raw, message).build()
    }

    /// Parameters to expose externally: redacted when redaction ran
    #[inline]
    pub fn visible_params(&self) -> Option<&Params> {
        self.redacted_params.as_ref().or(self.params.as_ref())
    }
}

/// Builder for `LogEntry`
///
/// `build()` stamps `timestamp` with the current time when unset, defaults
/// `template` to the message, and drops an empty tags vector.
pub struct LogEntryBuilder {
    timestamp: Option<i64>,
    kind: EntryKind,
    service_name: Option<String>,
    entity_name: Option<String>,
    template: Option<String>,
    message: String,
    params: Option<Params>,
    error: Option<Arc<dyn std::error::Error + Send + Sync>>,
    exit_code: Option<i32>,
    tags: Vec<String>,
}

impl LogEntryBuilder {
    fn new(kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            kind,
            service_name: None,
            entity_name: None,
            template: None,
            message: message.into(),
            params: None,
            error: None,
            exit_code: None,
            tags: Vec::new(),
        }
    }

    /// Set an explicit timestamp (milliseconds since epoch, UTC)
    #[must_use]
    pub fn timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Set the originating service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the originating entity name
    #[must_use]
    pub fn entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    /// Set the pre-interpolation template
    #[must_use]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Attach structured parameters
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Attach a causal error
    #[must_use]
    pub fn error(mut self, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    /// Attach an already-shared causal error
    #[must_use]
    pub fn error_arc(mut self, error: Arc<dyn std::error::Error + Send + Sync>) -> Self {
        self.error = Some(error);
        self
    }

    /// Request process exit with the given code after fan-out
    #[must_use]
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Add a tag
    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add several tags
    #[must_use]
    pub fn tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }

    /// Finalize the entry
    pub fn build(self) -> LogEntry {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let template = self.template.unwrap_or_else(|| self.message.clone());
        let tags = if self.tags.is_empty() {
            None
        } else {
            Some(self.tags)
        };

        LogEntry {
            timestamp,
            kind: self.kind,
            service_name: self.service_name,
            entity_name: self.entity_name,
            template,
            message: self.message,
            params: self.params,
            redacted_params: None,
            redacted_keys: None,
            error: self.error,
            exit_code: self.exit_code,
            tags,
        }
    }
}
