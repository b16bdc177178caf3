//! Shared line formatters
//!
//! Every sink that renders entries as text uses one of these two formatters.
//! Both return the line without a trailing newline; the writing sink appends
//! it.
//!
//! # Plain format
//!
//! ```text
//! [error] [billing] [invoice-worker] charge failed
//! ```
//!
//! Bracket segments for service and entity are omitted when absent. `Raw`
//! entries render as the bare message with no decoration.
//!
//! # JSON format
//!
//! One object per line with camelCase keys. `params` carries the redacted
//! tree when redaction ran, otherwise the original parameters. Absent fields
//! are omitted.

use std::fmt::Write as FmtWrite;

use serde_json::Value;

use crate::entry::LogEntry;
use crate::error::RecordError;
use crate::kind::EntryKind;

/// Format an entry as a single plain-text line
pub fn format_plain(entry: &LogEntry) -> String {
    if entry.kind == EntryKind::Raw {
        return entry.message.clone();
    }

    let mut line = String::with_capacity(entry.message.len() + 32);
    let _ = write!(line, "[{}]", entry.kind);
    if let Some(service) = &entry.service_name {
        let _ = write!(line, " [{}]", service);
    }
    if let Some(entity) = &entry.entity_name {
        let _ = write!(line, " [{}]", entity);
    }
    line.push(' ');
    line.push_str(&entry.message);
    line
}

/// Format an entry as a single JSON line
pub fn format_json(entry: &LogEntry) -> Result<String, RecordError> {
    let mut obj = serde_json::Map::new();
    obj.insert("timestamp".into(), Value::from(entry.timestamp));
    obj.insert("type".into(), Value::from(entry.kind.as_str()));
    if let Some(service) = &entry.service_name {
        obj.insert("serviceName".into(), Value::from(service.as_str()));
    }
    if let Some(entity) = &entry.entity_name {
        obj.insert("entityName".into(), Value::from(entity.as_str()));
    }
    obj.insert("message".into(), Value::from(entry.message.as_str()));
    if let Some(params) = entry.visible_params() {
        let map: serde_json::Map<String, Value> = params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        obj.insert("params".into(), Value::Object(map));
    }

    Ok(serde_json::to_string(&Value::Object(obj))?)
}
