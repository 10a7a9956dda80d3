//! Serialisation of drained batches into the ingestion payload.
//!
//! The endpoint expects line-delimited JSON: one object per entry, each
//! terminated by `\n`, with no enclosing array. Field names and ordering
//! follow the `json_predefined_timestamp` source type: `timestamp` first,
//! then the optional `Level`, `ProcessId`, `ThreadId` and `Path`, and the
//! mandatory `Message` last.
//!
//! Strings are escaped by `serde_json`, so embedded quotes, backslashes,
//! control characters and newlines can never split or corrupt a line.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::log_entry::LogEntry;

/// Layout of the `timestamp` field: local time, milliseconds, no zone.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Borrowed view of a [`LogEntry`] in wire order.
///
/// Only the timestamp and process id are rendered into owned strings; every
/// other field borrows from the entry.
#[derive(Serialize)]
struct WireEntry<'a> {
    timestamp: String,
    #[serde(rename = "Level", skip_serializing_if = "Option::is_none")]
    level: Option<&'static str>,
    #[serde(rename = "ProcessId", skip_serializing_if = "Option::is_none")]
    process_id: Option<String>,
    #[serde(rename = "ThreadId", skip_serializing_if = "Option::is_none")]
    thread_id: Option<&'a str>,
    #[serde(rename = "Path", skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(rename = "Message")]
    message: &'a str,
}

impl<'a> From<&'a LogEntry> for WireEntry<'a> {
    fn from(entry: &'a LogEntry) -> Self {
        Self {
            timestamp: format_timestamp(entry.timestamp()),
            level: entry.level().map(|level| level.as_str()),
            process_id: entry.process_id().map(|pid| pid.to_string()),
            thread_id: entry.thread_id(),
            path: entry.path(),
            message: entry.message(),
        }
    }
}

/// Render a timestamp as `YYYY-MM-DDThh:mm:ss.mmm`.
///
/// Sub-millisecond precision is truncated, never rounded.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Serialise a single entry as one JSON line, including the trailing newline.
///
/// # Errors
///
/// Returns an error if `serde_json` fails to encode the entry.
pub fn serialise_entry(entry: &LogEntry) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&WireEntry::from(entry))?;
    line.push('\n');
    Ok(line)
}

/// Serialise a drained batch into the request body.
///
/// Entries keep their queue order. An empty batch yields an empty body.
///
/// # Errors
///
/// Returns an error if `serde_json` fails to encode any entry.
pub fn serialise_batch(entries: &[LogEntry]) -> serde_json::Result<String> {
    let mut body = Vec::with_capacity(entries.len() * 128);
    for entry in entries {
        serde_json::to_writer(&mut body, &WireEntry::from(entry))?;
        body.push(b'\n');
    }
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&body).into_owned())
}
