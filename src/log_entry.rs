//! Entry representation forwarded to the ingestion endpoint.
//!
//! This module defines [`TraceEvent`], the structured event handed over by a
//! logging façade, and [`LogEntry`], the immutable value that travels through
//! the queue and is serialised exactly once by the sender thread.

use std::process;
use std::thread;

use chrono::{DateTime, Local, NaiveDateTime, Utc};

use crate::level::EventLevel;

/// Return the numeric identifier of the calling thread as text.
///
/// `ThreadId` only exposes its value through `Debug` (`ThreadId(7)`), so the
/// digits are extracted from that rendering.
pub fn current_thread_id() -> String {
    let rendered = format!("{:?}", thread::current().id());
    let digits: String = rendered.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() { rendered } else { digits }
}

/// Structured event received from a logging façade.
#[derive(Clone, Debug)]
pub struct TraceEvent {
    /// Severity of the event.
    pub level: EventLevel,
    /// Rendered message text.
    pub message: String,
    /// Time the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Identifier of the emitting process; zero means unknown.
    pub process_id: u32,
    /// Identifier of the emitting thread; empty means unknown.
    pub thread_id: String,
    /// Logical operations active when the event was recorded, outermost first.
    pub operation_stack: Vec<String>,
}

impl TraceEvent {
    /// Capture an event for the calling thread at the current instant.
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            process_id: process::id(),
            thread_id: current_thread_id(),
            operation_stack: Vec::new(),
        }
    }

    /// Attach the logical operation stack active for this event.
    pub fn with_operation_stack(mut self, stack: Vec<String>) -> Self {
        self.operation_stack = stack;
        self
    }

    /// Override the event timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Single entry queued for delivery.
///
/// Optional fields are normalised on construction: a zero process id, an
/// empty thread id, and an empty path are all stored as `None` so the
/// serialiser can omit them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    timestamp: NaiveDateTime,
    message: String,
    level: Option<EventLevel>,
    process_id: Option<u32>,
    thread_id: Option<String>,
    path: Option<String>,
}

impl LogEntry {
    /// Create an entry with only a timestamp and message.
    pub fn new(timestamp: NaiveDateTime, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            level: None,
            process_id: None,
            thread_id: None,
            path: None,
        }
    }

    /// Build an entry from a façade event.
    ///
    /// The event timestamp is converted to local time and the operation stack
    /// is joined with `/`.
    pub fn from_event(event: TraceEvent) -> Self {
        let TraceEvent {
            level,
            message,
            timestamp,
            process_id,
            thread_id,
            operation_stack,
        } = event;
        Self::new(timestamp.with_timezone(&Local).naive_local(), message)
            .with_level(level)
            .with_process_id(process_id)
            .with_thread_id(thread_id)
            .with_path(operation_stack.join("/"))
    }

    /// Build an entry for a line written directly to the sink.
    ///
    /// Carries the local clock time and the calling process and thread but
    /// no level or path.
    pub fn from_line(message: impl Into<String>) -> Self {
        Self::new(Local::now().naive_local(), message)
            .with_process_id(process::id())
            .with_thread_id(current_thread_id())
    }

    pub fn with_level(mut self, level: EventLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_process_id(mut self, process_id: u32) -> Self {
        self.process_id = (process_id != 0).then_some(process_id);
        self
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        let thread_id = thread_id.into();
        self.thread_id = (!thread_id.is_empty()).then_some(thread_id);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = (!path.is_empty()).then_some(path);
        self
    }

    pub fn timestamp(&self) -> &NaiveDateTime {
        &self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn level(&self) -> Option<EventLevel> {
        self.level
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process_id
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn event_stack_is_joined_outermost_first() {
        let event = TraceEvent::new(EventLevel::Warning, "warned")
            .with_operation_stack(vec!["Main".into(), "TestFunction".into()]);
        let entry = LogEntry::from_event(event);
        assert_eq!(entry.path(), Some("Main/TestFunction"));
        assert_eq!(entry.level(), Some(EventLevel::Warning));
    }

    #[rstest]
    fn empty_stack_omits_path() {
        let entry = LogEntry::from_event(TraceEvent::new(EventLevel::Information, "hi"));
        assert_eq!(entry.path(), None);
    }

    #[rstest]
    fn zero_process_and_empty_thread_are_omitted() {
        let mut event = TraceEvent::new(EventLevel::Error, "boom");
        event.process_id = 0;
        event.thread_id = String::new();
        let entry = LogEntry::from_event(event);
        assert_eq!(entry.process_id(), None);
        assert_eq!(entry.thread_id(), None);
    }

    #[rstest]
    fn event_timestamp_is_converted_to_local_time() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().expect("valid instant");
        let entry = LogEntry::from_event(
            TraceEvent::new(EventLevel::Information, "at noon").with_timestamp(utc),
        );
        assert_eq!(*entry.timestamp(), utc.with_timezone(&Local).naive_local());
    }

    #[rstest]
    fn line_entries_carry_process_and_thread() {
        let entry = LogEntry::from_line("plain");
        assert_eq!(entry.message(), "plain");
        assert_eq!(entry.level(), None);
        assert_eq!(entry.process_id(), Some(process::id()));
        assert_eq!(entry.thread_id(), Some(current_thread_id().as_str()));
    }

    #[rstest]
    fn thread_id_is_numeric() {
        assert!(current_thread_id().chars().all(|c| c.is_ascii_digit()));
    }
}
