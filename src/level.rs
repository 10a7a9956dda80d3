//! Severity labels attached to forwarded entries.
//!
//! The labels mirror the event types understood by the ingestion index
//! (`Critical`, `Error`, `Warning`, `Information`, `Verbose`) so existing
//! searches keep working regardless of which Rust façade produced the event.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventLevel {
    Critical,
    Error,
    Warning,
    Information,
    Verbose,
}

impl EventLevel {
    /// Label written to the `Level` field of the payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Critical => "Critical",
            EventLevel::Error => "Error",
            EventLevel::Warning => "Warning",
            EventLevel::Information => "Information",
            EventLevel::Verbose => "Verbose",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<log::Level> for EventLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Information,
            log::Level::Debug | log::Level::Trace => Self::Verbose,
        }
    }
}

#[cfg(feature = "tracing-compat")]
impl From<tracing::Level> for EventLevel {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::Error,
            tracing::Level::WARN => Self::Warning,
            tracing::Level::INFO => Self::Information,
            _ => Self::Verbose,
        }
    }
}
