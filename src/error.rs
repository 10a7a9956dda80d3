//! Error types surfaced by configuration, initialisation and delivery.
//!
//! None of these ever cross the ingress interface: tracing calls absorb
//! every failure. They are returned from configuration loading and from
//! [`TraceSink::open`](crate::TraceSink::open), and reported to the
//! observer for failed deliveries.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing configuration detected before a sink is created.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("setting `{0}` must not be empty")]
    Empty(&'static str),
    #[error("setting `{field}` must be a whole number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("setting `{0}` must be greater than zero")]
    NotPositive(&'static str),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is invalid: {message}")]
    Ini { path: PathBuf, message: String },
}

/// Failure while performing the one-time initialisation.
///
/// The outcome of initialisation is cached, so this type is `Clone`.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("failed to spawn sender thread: {0}")]
    Spawn(String),
}

/// Failure of a single batch delivery. The batch is discarded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("collector responded with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to encode batch: {0}")]
    Encode(String),
}
