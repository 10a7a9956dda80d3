//! Trace sink forwarding application events to a Splunk HTTP input.
//!
//! Producers hand events to a [`SplunkSink`] from any thread; a single
//! background thread batches queued entries into line-delimited JSON and
//! posts them with Basic authentication. Producers never block on the
//! network and never see delivery errors. Losses are counted instead and
//! exposed through [`SplunkSink::stats`].
//!
//! ```no_run
//! use splunk_trace_sink::{EventLevel, SinkConfig, SplunkSink, TraceEvent, TraceSink};
//!
//! let config = SinkConfig::builder()
//!     .with_host_name("input.splunkstorm.com")
//!     .with_project_id("proj")
//!     .with_access_token("token")
//!     .with_source("my-service")
//!     .build()?;
//! let sink = SplunkSink::new(config);
//! sink.record_event(TraceEvent::new(EventLevel::Information, "started"));
//! sink.flush();
//! sink.close();
//! # Ok::<(), splunk_trace_sink::ConfigError>(())
//! ```

mod config;
mod error;
mod filter;
pub mod http;
mod level;
mod log_entry;
mod queue;
mod rate_limited_warner;
pub mod scope;
mod serialise;
mod sink;
mod stats;
mod worker;

#[cfg(feature = "log-compat")]
pub mod log_compat;
#[cfg(feature = "tracing-compat")]
pub mod tracing_layer;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use config::{
    DEFAULT_ALLOWED_CERT_SUBJECT, DEFAULT_IDLE_WAIT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SHUTDOWN_GRACE, SinkConfig, SinkConfigBuilder, env_var_name,
};
pub use error::{ConfigError, DeliveryError, InitError};
pub use filter::{IGNORED_TARGETS, is_ignored_target};
pub use http::{HttpTransport, Transport};
pub use level::EventLevel;
pub use log_entry::{LogEntry, TraceEvent, current_thread_id};
pub use queue::DEFAULT_QUEUE_CAPACITY;
pub use rate_limited_warner::DEFAULT_WARN_INTERVAL;
pub use scope::LogicalOperation;
pub use serialise::{TIMESTAMP_FORMAT, format_timestamp, serialise_batch, serialise_entry};
pub use sink::{SplunkSink, TraceSink};
pub use stats::{DropReason, SinkEvent, SinkObserver, StatsSnapshot};
pub use worker::WORKER_THREAD_NAME;

#[cfg(feature = "log-compat")]
pub use log_compat::{SplunkLogAdapter, install_global_logger};
#[cfg(feature = "tracing-compat")]
pub use tracing_layer::SplunkLayer;
