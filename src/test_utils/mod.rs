//! Test-only helpers shared across unit and integration tests.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

mod transports;

pub use transports::{FailingTransport, Gate, GatedTransport, RecordingTransport};

use std::time::Duration;

use crate::config::{SinkConfig, SinkConfigBuilder};

/// Builder pre-filled with the required settings and short timings.
pub fn test_config_builder() -> SinkConfigBuilder {
    SinkConfigBuilder::new()
        .with_host_name("collector.invalid")
        .with_project_id("test-project")
        .with_access_token("test-token")
        .with_source("tests")
        .with_machine_name("test-machine")
        .with_idle_wait_ms(20)
        .with_flush_timeout_ms(5_000)
        .with_warn_interval(Duration::from_secs(60))
}

/// Valid configuration produced by [`test_config_builder`].
pub fn test_config() -> SinkConfig {
    match test_config_builder().build() {
        Ok(config) => config,
        Err(err) => panic!("test configuration must be valid: {err}"),
    }
}
