//! Tests for sink configuration loading and validation.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::NamedTempFile;

use super::*;

#[fixture]
fn complete() -> SinkConfigBuilder {
    SinkConfigBuilder::new()
        .with_host_name("logs.example.com")
        .with_project_id("proj")
        .with_access_token("secret")
        .with_source("tests")
}

#[rstest]
fn defaults_are_applied(complete: SinkConfigBuilder) {
    let config = complete.build().expect("valid config");
    assert_eq!(config.capacity, 100);
    assert_eq!(config.request_timeout, Duration::from_secs(15));
    assert_eq!(config.idle_wait, Duration::from_millis(3_000));
    assert_eq!(config.flush_timeout, config.request_timeout);
    assert_eq!(config.shutdown_grace, Duration::ZERO);
    assert_eq!(
        config.allowed_cert_subject.as_deref(),
        Some("*.splunkstorm.com")
    );
    assert_eq!(config.tz, None);
}

#[rstest]
#[case("hostName")]
#[case("projectId")]
#[case("accessToken")]
#[case("source")]
fn missing_required_setting_fails_fast(#[case] field: &str) {
    let mut values: HashMap<&str, &str> = HashMap::from([
        ("hostName", "h"),
        ("projectId", "p"),
        ("accessToken", "t"),
        ("source", "s"),
    ]);
    values.remove(field);
    let mut builder = SinkConfigBuilder::new();
    for (k, v) in values {
        builder.set(k, v).expect("set");
    }
    let err = builder.build().expect_err("missing setting must fail");
    assert!(matches!(err, ConfigError::Missing(name) if name == field));
}

#[rstest]
fn blank_required_setting_is_rejected(complete: SinkConfigBuilder) {
    let err = complete
        .with_access_token("   ")
        .build()
        .expect_err("blank token must fail");
    assert!(matches!(err, ConfigError::Empty("accessToken")));
}

#[rstest]
fn zero_capacity_is_rejected(complete: SinkConfigBuilder) {
    let err = complete.with_capacity(0).build().expect_err("zero capacity");
    assert!(matches!(err, ConfigError::NotPositive("capacity")));
}

#[rstest]
fn zero_timeout_is_rejected(complete: SinkConfigBuilder) {
    let err = complete.with_timeout_ms(0).build().expect_err("zero timeout");
    assert!(matches!(err, ConfigError::NotPositive("timeoutMs")));
}

#[rstest]
fn blank_tz_is_treated_as_absent(complete: SinkConfigBuilder) {
    let config = complete.with_tz(" ").build().expect("valid config");
    assert_eq!(config.tz, None);
}

#[rstest]
fn cert_exception_can_be_disabled(complete: SinkConfigBuilder) {
    let config = complete
        .without_allowed_cert_subject()
        .build()
        .expect("valid config");
    assert_eq!(config.allowed_cert_subject, None);
}

#[rstest]
fn invalid_number_reports_field() {
    let mut builder = SinkConfigBuilder::new();
    let err = builder.set("capacity", "lots").expect_err("non-numeric");
    assert!(matches!(err, ConfigError::InvalidNumber { field: "capacity", .. }));
}

#[rstest]
fn unknown_settings_are_ignored() {
    let mut builder = SinkConfigBuilder::new();
    builder.set("colour", "blue").expect("ignored");
}

#[rstest]
#[case("hostName", "SPLUNK_HOST_NAME")]
#[case("accessToken", "SPLUNK_ACCESS_TOKEN")]
#[case("tz", "SPLUNK_TZ")]
#[case("shutdownGraceMs", "SPLUNK_SHUTDOWN_GRACE_MS")]
fn env_names_are_upper_snake(#[case] setting: &str, #[case] expected: &str) {
    assert_eq!(env_var_name(setting), expected);
}

#[rstest]
fn lookup_reads_prefixed_names() {
    let env: HashMap<String, String> = HashMap::from([
        ("SPLUNK_HOST_NAME".into(), "env.example.com".into()),
        ("SPLUNK_PROJECT_ID".into(), "env-proj".into()),
        ("SPLUNK_ACCESS_TOKEN".into(), "env-token".into()),
        ("SPLUNK_SOURCE".into(), "env-source".into()),
        ("SPLUNK_TZ".into(), "Europe/Oslo".into()),
        ("SPLUNK_CAPACITY".into(), "7".into()),
    ]);
    let config = SinkConfigBuilder::from_lookup(|name| env.get(name).cloned())
        .expect("lookup")
        .build()
        .expect("valid config");
    assert_eq!(config.host_name, "env.example.com");
    assert_eq!(config.tz.as_deref(), Some("Europe/Oslo"));
    assert_eq!(config.capacity, 7);
}

#[rstest]
fn ini_section_is_preferred() {
    let text = "hostName = general.example.com\n\n[splunk]\nhostName = section.example.com\nprojectId = p\naccessToken = t\nsource = s\ntimeoutMs = 2500\n";
    let config = SinkConfigBuilder::from_ini_str(text)
        .expect("parse")
        .build()
        .expect("valid config");
    assert_eq!(config.host_name, "section.example.com");
    assert_eq!(config.request_timeout, Duration::from_millis(2_500));
}

#[rstest]
fn ini_general_section_is_fallback() {
    let text = "hostName = h\nprojectId = p\naccessToken = t\nsource = s\n";
    let config = SinkConfigBuilder::from_ini_str(text)
        .expect("parse")
        .build()
        .expect("valid config");
    assert_eq!(config.project_id, "p");
}

#[rstest]
fn ini_file_is_read_from_disk() {
    let mut file = NamedTempFile::new().expect("create temp ini file");
    writeln!(
        file,
        "[splunk]\nhostName = disk.example.com\nprojectId = p\naccessToken = t\nsource = s\ntz = UTC"
    )
    .expect("write ini contents");
    let config = SinkConfigBuilder::from_ini_file(file.path())
        .expect("read")
        .build()
        .expect("valid config");
    assert_eq!(config.host_name, "disk.example.com");
    assert_eq!(config.tz.as_deref(), Some("UTC"));
}

#[rstest]
fn missing_ini_file_reports_io_error() {
    let err = SinkConfigBuilder::from_ini_file("/definitely/not/here.ini")
        .expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[rstest]
fn merge_overlays_present_values(complete: SinkConfigBuilder) {
    let config = complete
        .merge(SinkConfigBuilder::new().with_source("override").with_capacity(5))
        .build()
        .expect("valid config");
    assert_eq!(config.source, "override");
    assert_eq!(config.capacity, 5);
    assert_eq!(config.host_name, "logs.example.com");
}

#[rstest]
fn debug_output_redacts_token(complete: SinkConfigBuilder) {
    let config = complete.build().expect("valid config");
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("secret"));
    assert!(rendered.contains("<redacted>"));
}

#[rstest]
fn config_loads_directly_from_ini_text() {
    let config = SinkConfig::from_ini_str("[splunk]\nhostName = h\nprojectId = p\naccessToken = t\nsource = s\n")
        .expect("valid config");
    assert_eq!(config.source, "s");
}

#[rstest]
fn config_from_incomplete_ini_fails() {
    let err = SinkConfig::from_ini_str("[splunk]\nhostName = h\n").expect_err("incomplete");
    assert!(matches!(err, ConfigError::Missing("projectId")));
}
