//! Sink configuration and its sources.
//!
//! [`SinkConfigBuilder`] collects the named settings (`hostName`,
//! `projectId`, `accessToken`, `source`, `tz`, plus tuning knobs) from code,
//! an INI file, or the environment, and validates them in
//! [`build`](SinkConfigBuilder::build). Missing or malformed values fail
//! here, before any sink exists, rather than on the sender thread.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use ini::Ini;

use crate::error::ConfigError;
use crate::queue::DEFAULT_QUEUE_CAPACITY;
use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;
use crate::stats::SinkObserver;

/// Timeout applied to each delivery request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// How long the sender thread sleeps when the queue is empty.
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(3_000);
/// Grace period granted to the sender thread on close; zero is a hard stop.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::ZERO;
/// Certificate subject accepted despite a host name mismatch.
pub const DEFAULT_ALLOWED_CERT_SUBJECT: &str = "*.splunkstorm.com";
/// INI section searched for settings before the general section.
pub const INI_SECTION: &str = "splunk";
/// Prefix applied to environment variable names.
pub const ENV_PREFIX: &str = "SPLUNK_";

/// Setting names understood by [`SinkConfigBuilder::set`].
pub const SETTING_NAMES: &[&str] = &[
    "hostName",
    "projectId",
    "accessToken",
    "source",
    "tz",
    "capacity",
    "timeoutMs",
    "idleWaitMs",
    "flushTimeoutMs",
    "shutdownGraceMs",
    "allowedCertSubject",
    "machineName",
];

/// Validated configuration for a [`SplunkSink`](crate::SplunkSink).
#[derive(Clone)]
pub struct SinkConfig {
    /// Collector host, without scheme.
    pub host_name: String,
    /// Index the entries are written to.
    pub project_id: String,
    /// Token sent as the Basic auth password.
    pub access_token: String,
    /// Source tag attached to every request.
    pub source: String,
    /// Optional timezone hint forwarded as the `tz` query parameter.
    pub tz: Option<String>,
    /// Maximum number of queued entries.
    pub capacity: usize,
    /// Timeout applied to each delivery request.
    pub request_timeout: Duration,
    /// Idle wait between empty drains.
    pub idle_wait: Duration,
    /// Upper bound on how long `flush` blocks.
    pub flush_timeout: Duration,
    /// Time granted to the sender thread for a final delivery on close.
    pub shutdown_grace: Duration,
    /// Subject common name accepted despite a certificate name mismatch.
    /// `None` disables the exception.
    pub allowed_cert_subject: Option<String>,
    /// Overrides the detected machine name sent as `host`.
    pub machine_name: Option<String>,
    /// Interval between throttled warnings about lost entries.
    pub warn_interval: Duration,
    /// Optional callback notified of drops and delivery outcomes.
    pub observer: Option<SinkObserver>,
}

impl SinkConfig {
    pub fn builder() -> SinkConfigBuilder {
        SinkConfigBuilder::new()
    }

    /// Load and validate settings from an INI file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
    /// settings are invalid.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        SinkConfigBuilder::from_ini_file(path)?.build()
    }

    /// Load and validate settings from INI text.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text cannot be parsed or the settings
    /// are invalid.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        SinkConfigBuilder::from_ini_str(text)?.build()
    }

    /// Load and validate settings from `SPLUNK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable is malformed or a required
    /// setting is missing.
    pub fn from_env() -> Result<Self, ConfigError> {
        SinkConfigBuilder::from_env()?.build()
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("host_name", &self.host_name)
            .field("project_id", &self.project_id)
            .field("access_token", &"<redacted>")
            .field("source", &self.source)
            .field("tz", &self.tz)
            .field("capacity", &self.capacity)
            .field("request_timeout", &self.request_timeout)
            .field("idle_wait", &self.idle_wait)
            .field("flush_timeout", &self.flush_timeout)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("allowed_cert_subject", &self.allowed_cert_subject)
            .field("machine_name", &self.machine_name)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

macro_rules! string_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: impl Into<String>) -> Self {
            self.$field = Some(value.into());
            self
        }
    };
}

/// Builder for [`SinkConfig`].
#[derive(Clone, Default)]
pub struct SinkConfigBuilder {
    host_name: Option<String>,
    project_id: Option<String>,
    access_token: Option<String>,
    source: Option<String>,
    tz: Option<String>,
    capacity: Option<usize>,
    timeout_ms: Option<u64>,
    idle_wait_ms: Option<u64>,
    flush_timeout_ms: Option<u64>,
    shutdown_grace_ms: Option<u64>,
    allowed_cert_subject: Option<Option<String>>,
    machine_name: Option<String>,
    warn_interval: Option<Duration>,
    observer: Option<SinkObserver>,
}

impl fmt::Debug for SinkConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfigBuilder")
            .field("host_name", &self.host_name)
            .field("project_id", &self.project_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("source", &self.source)
            .field("tz", &self.tz)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl SinkConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    string_setter!(
        #[doc = "Set the collector host name (required)."]
        with_host_name,
        host_name
    );
    string_setter!(
        #[doc = "Set the project/index identifier (required)."]
        with_project_id,
        project_id
    );
    string_setter!(
        #[doc = "Set the access token (required)."]
        with_access_token,
        access_token
    );
    string_setter!(
        #[doc = "Set the source tag (required)."]
        with_source,
        source
    );
    string_setter!(
        #[doc = "Set the timezone hint forwarded as `tz`."]
        with_tz,
        tz
    );
    string_setter!(
        #[doc = "Override the machine name sent as `host`."]
        with_machine_name,
        machine_name
    );
    option_setter!(
        #[doc = "Set the queue capacity. Defaults to 100."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(
        #[doc = "Set the request timeout in milliseconds. Defaults to 15 s."]
        with_timeout_ms,
        timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the idle wait between empty drains in milliseconds."]
        with_idle_wait_ms,
        idle_wait_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the flush timeout in milliseconds. Defaults to the request timeout."]
        with_flush_timeout_ms,
        flush_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the shutdown grace period in milliseconds. Zero is a hard stop."]
        with_shutdown_grace_ms,
        shutdown_grace_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the interval between throttled warnings."]
        with_warn_interval,
        warn_interval,
        Duration
    );

    /// Accept certificates whose subject common name equals `subject` even
    /// when they do not match the host name.
    pub fn with_allowed_cert_subject(mut self, subject: impl Into<String>) -> Self {
        self.allowed_cert_subject = Some(Some(subject.into()));
        self
    }

    /// Reject every certificate name mismatch.
    pub fn without_allowed_cert_subject(mut self) -> Self {
        self.allowed_cert_subject = Some(None);
        self
    }

    /// Register a callback notified of drops and delivery outcomes.
    pub fn with_observer(mut self, observer: SinkObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Apply a named setting, as found in INI files and the environment.
    ///
    /// Unknown names are ignored so shared configuration files can carry
    /// unrelated keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric setting does not
    /// parse.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match name {
            "hostName" => self.host_name = Some(value.to_owned()),
            "projectId" => self.project_id = Some(value.to_owned()),
            "accessToken" => self.access_token = Some(value.to_owned()),
            "source" => self.source = Some(value.to_owned()),
            "tz" => self.tz = Some(value.to_owned()),
            "machineName" => self.machine_name = Some(value.to_owned()),
            "allowedCertSubject" => {
                self.allowed_cert_subject = Some((!value.is_empty()).then(|| value.to_owned()));
            }
            "capacity" => self.capacity = Some(parse_number("capacity", value)?),
            "timeoutMs" => self.timeout_ms = Some(parse_number("timeoutMs", value)?),
            "idleWaitMs" => self.idle_wait_ms = Some(parse_number("idleWaitMs", value)?),
            "flushTimeoutMs" => {
                self.flush_timeout_ms = Some(parse_number("flushTimeoutMs", value)?);
            }
            "shutdownGraceMs" => {
                self.shutdown_grace_ms = Some(parse_number("shutdownGraceMs", value)?);
            }
            _ => {}
        }
        Ok(())
    }

    /// Load settings from an INI file.
    ///
    /// Keys are read from the `[splunk]` section when present, otherwise
    /// from the general (section-less) part of the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Ini`] if it cannot be parsed.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_ini(path, &text)
    }

    /// Load settings from INI text. See [`from_ini_file`](Self::from_ini_file).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Ini`] if the text cannot be parsed.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        Self::parse_ini(Path::new("<inline>"), text)
    }

    fn parse_ini(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Ini {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let props = ini
            .section(Some(INI_SECTION))
            .unwrap_or_else(|| ini.general_section());
        let mut builder = Self::new();
        for (key, value) in props.iter() {
            builder.set(key, value)?;
        }
        Ok(builder)
    }

    /// Load settings from `SPLUNK_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric variable does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, queried with the environment variable
    /// name of every known setting (for example `SPLUNK_HOST_NAME`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric value does not
    /// parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut builder = Self::new();
        for name in SETTING_NAMES {
            if let Some(value) = lookup(&env_var_name(name)) {
                builder.set(name, &value)?;
            }
        }
        Ok(builder)
    }

    /// Overlay every setting present in `other` on top of `self`.
    pub fn merge(mut self, other: SinkConfigBuilder) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            host_name,
            project_id,
            access_token,
            source,
            tz,
            capacity,
            timeout_ms,
            idle_wait_ms,
            flush_timeout_ms,
            shutdown_grace_ms,
            allowed_cert_subject,
            machine_name,
            warn_interval,
            observer
        );
        self
    }

    /// Validate the collected settings and produce a [`SinkConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] or [`ConfigError::Empty`] for absent
    /// required settings and [`ConfigError::NotPositive`] for zero capacity
    /// or timeouts.
    pub fn build(self) -> Result<SinkConfig, ConfigError> {
        let host_name = required("hostName", self.host_name)?;
        let project_id = required("projectId", self.project_id)?;
        let access_token = required("accessToken", self.access_token)?;
        let source = required("source", self.source)?;

        let capacity = positive("capacity", self.capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY))?;
        let request_timeout = self
            .timeout_ms
            .map(|ms| positive("timeoutMs", ms).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let idle_wait = self
            .idle_wait_ms
            .map(|ms| positive("idleWaitMs", ms).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(DEFAULT_IDLE_WAIT);
        let flush_timeout = self
            .flush_timeout_ms
            .map(|ms| positive("flushTimeoutMs", ms).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(request_timeout);

        Ok(SinkConfig {
            host_name,
            project_id,
            access_token,
            source,
            tz: self.tz.filter(|tz| !tz.trim().is_empty()),
            capacity,
            request_timeout,
            idle_wait,
            flush_timeout,
            shutdown_grace: self
                .shutdown_grace_ms
                .map_or(DEFAULT_SHUTDOWN_GRACE, Duration::from_millis),
            allowed_cert_subject: self
                .allowed_cert_subject
                .unwrap_or_else(|| Some(DEFAULT_ALLOWED_CERT_SUBJECT.to_owned())),
            machine_name: self.machine_name.filter(|name| !name.trim().is_empty()),
            warn_interval: self.warn_interval.unwrap_or(DEFAULT_WARN_INTERVAL),
            observer: self.observer,
        })
    }
}

/// Environment variable name for a setting: `hostName` → `SPLUNK_HOST_NAME`.
pub fn env_var_name(setting: &str) -> String {
    let mut name = String::from(ENV_PREFIX);
    for (i, ch) in setting.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            name.push('_');
        }
        name.push(ch.to_ascii_uppercase());
    }
    name
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        None => Err(ConfigError::Missing(field)),
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty(field)),
        Some(v) => Ok(v.trim().to_owned()),
    }
}

fn positive<T: PartialEq + Default>(field: &'static str, value: T) -> Result<T, ConfigError> {
    if value == T::default() {
        Err(ConfigError::NotPositive(field))
    } else {
        Ok(value)
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
