//! HTTP delivery of serialised batches.
//!
//! This module defines the [`Transport`] seam used by the sender thread and
//! its production implementation, [`HttpTransport`], which posts each batch
//! to the collector's raw HTTP input with a `ureq` agent.
//!
//! # Delivery semantics
//!
//! Each batch is attempted once:
//!
//! - **2xx**: delivered.
//! - **Any other status**: [`DeliveryError::Status`]; the batch is dropped.
//! - **Network errors and timeouts**: [`DeliveryError::Transport`]; the batch
//!   is dropped.

mod machine_name;
mod tls;

use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use ureq::{Agent, AgentBuilder};

use crate::config::SinkConfig;
use crate::error::{DeliveryError, InitError};

pub use machine_name::machine_name;
pub use tls::{accepts_name_mismatch, subject_common_name};

/// Path of the collector's raw HTTP input.
pub const INGEST_PATH: &str = "/1/inputs/http";
/// Source type telling the indexer to take `timestamp` from the payload.
pub const SOURCE_TYPE: &str = "json_predefined_timestamp";
/// Fixed user name paired with the access token in Basic credentials.
pub const CREDENTIAL_USER: &str = "x";

/// Characters escaped in query values; unreserved characters pass through.
const QUERY_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Destination for serialised batches.
///
/// Implementations are owned by the sender thread and called once per
/// drained batch.
pub trait Transport: Send + 'static {
    /// Deliver `body`, blocking until the collector answers or the attempt
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] on any failure; the caller discards the
    /// batch.
    fn deliver(&mut self, body: &str) -> Result<(), DeliveryError>;
}

impl<F> Transport for F
where
    F: FnMut(&str) -> Result<(), DeliveryError> + Send + 'static,
{
    fn deliver(&mut self, body: &str) -> Result<(), DeliveryError> {
        self(body)
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE).to_string()
}

/// Build the delivery URL for `config`, reporting as `machine`.
///
/// The `tz` parameter is appended only when configured.
pub fn request_url(config: &SinkConfig, machine: &str) -> String {
    let mut url = format!(
        "https://{}{}?index={}&sourcetype={}&host={}&source={}",
        config.host_name,
        INGEST_PATH,
        encode(&config.project_id),
        SOURCE_TYPE,
        encode(machine),
        encode(&config.source),
    );
    if let Some(tz) = &config.tz {
        url.push_str("&tz=");
        url.push_str(&encode(tz));
    }
    url
}

/// `Authorization` header value for `access_token`.
pub fn basic_authorization(access_token: &str) -> String {
    let credentials = format!("{CREDENTIAL_USER}:{access_token}");
    format!("Basic {}", BASE64_STANDARD.encode(credentials.as_bytes()))
}

/// Classify a response status; only 2xx counts as delivered.
pub(crate) fn check_status(status: u16) -> Result<(), DeliveryError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(DeliveryError::Status(status))
    }
}

/// [`Transport`] posting batches with a reusable `ureq` agent.
pub struct HttpTransport {
    agent: Agent,
    url: String,
    authorization: String,
}

impl HttpTransport {
    /// Wrap an existing agent. Used directly by tests targeting plain HTTP.
    pub fn new(agent: Agent, url: impl Into<String>, access_token: &str) -> Self {
        Self {
            agent,
            url: url.into(),
            authorization: basic_authorization(access_token),
        }
    }

    /// Build the agent, TLS policy and URL described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Tls`] if the trust store or TLS configuration
    /// cannot be built.
    pub fn from_config(config: &SinkConfig) -> Result<Self, InitError> {
        let tls = tls::client_config(config.allowed_cert_subject.as_deref())?;
        let agent = AgentBuilder::new()
            .timeout(config.request_timeout)
            .tls_config(tls)
            .build();
        let machine = config
            .machine_name
            .clone()
            .unwrap_or_else(machine_name);
        let url = request_url(config, &machine);
        Ok(Self::new(agent, url, &config.access_token))
    }

    /// Agent with only a timeout, for plain HTTP endpoints.
    pub fn plain_agent(timeout: Duration) -> Agent {
        AgentBuilder::new().timeout(timeout).build()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn deliver(&mut self, body: &str) -> Result<(), DeliveryError> {
        let result = self
            .agent
            .post(&self.url)
            .set("Authorization", &self.authorization)
            .set("Content-Type", "application/json")
            .send_string(body);
        match result {
            Ok(response) => {
                let status = response.status();
                // Reading the body lets the agent reuse the connection.
                let _ = response.into_string();
                check_status(status)
            }
            Err(ureq::Error::Status(code, _)) => Err(DeliveryError::Status(code)),
            Err(ureq::Error::Transport(err)) => Err(DeliveryError::Transport(err.to_string())),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
