//! In-memory [`Transport`] implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use parking_lot::Mutex;

use crate::error::DeliveryError;
use crate::http::Transport;

/// Transport that stores every body it is given.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    bodies: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the recorded bodies.
    pub fn bodies(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.bodies)
    }

    /// Messages of every delivered entry, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        self.bodies
            .lock()
            .iter()
            .flat_map(|body| body.lines().map(str::to_owned).collect::<Vec<_>>())
            .filter_map(|line| {
                let value: serde_json::Value = serde_json::from_str(&line).ok()?;
                value
                    .get("Message")
                    .and_then(|m| m.as_str())
                    .map(str::to_owned)
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn deliver(&mut self, body: &str) -> Result<(), DeliveryError> {
        self.bodies.lock().push(body.to_owned());
        Ok(())
    }
}

/// Transport that fails every attempt with a fixed error.
#[derive(Clone)]
pub struct FailingTransport {
    error: DeliveryError,
    attempts: Arc<AtomicUsize>,
}

impl FailingTransport {
    pub fn new(error: DeliveryError) -> Self {
        Self {
            error,
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl Transport for FailingTransport {
    fn deliver(&mut self, _body: &str) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Transport that blocks each delivery until the test releases it.
///
/// `started` receives one message per delivery as it begins; each delivery
/// then waits for one message on the release channel.
pub struct GatedTransport {
    inner: RecordingTransport,
    started_tx: Sender<()>,
    release_rx: Receiver<()>,
    max_wait: Duration,
}

/// Test-side controls for a [`GatedTransport`].
pub struct Gate {
    pub started: Receiver<()>,
    pub release: Sender<()>,
}

impl GatedTransport {
    pub fn new(inner: RecordingTransport, max_wait: Duration) -> (Self, Gate) {
        let (started_tx, started) = bounded(16);
        let (release, release_rx) = bounded(16);
        (
            Self {
                inner,
                started_tx,
                release_rx,
                max_wait,
            },
            Gate { started, release },
        )
    }
}

impl Transport for GatedTransport {
    fn deliver(&mut self, body: &str) -> Result<(), DeliveryError> {
        let _ = self.started_tx.send(());
        let _ = self.release_rx.recv_timeout(self.max_wait);
        self.inner.deliver(body)
    }
}
