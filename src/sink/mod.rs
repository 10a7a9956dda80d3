//! The Splunk sink: ingress, lazy start-up and lifecycle.
//!
//! [`SplunkSink`] accepts structured events and raw text from any thread,
//! queues them, and leaves delivery to a single sender thread started on
//! first use. Ingress never blocks on the network and never reports errors
//! to the caller; losses are counted in [`StatsSnapshot`] instead.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::error;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::config::SinkConfig;
use crate::error::InitError;
use crate::http::{HttpTransport, Transport};
use crate::log_entry::{LogEntry, TraceEvent};
use crate::queue::{EntryQueue, PushOutcome};
use crate::stats::{Diagnostics, DropReason, StatsSnapshot};
use crate::worker::{WorkerHandle, spawn_worker};

/// Operations every trace sink supports.
///
/// Ingress methods (`record_event`, `write`, `write_line`) are infallible
/// from the caller's point of view and safe to call concurrently.
pub trait TraceSink: Send + Sync {
    /// Start the sink if it has not started yet.
    ///
    /// # Errors
    ///
    /// Returns the [`InitError`] recorded by the first start-up attempt.
    fn open(&self) -> Result<(), InitError>;

    /// Queue a structured event.
    fn record_event(&self, event: TraceEvent);

    /// Append `text` to the pending partial line.
    fn write(&self, text: &str);

    /// Complete the pending line with `text` and queue it.
    fn write_line(&self, text: &str);

    /// Wait until everything queued has been handed to the collector.
    ///
    /// Returns `false` if the flush timeout elapsed first.
    fn flush(&self) -> bool;

    /// Stop accepting entries and shut the sender thread down. Idempotent.
    fn close(&self);
}

type TransportFactory =
    Box<dyn FnOnce(&SinkConfig) -> Result<Box<dyn Transport>, InitError> + Send>;

type WorkerSlot = Result<Mutex<Option<WorkerHandle>>, InitError>;

/// Sink posting entries to a Splunk HTTP input.
pub struct SplunkSink {
    config: SinkConfig,
    queue: Arc<EntryQueue>,
    diagnostics: Arc<Diagnostics>,
    transport_factory: Mutex<Option<TransportFactory>>,
    worker: OnceCell<WorkerSlot>,
}

impl SplunkSink {
    /// Create a sink delivering over HTTPS as described by `config`.
    ///
    /// Nothing is started until the first ingress call or [`open`].
    ///
    /// [`open`]: TraceSink::open
    pub fn new(config: SinkConfig) -> Self {
        Self::with_transport_factory(config, |config: &SinkConfig| {
            HttpTransport::from_config(config)
        })
    }

    /// Create a sink delivering through `transport`.
    pub fn with_transport(config: SinkConfig, transport: impl Transport) -> Self {
        Self::with_transport_factory(config, move |_: &SinkConfig| Ok(transport))
    }

    /// Create a sink whose transport is built by `factory` on start-up.
    pub fn with_transport_factory<F, T>(config: SinkConfig, factory: F) -> Self
    where
        F: FnOnce(&SinkConfig) -> Result<T, InitError> + Send + 'static,
        T: Transport,
    {
        let factory: TransportFactory = Box::new(move |config: &SinkConfig| {
            factory(config).map(|t| Box::new(t) as Box<dyn Transport>)
        });
        Self {
            queue: Arc::new(EntryQueue::new(config.capacity)),
            diagnostics: Arc::new(Diagnostics::new(
                config.observer.clone(),
                config.warn_interval,
            )),
            transport_factory: Mutex::new(Some(factory)),
            worker: OnceCell::new(),
            config,
        }
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Snapshot of the sink's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.diagnostics.stats().snapshot()
    }

    fn start(&self) -> &WorkerSlot {
        self.worker.get_or_init(|| {
            let slot = self.initialise().map(|worker| Mutex::new(Some(worker)));
            if let Err(err) = &slot {
                error!("splunk sink failed to start, entries will be dropped: {err}");
            }
            slot
        })
    }

    fn initialise(&self) -> Result<WorkerHandle, InitError> {
        let factory = self
            .transport_factory
            .lock()
            .take()
            .ok_or_else(|| InitError::Spawn("transport already consumed".into()))?;
        let transport = factory(&self.config)?;
        spawn_worker(
            Arc::clone(&self.queue),
            transport,
            Arc::clone(&self.diagnostics),
            self.config.idle_wait,
        )
        .map_err(|err| InitError::Spawn(err.to_string()))
    }

    fn started(&self) -> bool {
        if self.start().is_ok() {
            true
        } else {
            self.diagnostics.record_drop(DropReason::NotStarted, 1);
            false
        }
    }

    fn account(&self, outcome: PushOutcome) {
        match outcome {
            PushOutcome::Accepted => self.diagnostics.record_accepted(),
            PushOutcome::Full => self.diagnostics.record_drop(DropReason::QueueFull, 1),
            PushOutcome::Closed => self.diagnostics.record_drop(DropReason::Closed, 1),
        }
    }

    fn discard_queued(&self) {
        let discarded = self.queue.close_and_discard();
        self.diagnostics
            .record_drop(DropReason::Shutdown, discarded as u64);
    }
}

impl TraceSink for SplunkSink {
    fn open(&self) -> Result<(), InitError> {
        match self.start() {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        }
    }

    fn record_event(&self, event: TraceEvent) {
        if !self.started() {
            return;
        }
        let outcome = self.queue.push(LogEntry::from_event(event));
        self.account(outcome);
    }

    fn write(&self, text: &str) {
        if !self.started() {
            return;
        }
        self.queue.push_line_fragment(text);
    }

    fn write_line(&self, text: &str) {
        if !self.started() {
            return;
        }
        let outcome = self.queue.complete_line(text, LogEntry::from_line);
        self.account(outcome);
    }

    fn flush(&self) -> bool {
        match self.worker.get() {
            Some(Ok(_)) => {
                self.diagnostics.flush_warnings();
                let timeout = if self.queue.is_closed() {
                    Duration::ZERO
                } else {
                    self.config.flush_timeout
                };
                self.queue.wait_idle(timeout)
            }
            None | Some(Err(_)) => self.queue.is_empty(),
        }
    }

    fn close(&self) {
        // Fill the cell so no sender thread can start after this point.
        let _ = self.worker.set(Ok(Mutex::new(None)));

        let grace = self.config.shutdown_grace;
        if grace.is_zero() {
            self.discard_queued();
        } else {
            self.queue.close();
        }

        if let Some(Ok(slot)) = self.worker.get() {
            let worker = slot.lock().take();
            if let Some(worker) = worker {
                worker.stop(grace);
            }
        }

        // Anything the grace period did not cover is lost.
        self.discard_queued();
        self.diagnostics.flush_warnings();
    }
}

impl Drop for SplunkSink {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SplunkSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplunkSink")
            .field("host_name", &self.config.host_name)
            .field("queued", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .field("closed", &self.queue.is_closed())
            .field("started", &self.worker.get().is_some())
            .finish_non_exhaustive()
    }
}
