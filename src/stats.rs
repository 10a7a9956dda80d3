//! Counters and observer hook for entries the sink loses or delivers.
//!
//! The ingress contract forbids surfacing failures to callers, so losses are
//! made visible here instead: atomic counters readable through
//! [`SplunkSink::stats`](crate::SplunkSink::stats), an optional observer
//! callback, and throttled `log` warnings.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::warn;

use crate::error::DeliveryError;
use crate::rate_limited_warner::RateLimitedWarner;

/// Why an entry never reached a delivery attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The queue was at capacity when the entry arrived.
    QueueFull,
    /// The sink had already been closed.
    Closed,
    /// Initialisation failed, so no sender thread exists.
    NotStarted,
    /// The entry was still queued when the sink shut down.
    Shutdown,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::QueueFull => "queue full",
            DropReason::Closed => "sink closed",
            DropReason::NotStarted => "sink not started",
            DropReason::Shutdown => "discarded at shutdown",
        })
    }
}

/// Notification passed to a [`SinkObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Dropped { reason: DropReason, count: u64 },
    BatchDelivered { entries: usize },
    BatchFailed { entries: usize, error: DeliveryError },
}

/// Callback receiving [`SinkEvent`]s.
///
/// Invoked synchronously on producer threads (drops) and on the sender
/// thread (deliveries). It must return quickly and must not log through the
/// sink it observes.
pub type SinkObserver = Arc<dyn Fn(&SinkEvent) + Send + Sync>;

/// Cumulative counters for a sink.
#[derive(Debug, Default)]
pub struct SinkStats {
    accepted: AtomicU64,
    dropped_queue_full: AtomicU64,
    dropped_closed: AtomicU64,
    dropped_not_started: AtomicU64,
    dropped_shutdown: AtomicU64,
    batches_delivered: AtomicU64,
    entries_delivered: AtomicU64,
    batches_failed: AtomicU64,
    entries_failed: AtomicU64,
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub dropped_queue_full: u64,
    pub dropped_closed: u64,
    pub dropped_not_started: u64,
    pub dropped_shutdown: u64,
    pub batches_delivered: u64,
    pub entries_delivered: u64,
    pub batches_failed: u64,
    pub entries_failed: u64,
}

impl StatsSnapshot {
    /// Total entries lost before or during delivery.
    pub fn lost(&self) -> u64 {
        self.dropped_queue_full
            + self.dropped_closed
            + self.dropped_not_started
            + self.dropped_shutdown
            + self.entries_failed
    }
}

impl SinkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_closed: self.dropped_closed.load(Ordering::Relaxed),
            dropped_not_started: self.dropped_not_started.load(Ordering::Relaxed),
            dropped_shutdown: self.dropped_shutdown.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            entries_delivered: self.entries_delivered.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            entries_failed: self.entries_failed.load(Ordering::Relaxed),
        }
    }

    fn drop_counter(&self, reason: DropReason) -> &AtomicU64 {
        match reason {
            DropReason::QueueFull => &self.dropped_queue_full,
            DropReason::Closed => &self.dropped_closed,
            DropReason::NotStarted => &self.dropped_not_started,
            DropReason::Shutdown => &self.dropped_shutdown,
        }
    }
}

/// Stats, observer and warners shared by the ingress side and the sender
/// thread.
pub(crate) struct Diagnostics {
    stats: SinkStats,
    observer: Option<SinkObserver>,
    drop_warner: RateLimitedWarner,
    failure_warner: RateLimitedWarner,
}

impl Diagnostics {
    pub(crate) fn new(observer: Option<SinkObserver>, warn_interval: Duration) -> Self {
        Self {
            stats: SinkStats::default(),
            observer,
            drop_warner: RateLimitedWarner::new(warn_interval),
            failure_warner: RateLimitedWarner::new(warn_interval),
        }
    }

    pub(crate) fn stats(&self) -> &SinkStats {
        &self.stats
    }

    fn notify(&self, event: SinkEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
    }

    pub(crate) fn record_accepted(&self) {
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self, reason: DropReason, count: u64) {
        if count == 0 {
            return;
        }
        self.stats
            .drop_counter(reason)
            .fetch_add(count, Ordering::Relaxed);
        self.drop_warner.record(count);
        self.drop_warner.warn_if_due(|total| {
            warn!("splunk sink dropped {total} entries (latest cause: {reason})");
        });
        self.notify(SinkEvent::Dropped { reason, count });
    }

    pub(crate) fn record_delivered(&self, entries: usize) {
        self.stats.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.stats
            .entries_delivered
            .fetch_add(entries as u64, Ordering::Relaxed);
        self.notify(SinkEvent::BatchDelivered { entries });
    }

    pub(crate) fn record_failed(&self, entries: usize, error: DeliveryError) {
        self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .entries_failed
            .fetch_add(entries as u64, Ordering::Relaxed);
        self.failure_warner.record(entries as u64);
        self.failure_warner.warn_if_due(|total| {
            warn!("splunk sink discarded {total} undelivered entries (latest error: {error})");
        });
        self.notify(SinkEvent::BatchFailed { entries, error });
    }

    /// Emit any throttled warnings immediately.
    pub(crate) fn flush_warnings(&self) {
        self.drop_warner.flush(|total| {
            warn!("splunk sink dropped {total} entries in the last interval");
        });
        self.failure_warner.flush(|total| {
            warn!("splunk sink discarded {total} undelivered entries in the last interval");
        });
    }
}
