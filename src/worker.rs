//! Sender thread draining the entry queue.
//!
//! The thread repeatedly drains every queued entry, serialises the batch and
//! hands it to the [`Transport`] once. Failed batches are discarded, never
//! requeued. When nothing is queued it sleeps on the queue for the idle wait
//! and exits once the queue is closed and empty.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use log::{debug, warn};

use crate::error::DeliveryError;
use crate::http::Transport;
use crate::queue::EntryQueue;
use crate::serialise::serialise_batch;
use crate::stats::Diagnostics;

/// Name given to the sender thread.
pub const WORKER_THREAD_NAME: &str = "splunk-trace-sink";

/// Handle to a running sender thread.
pub(crate) struct WorkerHandle {
    handle: JoinHandle<()>,
    done_rx: Receiver<()>,
}

/// Start the sender thread.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be spawned.
pub(crate) fn spawn_worker(
    queue: Arc<EntryQueue>,
    mut transport: Box<dyn Transport>,
    diagnostics: Arc<Diagnostics>,
    idle_wait: Duration,
) -> io::Result<WorkerHandle> {
    let (done_tx, done_rx) = bounded(1);
    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_owned())
        .spawn(move || {
            run(&queue, transport.as_mut(), &diagnostics, idle_wait);
            let _ = done_tx.send(());
        })?;
    Ok(WorkerHandle { handle, done_rx })
}

fn run(
    queue: &EntryQueue,
    transport: &mut dyn Transport,
    diagnostics: &Diagnostics,
    idle_wait: Duration,
) {
    loop {
        let batch = queue.drain_all();
        if !batch.is_empty() {
            let count = batch.len();
            let outcome = serialise_batch(&batch)
                .map_err(|err| DeliveryError::Encode(err.to_string()))
                .and_then(|body| transport.deliver(&body));
            match outcome {
                Ok(()) => diagnostics.record_delivered(count),
                Err(err) => {
                    debug!("splunk sink batch of {count} entries failed: {err}");
                    diagnostics.record_failed(count, err);
                }
            }
            queue.finish_batch();
            continue;
        }

        queue.finish_batch();
        if queue.is_closed() {
            break;
        }
        queue.wait_for_work(idle_wait);
    }
    debug!("splunk sink sender thread exiting");
}

impl WorkerHandle {
    /// Wait up to `grace` for the thread to finish, then join it.
    ///
    /// The queue must already be closed. If the thread is still busy when
    /// `grace` runs out it is detached and left to finish its current
    /// request on its own.
    pub(crate) fn stop(self, grace: Duration) {
        match self.done_rx.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    warn!("splunk sink: sender thread panicked");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !grace.is_zero() {
                    warn!(
                        "splunk sink: sender thread did not finish within {}ms; detaching",
                        grace.as_millis()
                    );
                }
            }
        }
    }
}
