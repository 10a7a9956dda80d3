use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default interval between warnings about dropped or undelivered entries.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Helper that rate limits warnings about lost entries.
///
/// The caller increments the counter via [`record`](Self::record). The next
/// call to [`warn_if_due`](Self::warn_if_due) emits a warning using the
/// provided callback if the configured interval has elapsed.
/// [`flush`](Self::flush) emits a warning immediately if anything has been
/// counted since the last emission.
pub struct RateLimitedWarner {
    interval_ms: u64,
    last_warn: AtomicU64,
    pending: AtomicU64,
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}

impl RateLimitedWarner {
    /// Create a new [`RateLimitedWarner`]. The first warning can be emitted
    /// immediately.
    pub fn new(interval: Duration) -> Self {
        let interval_ms = interval.as_millis() as u64;
        Self {
            interval_ms,
            last_warn: AtomicU64::new(now_millis().saturating_sub(interval_ms)),
            pending: AtomicU64::new(0),
        }
    }

    /// Add `count` to the pending counter.
    pub fn record(&self, count: u64) {
        self.pending.fetch_add(count, Ordering::Relaxed);
    }

    /// Emit a warning if the rate limit interval has elapsed.
    pub fn warn_if_due(&self, mut warn: impl FnMut(u64)) {
        let now = now_millis();
        let prev = self.last_warn.load(Ordering::Relaxed);
        if now.saturating_sub(prev) >= self.interval_ms {
            let count = self.pending.swap(0, Ordering::Relaxed);
            if count > 0 {
                warn(count);
            }
            self.last_warn.store(now, Ordering::Relaxed);
        }
    }

    /// Immediately warn about anything still pending.
    pub fn flush(&self, mut warn: impl FnMut(u64)) {
        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn.store(now_millis(), Ordering::Relaxed);
        }
    }
}
