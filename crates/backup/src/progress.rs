//! Progress reporting and cooperative cancellation.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Receives progress from a running import or export.
///
/// The maximum may change while the operation runs: the first value is an
/// estimate and is revised once the real amount of work is known.
pub trait ProgressListener: Send + Sync {
    fn set_max(&self, max: u64);

    /// Advance by `delta` steps, optionally with a status message.
    fn publish(&self, delta: u64, message: Option<&str>);

    /// Polled between phases and between entries. Work already in flight for
    /// one entry is allowed to finish.
    fn is_cancelled(&self) -> bool;
}

/// Atomic progress counter with a cancellation flag.
///
/// Messages are logged at most once per interval.
#[derive(Debug)]
pub struct Progress {
    max: AtomicU64,
    position: AtomicU64,
    cancelled: AtomicBool,
    interval: Duration,
    last_logged: Mutex<Option<Instant>>,
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl Progress {
    pub fn new(interval: Duration) -> Self {
        Self {
            max: AtomicU64::new(0),
            position: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
            interval,
            last_logged: Mutex::new(None),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn due(&self) -> bool {
        let Ok(mut last) = self.last_logged.lock() else {
            return false;
        };
        let now = Instant::now();
        match *last {
            Some(at) if now.duration_since(at) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            },
        }
    }
}

impl ProgressListener for Progress {
    fn set_max(&self, max: u64) {
        self.max.store(max, Ordering::Relaxed);
    }

    fn publish(&self, delta: u64, message: Option<&str>) {
        let position = self.position.fetch_add(delta, Ordering::Relaxed) + delta;
        if let Some(message) = message
            && self.due()
        {
            tracing::debug!(position, max = self.max(), message, "progress");
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_revise_max() {
        let progress = Progress::default();
        progress.set_max(10);
        progress.publish(3, None);
        progress.publish(2, Some("books"));
        assert_eq!(progress.position(), 5);
        progress.set_max(4);
        assert_eq!(progress.max(), 4);
    }

    #[test]
    fn test_cancel() {
        let progress = Progress::default();
        assert!(!progress.is_cancelled());
        progress.cancel();
        assert!(progress.is_cancelled());
    }

    #[test]
    fn test_message_throttling() {
        let progress = Progress::new(Duration::from_secs(3600));
        assert!(progress.due());
        assert!(!progress.due());
    }
}
