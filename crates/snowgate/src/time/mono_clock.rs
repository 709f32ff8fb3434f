use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::Arc,
    thread,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::TimeSource;

/// Shared ticker state updated every millisecond.
struct SharedTickerInner {
    current: AtomicU64,
}

/// A monotonic time source that returns elapsed time since construction,
/// offset from a user-defined epoch.
///
/// This avoids wall-clock adjustments (e.g., NTP steps) while still aligning
/// timestamps to a fixed origin. Because it never goes backward, a generator
/// driven by this clock never reports
/// [`Error::ClockMovedBackward`](crate::Error::ClockMovedBackward).
///
/// Internally, a background thread stores the elapsed milliseconds (measured
/// with `Instant`) into a shared atomic. The thread exits once every clone of
/// the clock has been dropped.
#[derive(Clone)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    epoch_offset: u64,
}

impl Default for MonotonicClock {
    /// Constructs a monotonic clock aligned to [`TWITTER_EPOCH`].
    ///
    /// [`TWITTER_EPOCH`]: crate::TWITTER_EPOCH
    fn default() -> Self {
        Self::with_epoch(crate::TWITTER_EPOCH)
    }
}

impl MonotonicClock {
    /// Constructs a monotonic clock using `epoch` (a [`Duration`] since
    /// 1970-01-01 UTC) as t = 0.
    ///
    /// The wall clock is consulted exactly once, here, to compute the offset
    /// between `epoch` and process start. If the system clock is earlier than
    /// `epoch`, the offset is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use snowgate::{MonotonicClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = MonotonicClock::with_epoch(TWITTER_EPOCH);
    /// let a = clock.current_millis();
    /// std::thread::sleep(std::time::Duration::from_millis(5));
    /// assert!(clock.current_millis() >= a);
    /// ```
    pub fn with_epoch(epoch: Duration) -> Self {
        let system_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let offset = system_now
            .checked_sub(epoch)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
        });

        let weak_inner = Arc::downgrade(&inner);
        thread::spawn(move || {
            let start = Instant::now();
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Absolute target time of the next tick
                let target = start + Duration::from_millis(tick);
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let now_ms = start.elapsed().as_millis() as u64;
                inner_ref.current.store(now_ms, Ordering::Release);

                tick = now_ms + 1;
            }
        });

        Self {
            inner,
            epoch_offset: offset,
        }
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.epoch_offset + self.inner.current.load(Ordering::Acquire)
    }
}
