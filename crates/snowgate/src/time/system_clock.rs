use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::TimeSource;

/// A wall-clock time source offset from a user-defined epoch.
///
/// Every call reads `SystemTime::now()`, so NTP steps and manual adjustments
/// are visible to the generator. That is deliberate: a backward step surfaces
/// as [`Error::ClockMovedBackward`] instead of being hidden.
///
/// Readings earlier than the epoch saturate to zero.
///
/// [`Error::ClockMovedBackward`]: crate::Error::ClockMovedBackward
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch_ms: u64,
}

impl Default for SystemClock {
    /// Constructs a wall clock aligned to [`TWITTER_EPOCH`].
    ///
    /// [`TWITTER_EPOCH`]: crate::TWITTER_EPOCH
    fn default() -> Self {
        Self::with_epoch(crate::TWITTER_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a wall clock whose zero point is `epoch`, given as a
    /// [`Duration`] since 1970-01-01 UTC.
    pub fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch_ms: u64::try_from(epoch.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// The configured epoch in milliseconds since the Unix epoch.
    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_ms
    }
}

/// Milliseconds since the Unix epoch according to the system clock, or zero
/// if the system clock is set before 1970.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        unix_millis().saturating_sub(self.epoch_ms)
    }
}
