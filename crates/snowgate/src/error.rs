use crate::Component;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `snowgate` can emit.
///
/// None of these ever produce an ID: a failed call leaves the generator state
/// untouched and returns the reason instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The time source reported a timestamp older than the last one used to
    /// issue an ID.
    ///
    /// Reusing the older timestamp could reproduce an ID that was already
    /// handed out, so the call fails until the clock catches up again.
    #[error("clock moved backward by {drift_ms}ms (last issued at {last_timestamp}, now {now})")]
    ClockMovedBackward {
        /// Milliseconds between the last issued timestamp and `now`.
        drift_ms: u64,
        /// The timestamp of the most recently issued ID.
        last_timestamp: u64,
        /// The regressed reading.
        now: u64,
    },

    /// A caller supplied datacenter or machine id does not fit the layout.
    #[error("{component} id {value} is outside 0..={max}")]
    InvalidIdentifierComponent {
        /// Which component was rejected.
        component: Component,
        /// The value as supplied by the caller.
        value: i64,
        /// The largest value the layout can encode.
        max: u64,
    },

    /// The clock has run past what the timestamp field can encode.
    ///
    /// Either the epoch is too old for the chosen layout, or the layout leaves
    /// too few bits for the timestamp.
    #[error("timestamp {timestamp} exceeds the layout maximum {max}")]
    TimestampOverflow {
        /// Milliseconds since the epoch at the time of the call.
        timestamp: u64,
        /// The largest timestamp the layout can encode.
        max: u64,
    },

    /// The requested bit widths do not describe a usable 63-bit layout.
    #[error("invalid layout: {reason}")]
    InvalidLayout {
        /// Human readable description of the violated constraint.
        reason: &'static str,
    },

    /// The operation failed because the generator lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
