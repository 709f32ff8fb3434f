use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Component, Error, Mutex, Poll, Result, SnowflakeId, SnowflakeLayout, SnowflakeParts,
    TimeSource,
};

/// The mutable part of a generator: the timestamp of the last issued ID, the
/// sequence used within that millisecond, and the raw ID itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct State {
    timestamp: u64,
    sequence: u64,
    last_id: Option<u64>,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// Only the last `(timestamp, sequence)` pair and the last issued ID are
/// shared state, guarded by a mutex. The datacenter and machine ids are
/// supplied on every call.
///
/// ## Guarantees
/// - IDs strictly increase in the order calls complete, whatever datacenter
///   and machine ids they pass. A call whose ID would not exceed the last one
///   within the same millisecond reports [`Poll::Pending`] and lands in the
///   next millisecond.
/// - Two calls on the same instance never return the same ID.
/// - If the clock reports a time older than the last issued timestamp, the
///   call fails with [`Error::ClockMovedBackward`].
///
/// ## See Also
/// - [`SnowflakeGeneratorAsyncExt`] for awaiting exhausted sequences
///
/// [`SnowflakeGeneratorAsyncExt`]: crate::SnowflakeGeneratorAsyncExt
pub struct SnowflakeGenerator<T>
where
    T: TimeSource,
{
    layout: SnowflakeLayout,
    state: Mutex<State>,
    time: T,
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a new [`SnowflakeGenerator`] with zeroed state.
    ///
    /// # Parameters
    ///
    /// - `layout`: The bit layout every generated ID is packed with.
    /// - `time`: A [`TimeSource`] implementation (e.g., [`SystemClock`]) that
    ///   supplies milliseconds since the epoch.
    ///
    /// # Example
    /// ```
    /// use snowgate::{SnowflakeGenerator, SnowflakeLayout, SystemClock, TWITTER_EPOCH};
    ///
    /// let generator = SnowflakeGenerator::new(
    ///     SnowflakeLayout::TWITTER,
    ///     SystemClock::with_epoch(TWITTER_EPOCH),
    /// );
    ///
    /// let id = generator
    ///     .try_next_id(1, 2, |_| std::thread::yield_now())
    ///     .unwrap();
    /// let parts = generator.layout().decompose(id);
    /// assert_eq!((parts.datacenter_id, parts.machine_id), (1, 2));
    /// ```
    ///
    /// [`SystemClock`]: crate::SystemClock
    pub fn new(layout: SnowflakeLayout, time: T) -> Self {
        Self {
            layout,
            state: Mutex::new(State::default()),
            time,
        }
    }

    /// Creates a new generator whose last issued ID had the given timestamp
    /// and sequence.
    ///
    /// This is primarily useful for restoring state or for tests that need to
    /// start at a specific point, such as an exhausted sequence.
    ///
    /// The ids the last ID was issued for are unknown, so the restored last ID
    /// assumes the largest datacenter and machine ids. Further calls in
    /// `timestamp` wait for the next millisecond.
    ///
    /// # ⚠️ Note
    /// In typical use cases, you should prefer [`Self::new`].
    pub fn from_components(layout: SnowflakeLayout, timestamp: u64, sequence: u64, time: T) -> Self {
        let last_id = layout
            .compose(SnowflakeParts {
                timestamp,
                datacenter_id: layout.max_datacenter_id(),
                machine_id: layout.max_machine_id(),
                sequence,
            })
            .to_raw();
        Self {
            layout,
            state: Mutex::new(State {
                timestamp,
                sequence,
                last_id: Some(last_id),
            }),
            time,
        }
    }

    /// The layout IDs are packed with.
    pub const fn layout(&self) -> &SnowflakeLayout {
        &self.layout
    }

    /// Generates a new ID, calling `f` with the number of milliseconds to
    /// back off whenever the current millisecond's sequence is exhausted.
    ///
    /// The lock is not held while `f` runs.
    ///
    /// # Errors
    ///
    /// Returns every error [`Self::try_poll_id`] can return.
    ///
    /// # Example
    /// ```
    /// use snowgate::{SnowflakeGenerator, SnowflakeLayout, SystemClock};
    ///
    /// let generator = SnowflakeGenerator::new(SnowflakeLayout::TWITTER, SystemClock::default());
    /// let id = generator
    ///     .try_next_id(0, 0, |ms| std::thread::sleep(std::time::Duration::from_millis(ms)))
    ///     .unwrap();
    /// assert!(id.to_i64() > 0);
    /// ```
    pub fn try_next_id(
        &self,
        datacenter_id: i64,
        machine_id: i64,
        mut f: impl FnMut(u64),
    ) -> Result<SnowflakeId> {
        loop {
            match self.try_poll_id(datacenter_id, machine_id)? {
                Poll::Ready { id } => break Ok(id),
                Poll::Pending { yield_for } => f(yield_for),
            }
        }
    }

    /// Attempts to generate the next ID without waiting.
    ///
    /// # Returns
    /// - `Ok(Poll::Ready { id })`: A new ID is available
    /// - `Ok(Poll::Pending { yield_for })`: No larger ID fits in this
    ///   millisecond, either because the sequence is exhausted or because the
    ///   last ID carried larger datacenter/machine ids; retry after
    ///   `yield_for` milliseconds
    ///
    /// # Errors
    /// - [`Error::InvalidIdentifierComponent`] if either id does not fit the
    ///   layout
    /// - [`Error::ClockMovedBackward`] if the clock reads earlier than the
    ///   last issued timestamp
    /// - [`Error::TimestampOverflow`] if the clock reads past the timestamp
    ///   field
    /// - `Error::LockPoisoned` if another thread panicked while generating
    ///   (std mutex only)
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self, datacenter_id: i64, machine_id: i64) -> Result<Poll> {
        let datacenter_id = self
            .layout
            .check_component(Component::Datacenter, datacenter_id)?;
        let machine_id = self.layout.check_component(Component::Machine, machine_id)?;

        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        // Read the clock under the lock. A reading taken before it could be
        // older than one a concurrent caller already stored.
        let now = self.time.current_millis();
        if now > self.layout.max_timestamp() {
            return Err(self.cold_timestamp_overflow(now));
        }

        let sequence = match now.cmp(&state.timestamp) {
            Ordering::Equal if state.sequence < self.layout.max_sequence() => state.sequence + 1,
            Ordering::Equal => return Ok(Poll::Pending { yield_for: 1 }),
            Ordering::Greater => 0,
            Ordering::Less => return Err(Self::cold_clock_behind(now, state.timestamp)),
        };

        let id = self.layout.compose(SnowflakeParts {
            timestamp: now,
            datacenter_id,
            machine_id,
            sequence,
        });
        // Ids sit above the sequence, so smaller ids than the last caller's
        // cannot follow it within the same millisecond.
        if state.last_id.is_some_and(|last| id.to_raw() <= last) {
            return Ok(Poll::Pending { yield_for: 1 });
        }

        *state = State {
            timestamp: now,
            sequence,
            last_id: Some(id.to_raw()),
        };
        Ok(Poll::Ready { id })
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last_timestamp: u64) -> Error {
        Error::ClockMovedBackward {
            drift_ms: last_timestamp - now,
            last_timestamp,
            now,
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_timestamp_overflow(&self, now: u64) -> Error {
        Error::TimestampOverflow {
            timestamp: now,
            max: self.layout.max_timestamp(),
        }
    }
}
