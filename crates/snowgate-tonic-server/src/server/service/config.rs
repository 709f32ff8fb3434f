use crate::server::config::ClockKind;
use core::time::Duration;
use snowgate_tonic_core::snowgate::{
    MonotonicClock, SnowflakeGenerator, SystemClock, TimeSource,
};

/// Clock implementation selected at startup.
///
/// This controls how timestamps are embedded into generated IDs.
#[derive(Clone)]
pub enum Clock {
    System(SystemClock),
    Monotonic(MonotonicClock),
}

impl Clock {
    pub fn new(kind: ClockKind, epoch: Duration) -> Self {
        match kind {
            ClockKind::System => Self::System(SystemClock::with_epoch(epoch)),
            ClockKind::Monotonic => Self::Monotonic(MonotonicClock::with_epoch(epoch)),
        }
    }
}

impl TimeSource for Clock {
    fn current_millis(&self) -> u64 {
        match self {
            Self::System(clock) => clock.current_millis(),
            Self::Monotonic(clock) => clock.current_millis(),
        }
    }
}

/// The generator shared by every request on this node.
pub type Generator = SnowflakeGenerator<Clock>;
