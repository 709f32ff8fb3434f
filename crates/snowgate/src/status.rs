use crate::SnowflakeId;

/// Represents the result of a single attempt to generate a Snowflake ID.
///
/// This type models the outcome of
/// [`SnowflakeGenerator::try_poll_id`](crate::SnowflakeGenerator::try_poll_id):
///
/// - [`Poll::Ready`] indicates a new ID was successfully generated.
/// - [`Poll::Pending`] means the sequence for the current millisecond is
///   exhausted and no ID can be produced until the clock advances.
///
/// This allows non-blocking generation loops and clean backoff strategies.
///
/// # Example
///
/// ```
/// use snowgate::{Poll, SnowflakeGenerator, SnowflakeLayout, TimeSource};
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1
///     }
/// }
///
/// let layout = SnowflakeLayout::TWITTER;
/// let generator = SnowflakeGenerator::from_components(layout, 1, layout.max_sequence(), FixedTime);
/// match generator.try_poll_id(0, 0).unwrap() {
///     Poll::Ready { id } => println!("ID: {id}"),
///     Poll::Pending { yield_for } => println!("Back off for {yield_for}ms"),
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated Snowflake ID.
        id: SnowflakeId,
    },
    /// The sequence has been exhausted for the current millisecond.
    ///
    /// Wait at least `yield_for` milliseconds before trying again.
    Pending {
        /// Milliseconds until the next ID can be issued.
        yield_for: u64,
    },
}
