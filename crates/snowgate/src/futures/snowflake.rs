use core::{future::Future, time::Duration};

use super::SleepProvider;
use crate::{Poll, Result, SnowflakeGenerator, SnowflakeId, TimeSource};

/// Extension trait for asynchronously generating Snowflake IDs.
///
/// When the current millisecond's sequence is exhausted, the returned future
/// releases the generator lock and sleeps through the given
/// [`SleepProvider`] instead of spinning on a runtime worker thread.
pub trait SnowflakeGeneratorAsyncExt {
    /// Returns a future that resolves to the next available Snowflake ID for
    /// the given datacenter and machine ids.
    ///
    /// # Errors
    ///
    /// Resolves to any error [`SnowflakeGenerator::try_poll_id`] returns. An
    /// error ends the future immediately; it is never retried.
    fn try_next_id_async<S>(
        &self,
        datacenter_id: i64,
        machine_id: i64,
    ) -> impl Future<Output = Result<SnowflakeId>> + Send
    where
        S: SleepProvider;
}

impl<T> SnowflakeGeneratorAsyncExt for SnowflakeGenerator<T>
where
    T: TimeSource + Send + Sync,
{
    fn try_next_id_async<S>(
        &self,
        datacenter_id: i64,
        machine_id: i64,
    ) -> impl Future<Output = Result<SnowflakeId>> + Send
    where
        S: SleepProvider,
    {
        async move {
            loop {
                let dur = match self.try_poll_id(datacenter_id, machine_id)? {
                    Poll::Ready { id } => return Ok(id),
                    Poll::Pending { yield_for } => Duration::from_millis(yield_for),
                };
                S::sleep_for(dur).await;
            }
        }
    }
}
