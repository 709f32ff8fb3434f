//! Bounded admission in front of ID generation.
//!
//! [`AdmissionGate`] is a counting semaphore with a timed acquire. A request
//! that cannot get a permit within its timeout is rejected with
//! [`Error::Overload`] rather than queued indefinitely. Permits are RAII
//! guards, so every exit path (success, failure, task cancellation) returns
//! them exactly once.

use core::time::Duration;
use portable_atomic::{AtomicUsize, Ordering};
use snowgate_tonic_core::Error;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
    waiting: AtomicUsize,
}

/// Proof of admission. Dropping it returns the permit to the gate.
#[must_use = "dropping the permit releases admission immediately"]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    /// Returns the permit to the gate.
    pub fn release(self) {
        drop(self);
    }
}

/// Counts an acquirer as waiting for as long as it is alive, including when
/// the acquiring future is dropped mid-wait.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl AdmissionGate {
    /// Creates a gate admitting at most `capacity` concurrent holders.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Semaphore::MAX_PERMITS`]; the server
    /// configuration rejects such values before a gate is built.
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            waiting: AtomicUsize::new(0),
        }
    }

    /// Waits up to `timeout` for a permit.
    ///
    /// A zero `timeout` makes a single non-blocking attempt.
    ///
    /// # Errors
    ///
    /// - [`Error::Overload`] if no permit became available in time
    /// - [`Error::ServiceShutdown`] if the gate is (or becomes) closed
    pub async fn acquire(&self, timeout: Duration) -> Result<AdmissionPermit, Error> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => return Ok(AdmissionPermit { _permit: permit }),
            Err(TryAcquireError::Closed) => return Err(Error::ServiceShutdown),
            Err(TryAcquireError::NoPermits) if timeout.is_zero() => {
                return Err(self.overload(timeout));
            }
            Err(TryAcquireError::NoPermits) => {}
        }

        let waited = {
            let _waiting = WaitingGuard::enter(&self.waiting);
            tokio::time::timeout(timeout, Arc::clone(&self.permits).acquire_owned()).await
        };

        match waited {
            Ok(Ok(permit)) => Ok(AdmissionPermit { _permit: permit }),
            Ok(Err(_closed)) => Err(Error::ServiceShutdown),
            Err(_elapsed) => Err(self.overload(timeout)),
        }
    }

    #[cold]
    fn overload(&self, timeout: Duration) -> Error {
        Error::Overload {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waiting: self.waiting(),
            available: self.available(),
        }
    }

    /// Acquirers currently blocked in [`Self::acquire`].
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Permits not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fails all current and future waiters with [`Error::ServiceShutdown`].
    ///
    /// Permits already handed out stay valid and still count back into
    /// [`Self::available`] when released.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}
