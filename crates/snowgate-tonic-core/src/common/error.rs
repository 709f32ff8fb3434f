//! Error types for the ID generation service.
//!
//! This module defines the central `Error` enum, which captures every failure
//! a request can end in. It implements `From<Error>` for `tonic::Status` so
//! the transport can report each case with a distinct status code.
//!
//! ## Error Cases
//! - `Overload`: No admission permit became available in time. This is the
//!   only case with an in-band representation (`result_id = -1`).
//! - `IdGeneration`: The generator refused to produce an ID (clock
//!   regression, out-of-range component, timestamp overflow).
//! - `Transport`: The response could not be handed to the client.
//! - `InvalidRequest`: The client request was malformed.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use snowgate::Error as IdError;
use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the ID generation service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Admission timed out.
    #[error(
        "Overloaded: no permit within {timeout_ms}ms ({waiting} waiting, {available} available)"
    )]
    Overload {
        timeout_ms: u64,
        /// Acquirers still blocked when this one gave up.
        waiting: usize,
        /// Permits available when this one gave up.
        available: usize,
    },

    /// Underlying Snowflake ID generation failed.
    #[error("ID error: {0}")]
    IdGeneration(#[from] IdError),

    /// The response could not be delivered (e.g., the client hung up).
    #[error("Transport error: {context}")]
    Transport { context: String },

    /// The client request was invalid.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// Whether a retry at a later time may succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Overload { .. } | Self::IdGeneration(IdError::ClockMovedBackward { .. })
        )
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        match err {
            Error::Overload { .. } => Status::resource_exhausted(message),
            Error::IdGeneration(e) => match e {
                IdError::InvalidIdentifierComponent { .. } => Status::invalid_argument(message),
                IdError::ClockMovedBackward { .. } => Status::unavailable(message),
                _ => Status::internal(message),
            },
            Error::Transport { .. } => Status::aborted(message),
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::ServiceShutdown => Status::unavailable(message),
        }
    }
}
