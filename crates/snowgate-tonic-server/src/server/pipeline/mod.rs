//! Per-request handling: admission, generation and response.
//!
//! Each request moves through
//! `Received -> Admitting -> {Admitted -> Generating -> {Succeeded | Failed} | Rejected}`.
//!
//! - Rejected (admission timed out): the request is answered with
//!   [`OVERLOAD_SENTINEL`] and the caller gets [`Error::Overload`].
//! - Succeeded: the ID is sent, then the permit is released.
//! - Failed (generator error): nothing is sent; the permit is released and the
//!   caller gets [`Error::IdGeneration`].
//!
//! ## Structure
//!
//! - [`sink`] - The [`ResponseSink`] seam to the transport.

pub mod sink;

#[cfg(test)]
mod tests;

use crate::server::{
    gate::AdmissionGate,
    telemetry::{
        decrement_requests_inflight, increment_generator_failures, increment_ids_generated,
        increment_overload_rejections, increment_requests, increment_requests_inflight,
        record_admission_wait,
    },
};
use core::time::Duration;
use snowgate_tonic_core::{
    Error, Result,
    snowgate::{SnowflakeGenerator, SnowflakeGeneratorAsyncExt, TimeSource, TokioSleep},
    types::{IdExchange, OVERLOAD_SENTINEL},
};
use tokio::time::Instant;

pub use sink::{ReplySlot, ResponseSink};

/// Tracks one admitted request in the `requests_inflight` gauge.
struct InflightGuard;

impl InflightGuard {
    fn enter() -> Self {
        increment_requests_inflight();
        Self
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        decrement_requests_inflight();
    }
}

pub struct RequestPipeline<T>
where
    T: TimeSource,
{
    gate: AdmissionGate,
    generator: SnowflakeGenerator<T>,
    admission_timeout: Duration,
}

impl<T> RequestPipeline<T>
where
    T: TimeSource + Send + Sync,
{
    pub const fn new(
        gate: AdmissionGate,
        generator: SnowflakeGenerator<T>,
        admission_timeout: Duration,
    ) -> Self {
        Self {
            gate,
            generator,
            admission_timeout,
        }
    }

    pub const fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub const fn generator(&self) -> &SnowflakeGenerator<T> {
        &self.generator
    }

    /// Runs one request to completion and returns the exchange that was sent.
    ///
    /// At most one response reaches `sink`: the generated ID, or
    /// [`OVERLOAD_SENTINEL`] when admission times out. Generator failures
    /// send nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::Overload`] after the sentinel was sent
    /// - [`Error::ServiceShutdown`] if the gate is closed
    /// - [`Error::IdGeneration`] if the generator refused the request
    /// - [`Error::Transport`] if `sink` could not deliver the response
    pub async fn handle<S>(&self, exchange: IdExchange, sink: &S) -> Result<IdExchange>
    where
        S: ResponseSink + Sync,
    {
        increment_requests();
        tracing::debug!(
            datacenter_id = exchange.requestor_datacenter_id,
            machine_id = exchange.requestor_machine_id,
            "Request received"
        );

        let admitting = Instant::now();
        let admission = self.gate.acquire(self.admission_timeout).await;
        record_admission_wait(admitting.elapsed().as_secs_f64() * 1_000.0);

        let permit = match admission {
            Ok(permit) => permit,
            Err(err @ Error::Overload { .. }) => {
                increment_overload_rejections();
                tracing::warn!(
                    datacenter_id = exchange.requestor_datacenter_id,
                    machine_id = exchange.requestor_machine_id,
                    "{err}"
                );
                sink.send(exchange.respond(OVERLOAD_SENTINEL)).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let generated = {
            let _inflight = InflightGuard::enter();
            self.generator
                .try_next_id_async::<TokioSleep>(
                    i64::from(exchange.requestor_datacenter_id),
                    i64::from(exchange.requestor_machine_id),
                )
                .await
        };

        let id = match generated {
            Ok(id) => id,
            Err(err) => {
                permit.release();
                increment_generator_failures();
                tracing::error!(
                    datacenter_id = exchange.requestor_datacenter_id,
                    machine_id = exchange.requestor_machine_id,
                    "ID generation failed: {err}"
                );
                return Err(err.into());
            }
        };

        let response = exchange.respond(id.to_i64());
        let sent = sink.send(response).await;
        permit.release();
        sent?;

        increment_ids_generated();
        tracing::debug!(result_id = response.result_id, "Request answered");
        Ok(response)
    }
}
