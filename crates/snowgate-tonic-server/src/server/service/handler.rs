//! gRPC service implementation for Snowflake ID generation.
//!
//! This module defines [`IdService`], the concrete implementation of the
//! [`IdGenerator`] gRPC service defined in `proto/snowgate.proto`.
//!
//! ## Responsibilities
//!
//! - Resolve request ids against the node defaults.
//! - Run every request through the shared [`RequestPipeline`].
//! - Map pipeline outcomes onto gRPC responses and statuses.
//! - Coordinate graceful shutdown: refuse new work, end idle sessions and
//!   drain admitted requests.

use crate::server::{
    config::ServerConfig,
    gate::AdmissionGate,
    pipeline::{ReplySlot, RequestPipeline},
    service::{
        config::{Clock, Generator},
        session::run_session,
    },
};
use core::{pin::Pin, time::Duration};
use snowgate_tonic_core::{
    Error,
    proto::{IdParts, IdRequest, IdResponse, ParseIdRequest, id_generator_server::IdGenerator},
    types::{NodeIds, id_parts},
};
use std::sync::Arc;
use tokio::{sync::mpsc, time::sleep};
use tokio_stream::{Stream, wrappers::ReceiverStream};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming};

/// gRPC service issuing Snowflake IDs behind an admission gate.
///
/// Cloning is cheap; clones share the pipeline and shutdown state.
#[derive(Clone)]
pub struct IdService {
    pipeline: Arc<RequestPipeline<Clock>>,
    node: NodeIds,
    epoch_ms: u64,
    stream_buffer_size: usize,
    shutdown_timeout: Duration,
    shutdown_token: CancellationToken,
}

impl IdService {
    pub fn new(config: &ServerConfig) -> Self {
        let generator = Generator::new(config.layout, Clock::new(config.clock, config.epoch));
        let pipeline = RequestPipeline::new(
            AdmissionGate::new(config.max_concurrent_requests),
            generator,
            config.admission_timeout,
        );

        Self {
            pipeline: Arc::new(pipeline),
            node: config.node,
            epoch_ms: u64::try_from(config.epoch.as_millis()).unwrap_or(u64::MAX),
            stream_buffer_size: config.stream_buffer_size,
            shutdown_timeout: config.shutdown_timeout,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Stops accepting requests and waits for admitted ones to finish.
    ///
    /// Closing the gate fails queued and future admissions with
    /// [`Error::ServiceShutdown`]; idle sessions are ended through the
    /// cancellation token. Requests already holding a permit get up to the
    /// configured shutdown timeout to complete.
    ///
    /// # Errors
    ///
    /// Returns an error if requests were still running when the timeout
    /// expired.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("Refusing new requests");
        self.shutdown_token.cancel();
        let gate = self.pipeline.gate();
        gate.close();

        tracing::info!(
            "Draining in-flight requests ({} active)",
            gate.capacity() - gate.available()
        );
        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while gate.available() < gate.capacity() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await;

        match drained {
            Ok(()) => {
                tracing::debug!("All in-flight requests drained");
                Ok(())
            }
            Err(_) => {
                let active = gate.capacity() - gate.available();
                tracing::warn!("Graceful drain timed out ({active} requests still active)");
                anyhow::bail!("{active} requests still active after drain timeout")
            }
        }
    }
}

#[tonic::async_trait]
impl IdGenerator for IdService {
    type SessionStream = Pin<Box<dyn Stream<Item = Result<IdResponse, Status>> + Send>>;

    /// Generates a single ID.
    ///
    /// Overload is answered in-band with `result_id = -1`; every other
    /// failure is returned as a status.
    #[tracing::instrument(skip_all, fields(
        datacenter_id = req.get_ref().requestor_datacenter_id,
        machine_id = req.get_ref().requestor_machine_id,
    ))]
    async fn next_id(&self, req: Request<IdRequest>) -> Result<Response<IdResponse>, Status> {
        let exchange = self.node.resolve(req.get_ref());
        let slot = ReplySlot::default();

        match self.pipeline.handle(exchange, &slot).await {
            Ok(response) => Ok(Response::new(response.into())),
            Err(Error::Overload { .. }) => match slot.into_inner() {
                Some(rejected) => Ok(Response::new(rejected.into())),
                None => Err(Status::internal("overload response was not recorded")),
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Opens a session: one response per request, in order.
    ///
    /// The session ends when the client closes its side, after an overload
    /// (`-1`, then `RESOURCE_EXHAUSTED`), on any generation failure, or at
    /// shutdown.
    async fn session(
        &self,
        req: Request<Streaming<IdRequest>>,
    ) -> Result<Response<Self::SessionStream>, Status> {
        if self.pipeline.gate().is_closed() {
            return Err(Error::ServiceShutdown.into());
        }

        let inbound = req.into_inner();
        let (resp_tx, resp_rx) =
            mpsc::channel::<Result<IdResponse, Status>>(self.stream_buffer_size);

        let fut = run_session(
            Arc::clone(&self.pipeline),
            self.node,
            inbound,
            resp_tx,
            self.shutdown_token.child_token(),
        );
        tokio::spawn(async move {
            match fut.await {
                Ok(()) => tracing::debug!("Session closed"),
                Err(err) => tracing::debug!("Session terminated: {err}"),
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(resp_rx))))
    }

    /// Splits an ID into its fields with this node's layout.
    async fn parse_id(&self, req: Request<ParseIdRequest>) -> Result<Response<IdParts>, Status> {
        let parts = id_parts(
            self.pipeline.generator().layout(),
            req.get_ref().id,
            self.epoch_ms,
        )?;
        Ok(Response::new(parts))
    }
}
