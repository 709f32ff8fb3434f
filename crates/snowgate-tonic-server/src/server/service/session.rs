use crate::server::pipeline::RequestPipeline;
use futures::{Stream, StreamExt};
use snowgate_tonic_core::{
    Error, Result,
    proto::{IdRequest, IdResponse},
    snowgate::TimeSource,
    types::NodeIds,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tonic::Status;

/// Serves one bidirectional session until the client closes it, an error
/// ends it, or the service shuts down.
///
/// Requests are handled strictly in order, one response each. Any pipeline
/// error closes the session: the error is forwarded to the client as a
/// status (after the `-1` response in the overload case) and returned so the
/// caller can record it. Shutdown is only observed between requests, so an
/// admitted request always finishes.
pub async fn run_session<T, I>(
    pipeline: Arc<RequestPipeline<T>>,
    node: NodeIds,
    mut inbound: I,
    resp_tx: mpsc::Sender<core::result::Result<IdResponse, Status>>,
    shutdown: CancellationToken,
) -> Result<()>
where
    T: TimeSource + Send + Sync,
    I: Stream<Item = core::result::Result<IdRequest, Status>> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                // Best effort; the client may already be gone.
                let _ = resp_tx.send(Err(Error::ServiceShutdown.into())).await;
                return Err(Error::ServiceShutdown);
            }
            next = inbound.next() => next,
        };

        let request = match next {
            Some(Ok(request)) => request,
            Some(Err(status)) => {
                tracing::debug!("Session ended by client error: {status}");
                return Ok(());
            }
            None => return Ok(()),
        };

        if let Err(err) = pipeline.handle(node.resolve(&request), &resp_tx).await {
            // A transport error means the client can no longer be reached.
            if !matches!(err, Error::Transport { .. }) {
                if let Err(_e) = resp_tx.send(Err(err.clone().into())).await {
                    tracing::debug!("Failed to forward session error: {err}");
                }
            }
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::gate::AdmissionGate;
    use core::time::Duration;
    use futures::stream;
    use snowgate_tonic_core::snowgate::{SnowflakeGenerator, SnowflakeLayout, SystemClock};
    use tonic::Code;

    fn pipeline(capacity: usize) -> Arc<RequestPipeline<SystemClock>> {
        Arc::new(RequestPipeline::new(
            AdmissionGate::new(capacity),
            SnowflakeGenerator::new(SnowflakeLayout::TWITTER, SystemClock::default()),
            Duration::from_millis(50),
        ))
    }

    fn request(datacenter_id: i32, machine_id: i32) -> core::result::Result<IdRequest, Status> {
        Ok(IdRequest {
            requestor_datacenter_id: Some(datacenter_id),
            requestor_machine_id: Some(machine_id),
        })
    }

    #[tokio::test]
    async fn answers_each_request_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = stream::iter(vec![
            request(1, 1),
            request(1, 2),
            Ok(IdRequest::default()),
        ]);

        let node = NodeIds {
            datacenter_id: 5,
            machine_id: 6,
        };
        run_session(pipeline(1), node, inbound, tx, CancellationToken::new())
            .await
            .unwrap();

        let mut responses = Vec::new();
        while let Some(response) = rx.recv().await {
            responses.push(response.unwrap());
        }
        let echoed: Vec<_> = responses
            .iter()
            .map(|r| (r.requestor_datacenter_id, r.requestor_machine_id))
            .collect();
        assert_eq!(echoed, vec![(1, 1), (1, 2), (5, 6)]);
        assert!(responses.iter().all(|r| r.result_id > 0));
    }

    #[tokio::test(start_paused = true)]
    async fn overload_sends_sentinel_then_closes() {
        let pipeline = pipeline(1);
        let _held = pipeline.gate().acquire(Duration::ZERO).await.unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = stream::iter(vec![request(0, 0), request(0, 0)]);

        let err = run_session(
            Arc::clone(&pipeline),
            NodeIds::default(),
            inbound,
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Overload { .. }));

        assert_eq!(rx.recv().await.unwrap().unwrap().result_id, -1);
        assert_eq!(
            rx.recv().await.unwrap().unwrap_err().code(),
            Code::ResourceExhausted
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn generator_failure_closes_without_id() {
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = stream::iter(vec![request(99, 0), request(0, 0)]);

        let err = run_session(
            pipeline(1),
            NodeIds::default(),
            inbound,
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::IdGeneration(_)));

        assert_eq!(
            rx.recv().await.unwrap().unwrap_err().code(),
            Code::InvalidArgument
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_ends_idle_session() {
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let err = run_session(
            pipeline(1),
            NodeIds::default(),
            stream::pending::<core::result::Result<IdRequest, Status>>(),
            tx,
            shutdown,
        )
        .await
        .unwrap_err();
        assert_eq!(err, Error::ServiceShutdown);
        assert_eq!(
            rx.recv().await.unwrap().unwrap_err().code(),
            Code::Unavailable
        );
    }

    #[tokio::test]
    async fn client_error_ends_session_quietly() {
        let (tx, mut rx) = mpsc::channel(8);
        let inbound = stream::iter(vec![request(0, 0), Err(Status::cancelled("gone"))]);

        run_session(
            pipeline(1),
            NodeIds::default(),
            inbound,
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(rx.recv().await.unwrap().is_ok());
        assert!(rx.recv().await.is_none());
    }
}
