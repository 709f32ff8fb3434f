use core::future::Future;
use snowgate_tonic_core::{Error, Result, proto::IdResponse, types::IdExchange};
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tonic::Status;

/// Where the pipeline delivers a request's single response.
///
/// Implemented for a session's outbound channel and for [`ReplySlot`], which
/// backs unary calls.
pub trait ResponseSink {
    /// Delivers `response` to the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the client can no longer receive it.
    fn send(&self, response: IdExchange) -> impl Future<Output = Result<()>> + Send;
}

impl ResponseSink for mpsc::Sender<core::result::Result<IdResponse, Status>> {
    async fn send(&self, response: IdExchange) -> Result<()> {
        mpsc::Sender::send(self, Ok(response.into()))
            .await
            .map_err(|_| Error::Transport {
                context: "session response stream closed".to_string(),
            })
    }
}

/// Holds the one response of a unary call until the handler returns it.
#[derive(Debug, Default)]
pub struct ReplySlot {
    response: OnceLock<IdExchange>,
}

impl ReplySlot {
    pub fn into_inner(self) -> Option<IdExchange> {
        self.response.into_inner()
    }
}

impl ResponseSink for ReplySlot {
    async fn send(&self, response: IdExchange) -> Result<()> {
        self.response.set(response).map_err(|_| Error::Transport {
            context: "unary response already sent".to_string(),
        })
    }
}
