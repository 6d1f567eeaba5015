//! A server accepting transfers from other nodes.

use super::{message, PeerMessage, Pong};
use crate::{communication::Communication, BoxError};
use async_trait::async_trait;
use std::{net::SocketAddr, sync::Arc};
use telegramm::server::{Handler, Response, Server, ServerRequest};
use tokio::net::TcpListener;

/// A receiver (server) instance.
///
/// Every connection is handled on its own task; the effects of each
/// delivered transaction are serialized through the node's store service.
#[derive(Clone)]
pub struct Receiver {
    communication: Arc<Communication>,
}

impl Receiver {
    /// Create a new receiver instance.
    #[must_use]
    pub const fn new(communication: Arc<Communication>) -> Self {
        Self { communication }
    }

    /// The main server loop.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        Server::new(self).serve(listener).await
    }
}

#[async_trait]
impl Handler<PeerMessage> for Receiver {
    async fn handle(&self, addr: &SocketAddr, req: PeerMessage) -> Result<Response, BoxError> {
        match req {
            PeerMessage::SendTransaction(params) => {
                let message::SendTransaction(proof) = params;
                match self.communication.receive_transaction(proof).await {
                    Ok(()) => message::SendTransaction::response(()),
                    Err(err) => {
                        log::warn!("Rejected transaction from {}: {}", addr, err);
                        Err(err.into())
                    }
                }
            }
            PeerMessage::Ping(_) => message::Ping::response(Pong),
        }
    }
}
