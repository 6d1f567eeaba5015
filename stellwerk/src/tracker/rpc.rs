use super::{Tracker, TrackerError};
use crate::BoxError;
use async_trait::async_trait;
use siegel::PeerId;
use spurplan::{
    message::{tracker, TrackerMessage},
    Node, NodeId,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use telegramm::{
    client::Client,
    server::{Handler, Response, Server, ServerRequest},
    Address,
};
use tokio::net::TcpListener;

/// A tracker client talking to a remote tracker over `telegramm`.
#[derive(Debug, Clone)]
pub struct RpcTracker {
    addr: Address,
}

impl RpcTracker {
    /// Create a client for the tracker listening at `addr`.
    #[must_use]
    pub const fn new(addr: Address) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl Tracker for RpcTracker {
    async fn register_node(
        &self,
        peer_id: PeerId,
        address: Address,
    ) -> Result<Node, TrackerError> {
        let mut client = Client::new(self.addr.clone());
        Ok(client
            .send_request(tracker::Register(peer_id, address))
            .await?)
    }

    async fn update_nodes(&self) -> Result<HashMap<NodeId, Node>, TrackerError> {
        let mut client = Client::new(self.addr.clone());
        Ok(client.send_request(tracker::ListNodes).await?)
    }
}

/// Expose any [`Tracker`] implementation over the wire.
#[derive(Clone)]
pub struct TrackerService {
    tracker: Arc<dyn Tracker>,
}

impl TrackerService {
    /// Create a new service for the given tracker.
    #[must_use]
    pub fn new(tracker: Arc<dyn Tracker>) -> Self {
        Self { tracker }
    }

    /// The main server loop.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        Server::new(self).serve(listener).await
    }
}

#[async_trait]
impl Handler<TrackerMessage> for TrackerService {
    async fn handle(&self, _addr: &SocketAddr, req: TrackerMessage) -> Result<Response, BoxError> {
        match req {
            TrackerMessage::Register(params) => {
                let tracker::Register(peer_id, address) = params;
                tracker::Register::response(
                    self.tracker.register_node(peer_id, address).await?,
                )
            }
            TrackerMessage::ListNodes(_) => {
                tracker::ListNodes::response(self.tracker.update_nodes().await?)
            }
        }
    }
}
