use super::{MainChainClient, MainChainError};
use crate::BoxError;
use async_trait::async_trait;
use siegel::Signed;
use spurplan::{
    message::{main_chain, MainChainMessage},
    BlockAbstract, BlockHash, ChainStatus,
};
use std::{net::SocketAddr, sync::Arc};
use telegramm::{
    client::Client,
    server::{Handler, Response, Server, ServerRequest},
    Address,
};
use tokio::net::TcpListener;

/// A main-chain client talking to a remote chain over `telegramm`.
#[derive(Debug, Clone)]
pub struct RpcMainChain {
    addr: Address,
}

impl RpcMainChain {
    /// Create a client for the main chain listening at `addr`.
    #[must_use]
    pub const fn new(addr: Address) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl MainChainClient for RpcMainChain {
    async fn status(&self) -> Result<ChainStatus, MainChainError> {
        let mut client = Client::new(self.addr.clone());
        Ok(client.send_request(main_chain::Status).await?)
    }

    async fn query(&self, height: u64) -> Result<Vec<Signed<BlockAbstract>>, MainChainError> {
        let mut client = Client::new(self.addr.clone());
        Ok(client.send_request(main_chain::Query(height)).await?)
    }

    async fn commit(
        &self,
        block_abstract: Signed<BlockAbstract>,
    ) -> Result<BlockHash, MainChainError> {
        let mut client = Client::new(self.addr.clone());
        Ok(client
            .send_request(main_chain::Commit(block_abstract))
            .await?)
    }
}

/// Expose any [`MainChainClient`] implementation over the wire.
///
/// This is how a single-machine setup serves its [`MemoryMainChain`](super::MemoryMainChain)
/// to other local nodes.
#[derive(Clone)]
pub struct MainChainService {
    chain: Arc<dyn MainChainClient>,
}

impl MainChainService {
    /// Create a new service for the given chain.
    #[must_use]
    pub fn new(chain: Arc<dyn MainChainClient>) -> Self {
        Self { chain }
    }

    /// The main server loop.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        Server::new(self).serve(listener).await
    }
}

#[async_trait]
impl Handler<MainChainMessage> for MainChainService {
    async fn handle(&self, _addr: &SocketAddr, req: MainChainMessage) -> Result<Response, BoxError> {
        match req {
            MainChainMessage::Status(_) => {
                main_chain::Status::response(self.chain.status().await?)
            }
            MainChainMessage::Query(params) => {
                main_chain::Query::response(self.chain.query(params.0).await?)
            }
            MainChainMessage::Commit(params) => {
                main_chain::Commit::response(self.chain.commit(params.0).await?)
            }
        }
    }
}
