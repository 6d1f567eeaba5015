//! The client side of the BFT main chain.
//!
//! The main chain itself is an external collaborator; nodes only consume
//! the three operations below. Production talks to it over the wire
//! ([`RpcMainChain`]); tests and local setups use the in-memory
//! [`MemoryMainChain`].

mod memory;
mod rpc;

pub use memory::MemoryMainChain;
pub use rpc::{MainChainService, RpcMainChain};

use async_trait::async_trait;
use err_derive::Error;
use siegel::Signed;
use spurplan::{BlockAbstract, BlockHash, ChainStatus};

/// An error while talking to the main chain.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MainChainError {
    /// The request did not reach the main chain. Transient; callers may
    /// retry.
    #[error(display = "{}", 0)]
    Transport(#[error(from)] telegramm::Error),

    /// The abstract's signature did not verify.
    #[error(display = "invalid abstract signature: {}", 0)]
    InvalidSignature(#[error(from)] siegel::Error),

    /// The queried height has not been reached.
    #[error(display = "height {} is not available", 0)]
    UnknownHeight(u64),
}

/// The operations a node needs from the main chain.
#[async_trait]
pub trait MainChainClient: Send + Sync {
    /// The current status (latest height) of the main chain.
    async fn status(&self) -> Result<ChainStatus, MainChainError>;

    /// All abstracts ordered at the given height (heights start at 1).
    async fn query(&self, height: u64) -> Result<Vec<Signed<BlockAbstract>>, MainChainError>;

    /// Commit a signed abstract. Returns the hash of the abstracted block.
    ///
    /// Committing the same abstract twice is harmless; the main chain
    /// deduplicates by block hash.
    async fn commit(
        &self,
        block_abstract: Signed<BlockAbstract>,
    ) -> Result<BlockHash, MainChainError>;
}
