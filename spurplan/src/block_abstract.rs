use crate::{BlockHash, BlockNumber, NodeId};
use serde::{Deserialize, Serialize};
use siegel::Signable;
use std::convert::Infallible;

/// The finality witness of a block: the value a node commits to the main
/// chain. The main chain orders abstracts; a block counts as committed once
/// its abstract has been observed there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockAbstract {
    /// The node owning the abstracted block.
    pub owner: NodeId,
    /// The number of the abstracted block.
    pub block_number: BlockNumber,
    /// The hash of the abstracted block.
    pub block_hash: BlockHash,
}

impl BlockAbstract {
    /// Create a new abstract. Sign it with the owner's identity before
    /// committing it.
    #[must_use]
    pub const fn new(owner: NodeId, block_number: BlockNumber, block_hash: BlockHash) -> Self {
        Self {
            owner,
            block_number,
            block_hash,
        }
    }
}

impl Signable for BlockAbstract {
    type SignableData = Vec<u8>;
    type Error = Infallible;

    /// Canonical layout: `owner (4B BE) ‖ block number (4B BE) ‖ hash (32B)`.
    fn signable_data(&self) -> Result<Self::SignableData, Self::Error> {
        let mut bytes = Vec::with_capacity(40);
        bytes.extend_from_slice(&self.owner.to_be_bytes());
        bytes.extend_from_slice(&self.block_number.to_be_bytes());
        bytes.extend_from_slice(&self.block_hash.0);
        Ok(bytes)
    }
}

/// The state of the main chain as reported by its status endpoint.
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct ChainStatus {
    /// The height of the latest main-chain block.
    pub latest_height: u64,
}
