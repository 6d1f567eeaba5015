//! Per-node chains: append-only sequences of blocks rooted at the shared
//! genesis block.

use crate::{Block, BlockHash, BlockNumber, NodeId, Transaction, TransactionId};
use err_derive::Error;
use serde::{Deserialize, Serialize};

/// An error while appending to a `Chain`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The block hash does not match the previous block hash.
    #[error(display = "Block hash does not match the previous block hash.")]
    BlockHashDoesNotMatch,

    /// The block height does not fit the previous block height.
    #[error(display = "Block height does not fit the previous block height.")]
    BlockHeightDoesNotFit,

    /// The block belongs to another chain.
    #[error(display = "Block does not belong to this chain.")]
    BlockOwnerDoesNotMatch,
}

/// A node's private, append-only sequence of blocks.
///
/// Position 0 is always the shared genesis block; numbers are dense and
/// monotone from there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    owner: NodeId,
    blocks: Vec<Block>,
}

impl Chain {
    /// Create a chain for `owner`, starting at the shared genesis block.
    #[must_use]
    pub fn new(owner: NodeId, genesis: Block) -> Self {
        Self {
            owner,
            blocks: vec![genesis],
        }
    }

    /// The node owning this chain.
    #[must_use]
    pub const fn owner(&self) -> NodeId {
        self.owner
    }

    /// The number of the last block.
    #[must_use]
    pub fn height(&self) -> BlockNumber {
        self.last().number
    }

    /// The block at the given position.
    #[must_use]
    pub fn get(&self, number: BlockNumber) -> Option<&Block> {
        self.blocks.get(number.position())
    }

    /// The last block of the chain (at least the genesis block exists).
    #[must_use]
    pub fn last(&self) -> &Block {
        self.blocks.last().expect("chain starts at genesis")
    }

    /// All blocks in ascending order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The blocks from `from` up to and including `upto`.
    ///
    /// An empty slice if the range is backwards or reaches beyond the chain.
    #[must_use]
    pub fn range(&self, from: BlockNumber, upto: BlockNumber) -> &[Block] {
        if from > upto || upto > self.height() {
            return &[];
        }
        &self.blocks[from.position()..=upto.position()]
    }

    /// Append a block. It must continue the chain: owned by this chain's
    /// owner, numbered one past the last block and linked to its hash.
    pub fn append(&mut self, block: Block) -> Result<(), Error> {
        if block.owner != Some(self.owner) {
            return Err(Error::BlockOwnerDoesNotMatch);
        }
        if block.number != self.height() + 1 {
            return Err(Error::BlockHeightDoesNotFit);
        }
        if block.previous_block_hash != self.last().hash() {
            return Err(Error::BlockHashDoesNotMatch);
        }
        self.blocks.push(block);
        Ok(())
    }

    /// Find a transaction by its identity.
    ///
    /// Genesis mints are found in the genesis block, everything else in the
    /// block the owner placed it in.
    #[must_use]
    pub fn find_transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.blocks
            .iter()
            .find_map(|block| block.transaction(id))
    }

    /// The lowest-numbered committed block with a number of at least `from`
    /// (possibly the block at `from` itself).
    pub fn next_committed_block(
        &self,
        from: BlockNumber,
        is_committed: impl Fn(&Block) -> bool,
    ) -> Option<&Block> {
        self.blocks
            .get(from.position()..)?
            .iter()
            .find(|block| is_committed(block))
    }
}

/// Build the shared genesis block, minting the given amount to each node.
///
/// The genesis block is identical on every chain in the system. Mint
/// transactions are numbered by the receiving node's id.
#[must_use]
pub fn genesis_block(amounts: &[(NodeId, u64)]) -> Block {
    let transactions = amounts
        .iter()
        .map(|&(receiver, amount)| {
            let mut mint = Transaction::mint(u32::from(receiver), receiver, amount);
            mint.block_number = Some(BlockNumber::default());
            mint
        })
        .collect();
    Block {
        number: BlockNumber::default(),
        owner: None,
        previous_block_hash: BlockHash::default(),
        transactions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn chain_with_one_block() -> Chain {
        let genesis = genesis_block(&[(node(0), 100), (node(1), 50)]);
        let mut chain = Chain::new(node(0), genesis.clone());
        let block = Block {
            number: BlockNumber::new(1),
            owner: Some(node(0)),
            previous_block_hash: genesis.hash(),
            transactions: vec![Transaction::new(0, node(0), node(1), 40, 60, vec![])],
        };
        chain.append(block).unwrap();
        chain
    }

    #[test]
    fn append_enforces_dense_numbers_and_linking() {
        let chain = chain_with_one_block();
        assert_eq!(chain.height(), BlockNumber::new(1));

        let mut chain = chain;
        let unlinked = Block {
            number: BlockNumber::new(2),
            owner: Some(node(0)),
            previous_block_hash: BlockHash::default(),
            transactions: vec![],
        };
        assert!(matches!(
            chain.append(unlinked),
            Err(Error::BlockHashDoesNotMatch)
        ));

        let gap = Block {
            number: BlockNumber::new(3),
            owner: Some(node(0)),
            previous_block_hash: chain.last().hash(),
            transactions: vec![],
        };
        assert!(matches!(
            chain.append(gap),
            Err(Error::BlockHeightDoesNotFit)
        ));

        let foreign = Block {
            number: BlockNumber::new(2),
            owner: Some(node(1)),
            previous_block_hash: chain.last().hash(),
            transactions: vec![],
        };
        assert!(matches!(
            chain.append(foreign),
            Err(Error::BlockOwnerDoesNotMatch)
        ));
    }

    #[test]
    fn finds_mints_and_own_transactions() {
        let chain = chain_with_one_block();

        let mint = chain
            .find_transaction(TransactionId {
                sender: None,
                number: 0,
            })
            .unwrap();
        assert_eq!(mint.amount, 100);
        assert_eq!(mint.receiver, node(0));

        let transfer = chain
            .find_transaction(TransactionId {
                sender: Some(node(0)),
                number: 0,
            })
            .unwrap();
        assert_eq!(transfer.amount, 40);
    }

    #[test]
    fn next_committed_block_skips_uncommitted() {
        let chain = chain_with_one_block();
        let genesis_hash = chain.get(BlockNumber::default()).unwrap().hash();

        // Only the genesis block is committed: nothing at or after block 1.
        let committed = chain.next_committed_block(BlockNumber::new(1), |block| {
            block.hash() == genesis_hash
        });
        assert!(committed.is_none());

        // Everything committed: block 1 is its own committed successor.
        let committed = chain
            .next_committed_block(BlockNumber::new(1), |_| true)
            .unwrap();
        assert_eq!(committed.number, BlockNumber::new(1));

        // From genesis, the genesis block itself is returned.
        let committed = chain
            .next_committed_block(BlockNumber::default(), |block| block.hash() == genesis_hash)
            .unwrap();
        assert_eq!(committed.number, BlockNumber::default());
    }

    #[test]
    fn genesis_is_identical_for_every_owner() {
        let amounts = [(node(0), 100), (node(1), 50)];
        assert_eq!(
            genesis_block(&amounts).hash(),
            genesis_block(&amounts).hash()
        );
    }
}
