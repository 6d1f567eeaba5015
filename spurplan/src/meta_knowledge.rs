use crate::{Block, BlockNumber, Chain, NodeId, Proof};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What one peer is known to possess of every node's chain.
///
/// The value per node is the highest block number the peer has been shown;
/// an absent entry means the peer knows nothing yet. The ratchet only ever
/// moves up.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MetaKnowledge {
    known: HashMap<NodeId, BlockNumber>,
}

impl MetaKnowledge {
    /// The highest block number of `owner`'s chain the peer is known to
    /// possess, if any.
    #[must_use]
    pub fn known_height(&self, owner: NodeId) -> Option<BlockNumber> {
        self.known.get(&owner).copied()
    }

    /// The first block number of `owner`'s chain the peer does not possess.
    #[must_use]
    pub fn first_unknown(&self, owner: NodeId) -> BlockNumber {
        self.known_height(owner)
            .map_or_else(BlockNumber::default, |known| known + 1)
    }

    /// The slice of `chain` the peer is missing, up to and including
    /// `upto_inclusive`. Empty if the peer already has everything up to
    /// there.
    #[must_use]
    pub fn blocks_to_send(&self, chain: &Chain, upto_inclusive: BlockNumber) -> Vec<Block> {
        chain
            .range(self.first_unknown(chain.owner()), upto_inclusive)
            .to_vec()
    }

    /// Record that the peer possesses `owner`'s chain up to `height`.
    /// Monotone: a lower height than already recorded is ignored.
    pub fn advance(&mut self, owner: NodeId, height: BlockNumber) {
        let entry = self.known.entry(owner).or_insert(height);
        *entry = (*entry).max(height);
    }

    /// Advance by everything a delivered proof demonstrates: for each chain
    /// update, the peer now possesses that chain up to the last sent block.
    pub fn advance_from_proof(&mut self, proof: &Proof) {
        for (&owner, blocks) in proof.chain_updates() {
            if let Some(last) = blocks.last() {
                self.advance(owner, last.number);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{genesis_block, Transaction};

    fn node(id: u32) -> NodeId {
        NodeId::new(id)
    }

    fn chain_of_three_blocks() -> Chain {
        let genesis = genesis_block(&[(node(0), 100)]);
        let mut chain = Chain::new(node(0), genesis);
        for number in 1..=2 {
            let block = Block {
                number: BlockNumber::new(number),
                owner: Some(node(0)),
                previous_block_hash: chain.last().hash(),
                transactions: vec![Transaction::new(number, node(0), node(1), 1, 0, vec![])],
            };
            chain.append(block).unwrap();
        }
        chain
    }

    #[test]
    fn unknown_peer_gets_everything_from_genesis() {
        let chain = chain_of_three_blocks();
        let meta = MetaKnowledge::default();

        let blocks = meta.blocks_to_send(&chain, BlockNumber::new(2));
        let numbers: Vec<u32> = blocks.iter().map(|block| block.number.into()).collect();
        assert_eq!(numbers, [0, 1, 2]);
    }

    #[test]
    fn known_prefix_is_pruned() {
        let chain = chain_of_three_blocks();
        let mut meta = MetaKnowledge::default();
        meta.advance(node(0), BlockNumber::new(1));

        let blocks = meta.blocks_to_send(&chain, BlockNumber::new(2));
        let numbers: Vec<u32> = blocks.iter().map(|block| block.number.into()).collect();
        assert_eq!(numbers, [2]);

        // Everything known: nothing to send.
        meta.advance(node(0), BlockNumber::new(2));
        assert!(meta.blocks_to_send(&chain, BlockNumber::new(2)).is_empty());
    }

    #[test]
    fn advance_is_monotone() {
        let mut meta = MetaKnowledge::default();
        meta.advance(node(7), BlockNumber::new(4));
        meta.advance(node(7), BlockNumber::new(2));
        assert_eq!(meta.known_height(node(7)), Some(BlockNumber::new(4)));

        meta.advance(node(7), BlockNumber::new(5));
        assert_eq!(meta.known_height(node(7)), Some(BlockNumber::new(5)));
    }
}
