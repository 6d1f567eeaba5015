//! Construction of the minimal proof accompanying a transaction.
//!
//! The proof must let the receiver validate the provenance of every input
//! using only what it already possesses and the main chain. The traversal
//! walks the transaction's source graph and collects, per reachable chain,
//! the slice from the receiver's first unknown block up to the next
//! committed block, recursing into the sources of every block it newly adds.

use crate::{abstract_cache::AbstractCache, local_store::LocalStore};
use err_derive::Error;
use siegel::Signed;
use spurplan::{Block, BlockNumber, Chain, MetaKnowledge, NodeId, Proof, Transaction, TransactionId};
use std::collections::BTreeMap;

/// An error while constructing a proof.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProofError {
    /// The transaction has no sender; genesis mints are never transferred.
    #[error(display = "the transaction has no sender")]
    MissingSender,

    /// The transaction was never placed in a block. Constructing a proof
    /// for it is a programming error.
    #[error(display = "the transaction is not part of a block")]
    NotInBlock,

    /// A needed block has no committed successor yet.
    #[error(display = "block {} of node {} has no committed successor", number, owner)]
    NotYetCommitted {
        /// The owner of the chain.
        owner: NodeId,
        /// The first block that would need a committed successor.
        number: BlockNumber,
    },

    /// Nothing of the given node's chain is known locally.
    #[error(display = "no local chain for node {}", 0)]
    UnknownChain(NodeId),

    /// A source could not be found in its owner's chain.
    #[error(display = "source {} could not be resolved", 0)]
    UnknownSource(TransactionId),
}

/// Builds the proof for one transaction against a consistent snapshot of
/// the sender's state.
pub struct ProofConstructor<'a> {
    store: &'a LocalStore,
    cache: &'a AbstractCache,
    transaction: &'a Signed<Transaction>,
    sender: NodeId,
    receiver: NodeId,
    // What the receiver already possesses, snapshotted once: all slices for
    // one owner start at the same first unknown block.
    meta: MetaKnowledge,
    to_send: BTreeMap<NodeId, Vec<Block>>,
}

impl<'a> ProofConstructor<'a> {
    /// Prepare construction for a signed transaction.
    pub fn new(
        store: &'a LocalStore,
        cache: &'a AbstractCache,
        transaction: &'a Signed<Transaction>,
    ) -> Result<Self, ProofError> {
        let body = transaction.body();
        let sender = body.sender.ok_or(ProofError::MissingSender)?;
        let receiver = body.receiver;
        let meta = store.meta_knowledge(receiver);
        Ok(Self {
            store,
            cache,
            transaction,
            sender,
            receiver,
            meta,
            to_send: BTreeMap::new(),
        })
    }

    /// Construct the proof.
    pub fn construct(mut self) -> Result<Proof, ProofError> {
        let body = self.transaction.body();
        let block_number = body.block_number.ok_or(ProofError::NotInBlock)?;

        let chain = self
            .store
            .chain(self.sender)
            .ok_or(ProofError::UnknownChain(self.sender))?;
        let next_committed = self.next_committed(chain, block_number)?;
        let own_blocks = self.meta.blocks_to_send(chain, next_committed);

        // Base case: the receiver already has everything needed from the
        // sender.
        if !own_blocks.is_empty() {
            self.process_blocks(self.sender, own_blocks)?;
        }
        Ok(Proof::new(self.transaction.clone(), self.to_send))
    }

    /// The number of the lowest committed block at or after `from`.
    fn next_committed(&self, chain: &Chain, from: BlockNumber) -> Result<BlockNumber, ProofError> {
        chain
            .next_committed_block(from, |block| self.cache.is_present(block.hash()))
            .map(|block| block.number)
            .ok_or(ProofError::NotYetCommitted {
                owner: chain.owner(),
                number: from,
            })
    }

    /// Process the given blocks belonging to the given owner: merge them
    /// into the proof and recurse into the sources of everything newly
    /// added.
    fn process_blocks(&mut self, owner: NodeId, blocks: Vec<Block>) -> Result<(), ProofError> {
        let newly_added = self.add_blocks_to_send(owner, blocks);
        for block in &newly_added {
            for transaction in &block.transactions {
                self.process_sources(transaction)?;
            }
        }
        Ok(())
    }

    /// Process the sources of the given transaction.
    fn process_sources(&mut self, transaction: &Transaction) -> Result<(), ProofError> {
        for source in &transaction.sources {
            // Skip all sources in genesis blocks, our own blocks and in
            // receiver blocks.
            let owner = match source.sender {
                None => continue,
                Some(owner) if owner == self.sender || owner == self.receiver => continue,
                Some(owner) => owner,
            };

            let chain = self
                .store
                .chain(owner)
                .ok_or(ProofError::UnknownChain(owner))?;
            let source_transaction = chain
                .find_transaction(*source)
                .ok_or(ProofError::UnknownSource(*source))?;
            let block_number = source_transaction
                .block_number
                .ok_or(ProofError::NotInBlock)?;

            let next_committed = self.next_committed(chain, block_number)?;
            let blocks = self.meta.blocks_to_send(chain, next_committed);
            if blocks.is_empty() {
                continue;
            }
            self.process_blocks(owner, blocks)?;
        }
        Ok(())
    }

    /// Merge blocks of one owner into the proof and return what was newly
    /// added.
    ///
    /// All candidate slices for the same owner start at the receiver's
    /// first unknown block, so a longer candidate strictly extends the
    /// slice already scheduled.
    fn add_blocks_to_send(&mut self, owner: NodeId, to_add: Vec<Block>) -> Vec<Block> {
        let current = self.to_send.entry(owner).or_default();
        if current.is_empty() {
            current.extend(to_add.iter().cloned());
            return to_add;
        }

        if current.len() >= to_add.len() {
            // Nothing new.
            return Vec::new();
        }

        debug_assert!(
            current
                .iter()
                .zip(&to_add)
                .all(|(scheduled, candidate)| scheduled == candidate),
            "slices for one owner must extend each other"
        );

        let added = to_add[current.len()..].to_vec();
        current.extend(added.iter().cloned());
        added
    }
}
