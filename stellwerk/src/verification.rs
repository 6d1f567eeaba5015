//! Validation of received transactions against their proofs.
//!
//! The checks run in a fixed order (structure, finality, signature,
//! sources, conservation, double spend) and mutate only a writable copy of
//! the local store. The caller publishes the copy on success and drops it
//! on any error, so a rejected transaction leaves the receiver unchanged.

use crate::{
    abstract_cache::AbstractCache,
    local_store::LocalStore,
    main_chain::MainChainError,
};
use err_derive::Error;
use spurplan::{chain, Block, BlockNumber, NodeId, Proof, TransactionId};

/// An error while verifying a received transaction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VerificationError {
    /// The transaction has no sender.
    #[error(display = "the transaction has no sender")]
    MissingSender,

    /// The transaction was never placed in a block.
    #[error(display = "the transaction is not part of a block")]
    NotInBlock,

    /// The transaction's signature did not verify or was made with the
    /// wrong key.
    #[error(display = "invalid signature: {}", 0)]
    InvalidSignature(#[error(from)] siegel::Error),

    /// The signer of the transaction is not the registered key of its
    /// sender.
    #[error(display = "the transaction was not signed by node {}", 0)]
    SignerMismatch(NodeId),

    /// A required block is not committed on the main chain, even after a
    /// cache refresh.
    #[error(display = "block {} of node {} is not finalized", number, owner)]
    NotFinalized {
        /// The owner of the block.
        owner: NodeId,
        /// The number of the block.
        number: BlockNumber,
    },

    /// The proof references a block that was neither supplied nor already
    /// known.
    #[error(display = "block {} of node {} is missing", number, owner)]
    MissingBlock {
        /// The owner of the block.
        owner: NodeId,
        /// The number of the block.
        number: BlockNumber,
    },

    /// A proof block contradicts the local mirror of the same chain.
    #[error(display = "chain update of node {} contradicts the local chain", 0)]
    ChainMismatch(NodeId),

    /// A chain update did not extend the local mirror cleanly.
    #[error(display = "{}", 0)]
    Chain(#[error(from)] chain::Error),

    /// A source could not be resolved.
    #[error(display = "source {} could not be resolved", 0)]
    UnknownSource(TransactionId),

    /// A source is not owned by the spender.
    #[error(display = "source {} does not belong to the sender", 0)]
    SourceNotOwned(TransactionId),

    /// The amounts do not balance.
    #[error(
        display = "conservation violation: sources hold {}, transaction spends {}",
        sources,
        spent
    )]
    ConservationViolation {
        /// The sum of all source amounts.
        sources: u64,
        /// `amount + remainder` of the transaction.
        spent: u64,
    },

    /// A source has already been consumed at this receiver.
    #[error(display = "double spend of source {}", 0)]
    DoubleSpend(TransactionId),

    /// The cache refresh against the main chain failed.
    #[error(display = "{}", 0)]
    MainChain(#[error(from)] MainChainError),
}

/// Validates transactions against the committed-abstract cache.
pub struct Verifier<'a> {
    cache: &'a AbstractCache,
}

impl<'a> Verifier<'a> {
    /// Create a verifier reading the given cache.
    #[must_use]
    pub const fn new(cache: &'a AbstractCache) -> Self {
        Self { cache }
    }

    /// Verify `proof` and apply its effects to `store`.
    ///
    /// `store` should be a writable copy; it is left half-updated on error
    /// and must then be discarded.
    pub async fn verify_and_apply(
        &self,
        store: &mut LocalStore,
        proof: &Proof,
    ) -> Result<(), VerificationError> {
        let transaction = proof.transaction().body();
        let sender = transaction.sender.ok_or(VerificationError::MissingSender)?;

        // 1. Structure: every chain update must extend the local mirror
        // without gaps; resent blocks must be identical.
        for (&owner, blocks) in proof.chain_updates() {
            self.apply_chain_update(store, owner, blocks)?;
        }

        // 2. Finality: the last block of every update must be committed.
        // One cache refresh is allowed before giving up.
        for (&owner, blocks) in proof.chain_updates() {
            if let Some(last) = blocks.last() {
                self.ensure_committed(owner, last).await?;
            }
        }

        // 3. Signature: made by the registered key of the sender.
        match store.node(sender) {
            Some(node) if node.peer_id() == proof.transaction().signer() => {}
            _ => return Err(VerificationError::SignerMismatch(sender)),
        }
        proof.transaction().verify()?;

        // The transaction itself must sit in the sender's (now updated)
        // chain, under a committed block.
        let block_number = transaction
            .block_number
            .ok_or(VerificationError::NotInBlock)?;
        self.ensure_transaction_in_chain(store, sender, block_number, transaction.id())
            .await?;

        // 4./5. Sources: resolvable, finalized, owned by the sender, and
        // adding up.
        let mut source_sum: u64 = 0;
        for source in &transaction.sources {
            let (amount, source_receiver) = self.resolve_source(store, *source).await?;
            if source_receiver != sender {
                return Err(VerificationError::SourceNotOwned(*source));
            }
            source_sum = source_sum.saturating_add(amount);
        }

        let spent = transaction.amount.saturating_add(transaction.remainder);
        if source_sum != spent {
            return Err(VerificationError::ConservationViolation {
                sources: source_sum,
                spent,
            });
        }

        // 6. Double-spend guard: nothing accepted before may share a
        // source.
        for source in &transaction.sources {
            if store.is_consumed(*source) {
                return Err(VerificationError::DoubleSpend(*source));
            }
        }

        // All checks passed: consume the sources, keep the value, ratchet
        // up what the sender has proven it holds.
        for source in &transaction.sources {
            store.consume(*source);
        }
        if transaction.receiver == store.own_id() && transaction.amount > 0 {
            store.add_unspent(transaction.clone());
        }
        store.advance_meta_from_proof(sender, proof);
        Ok(())
    }

    /// Extend the local mirror of `owner`'s chain by one update slice.
    fn apply_chain_update(
        &self,
        store: &mut LocalStore,
        owner: NodeId,
        blocks: &[Block],
    ) -> Result<(), VerificationError> {
        let own_id = store.own_id();
        let chain = store.chain_mut_or_create(owner);

        let first = match blocks.first() {
            Some(first) => first.number,
            None => return Ok(()),
        };
        if first > chain.height() + 1 {
            // A gap between what we have and what was sent.
            return Err(VerificationError::MissingBlock {
                owner,
                number: chain.height() + 1,
            });
        }

        for (i, block) in blocks.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let expected = first + i as u32;
            if block.number != expected {
                return Err(VerificationError::MissingBlock {
                    owner,
                    number: expected,
                });
            }

            match chain.get(block.number) {
                // Already known: must be bit-identical.
                Some(known) => {
                    if known.hash() != block.hash() {
                        return Err(VerificationError::ChainMismatch(owner));
                    }
                }
                None => {
                    // Nobody appends to our own chain but ourselves.
                    if owner == own_id {
                        return Err(VerificationError::ChainMismatch(owner));
                    }
                    chain.append(block.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Check that `block` is committed, refreshing the cache once.
    async fn ensure_committed(
        &self,
        owner: NodeId,
        block: &Block,
    ) -> Result<(), VerificationError> {
        if self.cache.is_present(block.hash()) {
            return Ok(());
        }
        self.cache.update_to_latest().await?;
        if self.cache.is_present(block.hash()) {
            return Ok(());
        }
        Err(VerificationError::NotFinalized {
            owner,
            number: block.number,
        })
    }

    /// Check that the transaction is present in its sender's mirror at the
    /// claimed position, with a committed successor.
    async fn ensure_transaction_in_chain(
        &self,
        store: &LocalStore,
        sender: NodeId,
        block_number: BlockNumber,
        id: TransactionId,
    ) -> Result<(), VerificationError> {
        let chain = store
            .chain(sender)
            .ok_or(VerificationError::MissingBlock {
                owner: sender,
                number: block_number,
            })?;
        let block = chain
            .get(block_number)
            .ok_or(VerificationError::MissingBlock {
                owner: sender,
                number: block_number,
            })?;
        if block.transaction(id).is_none() {
            // The sender claims a position its own block does not back up.
            return Err(VerificationError::ChainMismatch(sender));
        }

        match chain.next_committed_block(block_number, |b| self.cache.is_present(b.hash())) {
            Some(_) => Ok(()),
            None => {
                self.cache.update_to_latest().await?;
                chain
                    .next_committed_block(block_number, |b| self.cache.is_present(b.hash()))
                    .map(|_| ())
                    .ok_or(VerificationError::NotFinalized {
                        owner: sender,
                        number: block_number,
                    })
            }
        }
    }

    /// Resolve a source to its amount and receiver, checking finality of
    /// its block.
    async fn resolve_source(
        &self,
        store: &LocalStore,
        source: TransactionId,
    ) -> Result<(u64, NodeId), VerificationError> {
        // Genesis mints live in the shared genesis block, which is
        // committed by definition.
        let owner = match source.sender {
            None => {
                let mint = store
                    .genesis()
                    .transaction(source)
                    .ok_or(VerificationError::UnknownSource(source))?;
                return Ok((mint.amount, mint.receiver));
            }
            Some(owner) => owner,
        };

        let chain = store
            .chain(owner)
            .ok_or(VerificationError::UnknownSource(source))?;
        let transaction = chain
            .find_transaction(source)
            .ok_or(VerificationError::UnknownSource(source))?;
        let block_number = transaction
            .block_number
            .ok_or(VerificationError::UnknownSource(source))?;

        if chain
            .next_committed_block(block_number, |b| self.cache.is_present(b.hash()))
            .is_none()
        {
            self.cache.update_to_latest().await?;
            chain
                .next_committed_block(block_number, |b| self.cache.is_present(b.hash()))
                .ok_or(VerificationError::NotFinalized {
                    owner,
                    number: block_number,
                })?;
        }

        Ok((transaction.amount, transaction.receiver))
    }
}
