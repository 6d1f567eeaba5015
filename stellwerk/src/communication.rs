//! Orchestration of the send and receive paths.
//!
//! Sending: place the transaction in a block, anchor the block's abstract
//! on the main chain, build the minimal proof for the receiver and transmit
//! it. Receiving: verify the proof against local state and the abstract
//! cache, then commit the effects atomically.

use crate::{
    abstract_cache::AbstractCache,
    local_store::{LocalStoreError, LocalStoreService},
    main_chain::MainChainError,
    peer,
    proof_constructor::{ProofConstructor, ProofError},
    tracker::{Tracker, TrackerError},
    verification::{VerificationError, Verifier},
};
use err_derive::Error;
use siegel::{Identity, Signable, Signed};
use spurplan::{BlockAbstract, BlockNumber, Node, NodeId, Proof, Transaction};
use std::{collections::HashSet, sync::Arc, time::Duration};

/// How often the send path polls the main chain for the commitment of the
/// transaction's block before giving up.
const COMMIT_ATTEMPTS: u32 = 10;
const COMMIT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// An error of the `communication` module.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommunicationError {
    /// The received transaction was rejected.
    #[error(display = "{}", 0)]
    Verification(#[error(from)] VerificationError),

    /// The proof could not be constructed.
    #[error(display = "{}", 0)]
    Proof(#[error(from)] ProofError),

    /// The local store rejected the operation.
    #[error(display = "{}", 0)]
    Store(#[error(from)] LocalStoreError),

    /// The main chain could not be reached.
    #[error(display = "{}", 0)]
    MainChain(#[error(from)] MainChainError),

    /// The tracker could not be reached.
    #[error(display = "{}", 0)]
    Tracker(#[error(from)] TrackerError),

    /// The counterparty could not be reached.
    #[error(display = "{}", 0)]
    Transport(#[error(from)] telegramm::Error),

    /// Signing failed.
    #[error(display = "{}", 0)]
    Signature(#[error(from)] siegel::Error),

    /// A node referenced by a transfer is not known, even after a tracker
    /// refresh.
    #[error(display = "unknown node {}", 0)]
    UnknownNode(NodeId),
}

/// The send/receive facade of one node.
#[derive(Clone)]
pub struct Communication {
    identity: Identity,
    store: LocalStoreService,
    cache: Arc<AbstractCache>,
    tracker: Arc<dyn Tracker>,
}

impl Communication {
    /// Wire up the facade.
    pub fn new(
        identity: Identity,
        store: LocalStoreService,
        cache: Arc<AbstractCache>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        Self {
            identity,
            store,
            cache,
            tracker,
        }
    }

    /// The state service of this node.
    #[must_use]
    pub const fn store(&self) -> &LocalStoreService {
        &self.store
    }

    /// The abstract cache of this node.
    #[must_use]
    pub const fn cache(&self) -> &Arc<AbstractCache> {
        &self.cache
    }

    /// Append a block with the given transactions to the own chain and
    /// commit its abstract to the main chain.
    ///
    /// A failed commit is only logged: the abstract is committed again on
    /// the next send of a transaction in this block (the main chain
    /// deduplicates by hash).
    pub async fn create_block(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<BlockNumber, CommunicationError> {
        let mut store = self.store.get_writable().await;
        let (number, hash) = store.append_own_block(transactions)?;
        let own_id = store.own_id();
        store.save();

        let block_abstract = BlockAbstract::new(own_id, number, hash).sign(&self.identity)?;
        match self.cache.commit(block_abstract).await {
            Ok(_) => log::debug!("Committed abstract for own block {}.", number),
            Err(err) => log::warn!(
                "Committing abstract for own block {} failed, will retry before sending: {}",
                number,
                err
            ),
        }
        Ok(number)
    }

    /// Send a transaction to its receiver, accompanied by a proof.
    ///
    /// The transaction must already be placed in a block (see
    /// [`create_block`](Self::create_block)).
    pub async fn send_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<(), CommunicationError> {
        let receiver_id = transaction.receiver;
        let receiver = self.node(receiver_id).await?;

        let proof = self.construct_proof(transaction).await?;

        let mut sender = peer::Sender::new(receiver.address().clone());
        sender.send_transaction(proof.clone()).await?;

        // The receiver now possesses everything the proof carried.
        let mut store = self.store.get_writable().await;
        store.advance_meta_from_proof(receiver_id, &proof);
        store.save();

        log::info!(
            "Sent transaction {} to node {}.",
            proof.transaction().body().id(),
            receiver_id
        );
        Ok(())
    }

    /// Sign a blocked transaction and build the minimal proof for its
    /// receiver, waiting for the block's commitment if necessary.
    ///
    /// The authoritative copy (with its block position) is taken from the
    /// own chain, so callers may pass the transaction as returned by
    /// [`LocalStore::create_transaction`](crate::local_store::LocalStore::create_transaction).
    pub async fn construct_proof(
        &self,
        transaction: Transaction,
    ) -> Result<Proof, CommunicationError> {
        let transaction = match transaction.block_number {
            Some(_) => transaction,
            None => self
                .store
                .get()
                .own_chain()
                .find_transaction(transaction.id())
                .cloned()
                .ok_or(ProofError::NotInBlock)?,
        };
        let signed = transaction.sign(&self.identity)?;
        self.ensure_committed(&signed).await?;

        let store = self.store.get();
        let proof = ProofConstructor::new(&store, &self.cache, &signed)?.construct()?;
        Ok(proof)
    }

    /// Handle a received transaction and proof.
    pub async fn receive_transaction(&self, proof: Proof) -> Result<(), CommunicationError> {
        self.ensure_known_nodes(&proof).await?;

        let mut store = self.store.get_writable().await;
        Verifier::new(&self.cache)
            .verify_and_apply(&mut store, &proof)
            .await?;
        store.save();

        log::info!(
            "Accepted transaction {}.",
            proof.transaction().body().id()
        );
        Ok(())
    }

    /// Wait until the block holding `transaction` has a committed
    /// successor, re-committing its abstract if the first commit was lost.
    async fn ensure_committed(
        &self,
        transaction: &Signed<Transaction>,
    ) -> Result<(), CommunicationError> {
        let body = transaction.body();
        let block_number = body.block_number.ok_or(ProofError::NotInBlock)?;

        for attempt in 0..COMMIT_ATTEMPTS {
            let store = self.store.get();
            let chain = store.own_chain();
            if chain
                .next_committed_block(block_number, |block| self.cache.is_present(block.hash()))
                .is_some()
            {
                return Ok(());
            }

            if attempt > 0 {
                // The first commit may have been lost; commit at least once
                // more (idempotent by hash).
                if let Some(block) = chain.get(block_number) {
                    let block_abstract =
                        BlockAbstract::new(store.own_id(), block_number, block.hash())
                            .sign(&self.identity)?;
                    if let Err(err) = self.cache.commit(block_abstract).await {
                        log::warn!("Re-committing abstract failed: {}", err);
                    }
                }
                tokio::time::sleep(COMMIT_RETRY_DELAY).await;
            }
            self.cache.update_to_latest().await?;
        }

        Err(ProofError::NotYetCommitted {
            owner: self.store.get().own_id(),
            number: block_number,
        }
        .into())
    }

    /// Make sure every node a proof references is in the local node table,
    /// refreshing it from the tracker on a miss.
    async fn ensure_known_nodes(&self, proof: &Proof) -> Result<(), CommunicationError> {
        let transaction = proof.transaction().body();
        let mut referenced: HashSet<NodeId> = proof.chain_updates().keys().copied().collect();
        referenced.insert(transaction.receiver);
        if let Some(sender) = transaction.sender {
            referenced.insert(sender);
        }

        let store = self.store.get();
        let missing: Vec<NodeId> = referenced
            .into_iter()
            .filter(|&id| store.node(id).is_none())
            .collect();
        drop(store);
        if missing.is_empty() {
            return Ok(());
        }

        let nodes = self.tracker.update_nodes().await?;
        let mut store = self.store.get_writable().await;
        store.merge_nodes(nodes);
        for id in missing {
            if store.node(id).is_none() {
                return Err(CommunicationError::UnknownNode(id));
            }
        }
        store.save();
        Ok(())
    }

    /// Look up a node, refreshing the table from the tracker on a miss.
    async fn node(&self, id: NodeId) -> Result<Node, CommunicationError> {
        if let Some(node) = self.store.get().node(id) {
            return Ok(node.clone());
        }

        let nodes = self.tracker.update_nodes().await?;
        let mut store = self.store.get_writable().await;
        store.merge_nodes(nodes);
        let node = store
            .node(id)
            .cloned()
            .ok_or(CommunicationError::UnknownNode(id))?;
        store.save();
        Ok(node)
    }
}
