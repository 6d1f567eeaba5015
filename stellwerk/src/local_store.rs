//! The aggregate state of a node: its own chain, the mirrors of foreign
//! chains, the unspent set, the consumed-source index and the per-peer
//! meta-knowledge.
//!
//! State lives behind a [`LocalStoreService`]. Readers take cheap
//! snapshots; writers take a writable copy and publish it atomically with
//! [`WritableLocalStore::save`], which is what makes receiving a
//! transaction all-or-nothing.

use err_derive::Error;
use im::{HashMap, HashSet};
use spurplan::{
    chain, Block, BlockHash, BlockNumber, Chain, MetaKnowledge, Node, NodeId, Proof, Transaction,
    TransactionId,
};
use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// An error of the `local_store` module.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LocalStoreError {
    /// The unspent set cannot cover the requested amount.
    #[error(
        display = "insufficient funds: {} available, {} requested",
        available,
        requested
    )]
    InsufficientFunds {
        /// The sum of all unspent amounts.
        available: u64,
        /// The amount that was requested.
        requested: u64,
    },

    /// The own chain rejected a block.
    #[error(display = "{}", 0)]
    Chain(#[error(from)] chain::Error),
}

/// The mutable state of one node.
#[derive(Debug, Clone)]
pub struct LocalStore {
    own_id: NodeId,
    genesis: Block,
    nodes: HashMap<NodeId, Node>,
    chains: HashMap<NodeId, Chain>,
    unspent: HashMap<TransactionId, Transaction>,
    consumed: HashSet<TransactionId>,
    meta: HashMap<NodeId, MetaKnowledge>,
    next_transaction_number: u32,
}

impl LocalStore {
    /// Create the state of `own_node`, starting from the shared genesis
    /// block. Genesis value minted to this node starts out unspent.
    #[must_use]
    pub fn new(own_node: Node, genesis: Block) -> Self {
        let own_id = own_node.id();

        let mut unspent = HashMap::new();
        for mint in &genesis.transactions {
            if mint.receiver == own_id && mint.amount > 0 {
                unspent.insert(mint.id(), mint.clone());
            }
        }

        let mut nodes = HashMap::new();
        nodes.insert(own_id, own_node);

        let mut chains = HashMap::new();
        chains.insert(own_id, Chain::new(own_id, genesis.clone()));

        Self {
            own_id,
            genesis,
            nodes,
            chains,
            unspent,
            consumed: HashSet::new(),
            meta: HashMap::new(),
            next_transaction_number: 0,
        }
    }

    /// The id of the owning node.
    #[must_use]
    pub const fn own_id(&self) -> NodeId {
        self.own_id
    }

    /// The shared genesis block.
    #[must_use]
    pub const fn genesis(&self) -> &Block {
        &self.genesis
    }

    /// Look up a node entry.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Merge a node table fetched from the tracker. Existing entries win;
    /// a node's key and address do not change after registration.
    pub fn merge_nodes(&mut self, nodes: std::collections::HashMap<NodeId, Node>) {
        for (id, node) in nodes {
            self.nodes.entry(id).or_insert(node);
        }
    }

    /// The chain of the given node, if anything of it is known locally.
    #[must_use]
    pub fn chain(&self, id: NodeId) -> Option<&Chain> {
        self.chains.get(&id)
    }

    /// This node's own chain.
    #[must_use]
    pub fn own_chain(&self) -> &Chain {
        self.chains.get(&self.own_id).expect("own chain exists")
    }

    /// The local mirror of the given node's chain, created at genesis if
    /// this is the first time the node appears.
    pub fn chain_mut_or_create(&mut self, id: NodeId) -> &mut Chain {
        let genesis = self.genesis.clone();
        self.chains
            .entry(id)
            .or_insert_with(|| Chain::new(id, genesis))
    }

    /// Append a block with the given transactions to the own chain and
    /// return its number and hash.
    pub fn append_own_block(
        &mut self,
        mut transactions: Vec<Transaction>,
    ) -> Result<(BlockNumber, BlockHash), LocalStoreError> {
        let chain = self.chains.get(&self.own_id).expect("own chain exists");
        let number = chain.height() + 1;
        let previous_block_hash = chain.last().hash();

        for transaction in &mut transactions {
            transaction.block_number = Some(number);
        }
        let block = Block {
            number,
            owner: Some(self.own_id),
            previous_block_hash,
            transactions,
        };
        let hash = block.hash();

        let chain = self.chain_mut_or_create(self.own_id);
        chain.append(block)?;
        Ok((number, hash))
    }

    /// Create a transfer to `receiver`, covering `amount` with unspent
    /// sources (picked in identity order) and keeping the change as
    /// remainder. The sources count as spent immediately.
    pub fn create_transaction(
        &mut self,
        receiver: NodeId,
        amount: u64,
    ) -> Result<Transaction, LocalStoreError> {
        let mut candidates: Vec<TransactionId> = self.unspent.keys().copied().collect();
        candidates.sort();

        let mut sources = Vec::new();
        let mut covered: u64 = 0;
        for id in candidates {
            if covered >= amount {
                break;
            }
            let source = &self.unspent[&id];
            covered += source.amount;
            sources.push(id);
        }

        if covered < amount {
            return Err(LocalStoreError::InsufficientFunds {
                available: covered,
                requested: amount,
            });
        }

        for id in &sources {
            self.unspent.remove(id);
            self.consumed.insert(*id);
        }

        let number = self.next_transaction_number;
        self.next_transaction_number += 1;
        Ok(Transaction::new(
            number,
            self.own_id,
            receiver,
            amount,
            covered - amount,
            sources,
        ))
    }

    /// Record a received transaction as spendable.
    pub fn add_unspent(&mut self, transaction: Transaction) {
        self.unspent.insert(transaction.id(), transaction);
    }

    /// Whether a source has already been consumed at this node.
    #[must_use]
    pub fn is_consumed(&self, id: TransactionId) -> bool {
        self.consumed.contains(&id)
    }

    /// Mark a source as consumed.
    pub fn consume(&mut self, id: TransactionId) {
        self.consumed.insert(id);
    }

    /// The sum of all unspent amounts.
    #[must_use]
    pub fn balance(&self) -> u64 {
        self.unspent.values().map(|transaction| transaction.amount).sum()
    }

    /// The identities of all unspent transactions.
    #[must_use]
    pub fn unspent_ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<TransactionId> = self.unspent.keys().copied().collect();
        ids.sort();
        ids
    }

    /// What `peer` is known to possess, as last recorded.
    #[must_use]
    pub fn meta_knowledge(&self, peer: NodeId) -> MetaKnowledge {
        self.meta.get(&peer).cloned().unwrap_or_default()
    }

    /// Ratchet up what `peer` is known to possess by the contents of a
    /// proof. Called when sending one to `peer` and when receiving one
    /// from `peer`.
    pub fn advance_meta_from_proof(&mut self, peer: NodeId, proof: &Proof) {
        self.meta
            .entry(peer)
            .or_insert_with(MetaKnowledge::default)
            .advance_from_proof(proof);
    }
}

/// Struct holding a `LocalStore` mutex.
#[derive(Debug, Clone)]
#[must_use]
pub struct LocalStoreService {
    store: Arc<Mutex<LocalStore>>,
    writer: Arc<Semaphore>,
}

impl LocalStoreService {
    /// Create a new `LocalStoreService` initialized with a given `store`.
    pub fn new(store: LocalStore) -> Self {
        Self {
            store: Arc::new(store.into()),
            writer: Arc::new(Semaphore::new(1)),
        }
    }

    /// Return a copy of the entire `LocalStore`.
    #[must_use]
    pub fn get(&self) -> LocalStore {
        self.store.lock().unwrap().clone()
    }

    /// Return a writable copy of the entire `LocalStore`.
    ///
    /// Writers are serialized; the copy replaces the shared state only on
    /// [`save`](WritableLocalStore::save).
    pub async fn get_writable(&self) -> WritableLocalStore {
        let permit = self
            .writer
            .clone()
            .acquire_owned()
            .await
            .expect("writer semaphore closed");
        WritableLocalStore {
            shared_store: self.store.clone(),
            store: self.store.lock().unwrap().clone(),
            permit,
        }
    }
}

/// A writable copy of the `LocalStore`. Can be edited and later `save`d to
/// the shared state.
#[derive(Debug)]
#[must_use]
pub struct WritableLocalStore {
    shared_store: Arc<Mutex<LocalStore>>,
    store: LocalStore,
    #[allow(dead_code)]
    permit: OwnedSemaphorePermit,
}

impl WritableLocalStore {
    /// Save the changed `LocalStore`.
    pub fn save(self) {
        *self.shared_store.lock().unwrap() = self.store;
    }
}

impl fmt::Display for WritableLocalStore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "store of node {}", self.store.own_id())
    }
}

impl Deref for WritableLocalStore {
    type Target = LocalStore;
    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for WritableLocalStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}
