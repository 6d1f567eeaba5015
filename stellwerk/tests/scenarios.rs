//! End-to-end scenarios: three to four in-process nodes transferring value
//! over an in-memory main chain and tracker, with the full construct /
//! verify pipeline in between.

use siegel::{Identity, Signable};
use spurplan::{genesis_block, Block, BlockNumber, NodeId, Proof, Transaction, TransactionId};
use std::{collections::BTreeMap, sync::Arc};
use stellwerk::{
    abstract_cache::AbstractCache,
    communication::{Communication, CommunicationError},
    local_store::{LocalStore, LocalStoreService},
    main_chain::MemoryMainChain,
    tracker::{MemoryTracker, Tracker},
    verification::VerificationError,
};

struct TestNet {
    main_chain: Arc<MemoryMainChain>,
    tracker: Arc<MemoryTracker>,
    genesis: Block,
}

struct TestNode {
    id: NodeId,
    identity: Identity,
    communication: Communication,
}

impl TestNet {
    fn new(genesis_amounts: &[(u32, u64)]) -> Self {
        let _ = pretty_env_logger::try_init();
        let amounts: Vec<(NodeId, u64)> = genesis_amounts
            .iter()
            .map(|&(id, amount)| (NodeId::new(id), amount))
            .collect();
        Self {
            main_chain: Arc::new(MemoryMainChain::new()),
            tracker: Arc::new(MemoryTracker::new()),
            genesis: genesis_block(&amounts),
        }
    }

    /// Register a node; ids are assigned in registration order.
    async fn spawn_node(&self, name: &str) -> TestNode {
        let identity = Identity::generate();
        identity.id().set_name(name);

        let node = self
            .tracker
            .register_node(identity.id().clone(), "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let store = LocalStoreService::new(LocalStore::new(node.clone(), self.genesis.clone()));
        let cache = Arc::new(AbstractCache::new(
            self.main_chain.clone(),
            self.genesis.hash(),
        ));
        cache.update_to_latest().await.unwrap();

        let communication = Communication::new(
            identity.clone(),
            store,
            cache,
            self.tracker.clone(),
        );
        TestNode {
            id: node.id(),
            identity,
            communication,
        }
    }
}

impl TestNode {
    async fn balance(&self) -> u64 {
        self.communication.store().get().balance()
    }

    async fn unspent_ids(&self) -> Vec<TransactionId> {
        self.communication.store().get().unspent_ids()
    }
}

/// Create, block, prove and deliver one transfer, mirroring the node's send
/// path without the socket in between.
async fn transfer(from: &TestNode, to: &TestNode, amount: u64) -> Result<Proof, CommunicationError> {
    let transaction = {
        let mut store = from.communication.store().get_writable().await;
        let transaction = store.create_transaction(to.id, amount)?;
        store.save();
        transaction
    };
    from.communication.create_block(vec![transaction.clone()]).await?;

    let proof = from.communication.construct_proof(transaction).await?;
    to.communication.receive_transaction(proof.clone()).await?;

    let mut store = from.communication.store().get_writable().await;
    store.advance_meta_from_proof(to.id, &proof);
    store.save();
    Ok(proof)
}

fn block_numbers(proof: &Proof, owner: NodeId) -> Vec<u32> {
    proof
        .blocks_for(owner)
        .iter()
        .map(|block| block.number.into())
        .collect()
}

/// S1: a genesis mint is spent; the receiver ends up with exactly the
/// transferred transaction and an advanced view of the sender's chain.
#[tokio::test]
async fn genesis_spend() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;

    let proof = transfer(&a, &b, 40).await.unwrap();

    assert_eq!(block_numbers(&proof, a.id), [0, 1]);
    assert_eq!(b.balance().await, 40);
    assert_eq!(
        b.unspent_ids().await,
        [TransactionId {
            sender: Some(a.id),
            number: 0,
        }]
    );

    // The receiver recorded what the sender has proven it holds.
    let meta = b.communication.store().get().meta_knowledge(a.id);
    assert_eq!(meta.known_height(a.id), Some(BlockNumber::new(1)));
}

/// S2: a chained spend's proof carries the provenance of the whole input
/// graph: the first sender's committed blocks as well as the spender's.
#[tokio::test]
async fn chained_spend() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;

    transfer(&a, &b, 40).await.unwrap();
    let proof = transfer(&b, &c, 25).await.unwrap();

    // Provenance: A's chain up to the block holding the source, plus B's
    // new block.
    assert_eq!(block_numbers(&proof, a.id), [0, 1]);
    assert_eq!(block_numbers(&proof, b.id), [0, 1]);

    assert_eq!(c.balance().await, 25);
    // C's mirror of A's chain advanced along the way.
    let store = c.communication.store().get();
    assert_eq!(store.chain(a.id).unwrap().height(), BlockNumber::new(1));
}

/// S3: blocks the receiver has already been shown are pruned. Once C has
/// seen A's chain, a second spend sourced from the same A block carries no
/// A blocks at all, only B's new block.
#[tokio::test]
async fn pruned_proof() {
    let net = TestNet::new(&[(0, 100), (3, 30)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;
    let d = net.spawn_node("d").await;

    // Fund A with a second source so one A block can hold two transfers.
    transfer(&d, &a, 30).await.unwrap();

    // One A block, two transactions to B, with distinct sources.
    let (first, second) = {
        let mut store = a.communication.store().get_writable().await;
        let first = store.create_transaction(b.id, 100).unwrap();
        let second = store.create_transaction(b.id, 30).unwrap();
        store.save();
        (first, second)
    };
    a.communication
        .create_block(vec![first.clone(), second.clone()])
        .await
        .unwrap();

    let proof = a.communication.construct_proof(first).await.unwrap();
    b.communication.receive_transaction(proof.clone()).await.unwrap();
    {
        let mut store = a.communication.store().get_writable().await;
        store.advance_meta_from_proof(b.id, &proof);
        store.save();
    }

    // The second delivery from the same block needs no blocks at all.
    let proof = a.communication.construct_proof(second).await.unwrap();
    assert!(proof.chain_updates().is_empty());
    b.communication.receive_transaction(proof).await.unwrap();
    assert_eq!(b.balance().await, 130);

    // First spend: C learns A's (and transitively D's) chain.
    let proof = transfer(&b, &c, 100).await.unwrap();
    assert_eq!(block_numbers(&proof, a.id), [0, 1]);
    assert_eq!(block_numbers(&proof, b.id), [0, 1]);
    assert_eq!(block_numbers(&proof, d.id), [0, 1]);

    // Second spend, sourced from the same A block: no A blocks, no D
    // blocks, only B's new block.
    let proof = transfer(&b, &c, 30).await.unwrap();
    assert!(proof.blocks_for(a.id).is_empty());
    assert!(proof.blocks_for(d.id).is_empty());
    assert_eq!(block_numbers(&proof, b.id), [2]);

    assert_eq!(c.balance().await, 130);
}

/// Proof minimality, checked against the constructor's meta-knowledge
/// snapshot: nothing at or below the receiver's known height is resent.
#[tokio::test]
async fn proofs_carry_nothing_known() {
    let net = TestNet::new(&[(0, 100), (1, 50)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;

    transfer(&a, &b, 10).await.unwrap();
    // B now holds its own mint and the received transfer; spend both ways.
    transfer(&b, &a, 50).await.unwrap();

    let meta_before = {
        let store = b.communication.store().get();
        store.meta_knowledge(a.id)
    };
    let proof = transfer(&b, &a, 10).await.unwrap();

    // Every block in the proof lies above what A was known to possess.
    for (&owner, blocks) in proof.chain_updates() {
        for block in blocks {
            assert!(meta_before.known_height(owner) < Some(block.number));
        }
    }
    // Concretely: only B's second block travelled; the source's A block is
    // pruned because A knows its own chain.
    assert!(proof.blocks_for(a.id).is_empty());
    assert_eq!(block_numbers(&proof, b.id), [2]);
}

/// S4: a transfer whose block was never anchored on the main chain is
/// rejected as not finalized.
#[tokio::test]
async fn not_finalized() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;

    transfer(&a, &b, 40).await.unwrap();

    // B blocks a spend but never commits the block's abstract.
    let (signed, a_blocks, b_blocks) = {
        let mut store = b.communication.store().get_writable().await;
        let mut transaction = store.create_transaction(c.id, 25).unwrap();
        let (number, _) = store.append_own_block(vec![transaction.clone()]).unwrap();
        transaction.block_number = Some(number);
        let a_blocks = store.chain(a.id).unwrap().blocks().to_vec();
        let b_blocks = store.own_chain().blocks().to_vec();
        store.save();
        (transaction.sign(&b.identity).unwrap(), a_blocks, b_blocks)
    };

    let mut chain_updates = BTreeMap::new();
    chain_updates.insert(a.id, a_blocks);
    chain_updates.insert(b.id, b_blocks);
    let proof = Proof::new(signed, chain_updates);

    let err = c.communication.receive_transaction(proof).await.unwrap_err();
    assert!(matches!(
        err,
        CommunicationError::Verification(VerificationError::NotFinalized { .. })
    ));
    assert_eq!(c.balance().await, 0);
}

/// S5: reusing a source already delivered to the same receiver is caught by
/// the consumed-source index.
#[tokio::test]
async fn double_spend() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;

    transfer(&a, &b, 40).await.unwrap();
    transfer(&b, &c, 25).await.unwrap();

    // Forge a second spend of the same source.
    let source = TransactionId {
        sender: Some(a.id),
        number: 0,
    };
    let forged = Transaction::new(1, b.id, c.id, 25, 15, vec![source]);
    b.communication.create_block(vec![forged.clone()]).await.unwrap();
    let proof = b.communication.construct_proof(forged).await.unwrap();

    let err = c.communication.receive_transaction(proof).await.unwrap_err();
    assert!(matches!(
        err,
        CommunicationError::Verification(VerificationError::DoubleSpend(id)) if id == source
    ));
    assert_eq!(c.balance().await, 25);
}

/// S6: amounts that do not balance against the sources are rejected.
#[tokio::test]
async fn conservation_violation() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;

    transfer(&a, &b, 100).await.unwrap();

    let source = TransactionId {
        sender: Some(a.id),
        number: 0,
    };
    let forged = Transaction::new(0, b.id, c.id, 50, 60, vec![source]);
    b.communication.create_block(vec![forged.clone()]).await.unwrap();
    let proof = b.communication.construct_proof(forged).await.unwrap();

    let err = c.communication.receive_transaction(proof).await.unwrap_err();
    assert!(matches!(
        err,
        CommunicationError::Verification(VerificationError::ConservationViolation {
            sources: 100,
            spent: 110,
        })
    ));
    assert_eq!(c.balance().await, 0);
}

/// A receiver's state is untouched by a rejected transaction: the failed
/// delivery leaves no mirrored blocks behind.
#[tokio::test]
async fn rejected_transactions_leave_no_trace() {
    let net = TestNet::new(&[(0, 100)]);
    let a = net.spawn_node("a").await;
    let b = net.spawn_node("b").await;
    let c = net.spawn_node("c").await;

    transfer(&a, &b, 100).await.unwrap();

    let source = TransactionId {
        sender: Some(a.id),
        number: 0,
    };
    let forged = Transaction::new(0, b.id, c.id, 50, 60, vec![source]);
    b.communication.create_block(vec![forged.clone()]).await.unwrap();
    let proof = b.communication.construct_proof(forged).await.unwrap();
    c.communication.receive_transaction(proof).await.unwrap_err();

    // The proof carried A's and B's blocks, but nothing was saved.
    let store = c.communication.store().get();
    assert!(store.chain(a.id).is_none());
    assert!(store.chain(b.id).is_none());
}
