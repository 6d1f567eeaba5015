//! One full transfer over real sockets: tracker, main chain and the
//! receiving node each serve on an ephemeral TCP port.

use siegel::Identity;
use spurplan::{genesis_block, NodeId};
use std::{sync::Arc, time::Duration};
use stellwerk::{
    abstract_cache::AbstractCache,
    communication::Communication,
    local_store::{LocalStore, LocalStoreService},
    main_chain::{MainChainService, MemoryMainChain, RpcMainChain},
    peer::Receiver,
    tracker::{MemoryTracker, RpcTracker, Tracker, TrackerService},
};
use telegramm::Address;
use tokio::net::TcpListener;

async fn serve_ephemeral() -> (TcpListener, Address) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string().parse().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn transfer_over_the_wire() {
    let _ = pretty_env_logger::try_init();

    let genesis = genesis_block(&[(NodeId::new(0), 100)]);

    // The external collaborators, served over TCP.
    let (listener, main_chain_addr) = serve_ephemeral().await;
    tokio::spawn(
        MainChainService::new(Arc::new(MemoryMainChain::new())).serve(listener),
    );
    let (listener, tracker_addr) = serve_ephemeral().await;
    tokio::spawn(TrackerService::new(Arc::new(MemoryTracker::new())).serve(listener));

    // The receiving node, serving its peer address.
    let (listener, peer_addr) = serve_ephemeral().await;
    let receiver_identity = Identity::generate();
    let tracker = Arc::new(RpcTracker::new(tracker_addr.clone()));

    // Sender registers first and owns the genesis mint (id 0).
    let sender_identity = Identity::generate();
    let sender_node = tracker
        .register_node(sender_identity.id().clone(), "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let receiver_node = tracker
        .register_node(receiver_identity.id().clone(), peer_addr)
        .await
        .unwrap();

    let receiver_communication = {
        let store =
            LocalStoreService::new(LocalStore::new(receiver_node.clone(), genesis.clone()));
        let cache = Arc::new(AbstractCache::new(
            Arc::new(RpcMainChain::new(main_chain_addr.clone())),
            genesis.hash(),
        ));
        cache.update_to_latest().await.unwrap();
        Arc::new(Communication::new(
            receiver_identity,
            store,
            cache,
            tracker.clone(),
        ))
    };
    tokio::spawn(Receiver::new(receiver_communication.clone()).serve(listener));

    let sender_communication = {
        let store = LocalStoreService::new(LocalStore::new(sender_node, genesis.clone()));
        let cache = Arc::new(AbstractCache::new(
            Arc::new(RpcMainChain::new(main_chain_addr)),
            genesis.hash(),
        ));
        cache.update_to_latest().await.unwrap();
        Communication::new(sender_identity, store, cache, tracker)
    };

    // Create, block and send one transfer end to end.
    let transaction = {
        let mut store = sender_communication.store().get_writable().await;
        let transaction = store.create_transaction(receiver_node.id(), 40).unwrap();
        store.save();
        transaction
    };
    sender_communication
        .create_block(vec![transaction.clone()])
        .await
        .unwrap();
    sender_communication
        .send_transaction(transaction)
        .await
        .unwrap();

    // The delivery is acknowledged before the send returns; the short poll
    // only covers task scheduling.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if receiver_communication.store().get().balance() == 40 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "transfer did not arrive"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
