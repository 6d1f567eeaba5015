#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! Ein Stellwerk stellt die Weichen: **the signal box of the scale-out
//! ledger**.
//!
//! Starts one node: registers at the tracker, synchronizes the abstract
//! cache with the main chain and serves inbound transfers on the peer
//! address.

use serde::Deserialize;
use siegel::Identity;
use spurplan::genesis_block;
use std::{fs, sync::Arc, time::Duration};
use stellwerk::{
    abstract_cache::AbstractCache,
    communication::Communication,
    local_store::{LocalStore, LocalStoreService},
    main_chain::{MainChainClient, RpcMainChain},
    peer::Receiver,
    tracker::{RpcTracker, Tracker},
};
use structopt::StructOpt;
use telegramm::Address;
use tokio::net::TcpListener;

const MAIN_CHAIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(StructOpt, Debug)]
struct Opt {
    /// The identity name to load from the config directory.
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Config {
    /// The address this node's peer server binds to.
    bind_address: String,
    /// The address other nodes reach this node's peer server at.
    peer_address: Address,
    /// The address of the tracker.
    tracker_address: Address,
    /// The address of the main chain.
    main_chain_address: Address,
    /// The genesis mints: one amount per node id.
    genesis: Vec<GenesisAccount>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenesisAccount {
    id: u32,
    amount: u64,
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    log::info!("Stellwerk besetzt.");

    let opt = Opt::from_args();
    log::debug!("Command line arguments: {:#?}", opt);

    // load and parse config
    let config_data = fs::read_to_string("./config/config.toml").unwrap();
    let config: Config = toml::from_str(&config_data).unwrap();

    let hex_identity = fs::read_to_string(format!("./config/{0}/{0}.key", opt.name))
        .expect("Could not load identity file.");
    let identity = Identity::from_hex(hex_identity.trim()).expect("Identity could not be loaded.");
    identity.id().set_name(&opt.name);

    // register at the tracker
    let tracker = Arc::new(RpcTracker::new(config.tracker_address.clone()));
    let own_node = tracker
        .register_node(identity.id().clone(), config.peer_address.clone())
        .await
        .expect("Could not register at the tracker.");
    log::info!("Registered as node {}.", own_node.id());

    // the shared genesis block
    let amounts: Vec<_> = config
        .genesis
        .iter()
        .map(|account| (account.id.into(), account.amount))
        .collect();
    let genesis = genesis_block(&amounts);

    let store = LocalStoreService::new(LocalStore::new(own_node, genesis.clone()));

    // mirror the committed abstracts of the main chain
    let main_chain = Arc::new(RpcMainChain::new(config.main_chain_address.clone()));
    let cache = Arc::new(AbstractCache::new(main_chain.clone(), genesis.hash()));
    cache.initial_update().await;

    // follow the main chain's height in the background
    {
        let cache = cache.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(MAIN_CHAIN_POLL_INTERVAL).await;
                match main_chain.status().await {
                    Ok(status) => cache.note_new_height(status.latest_height),
                    Err(err) => log::warn!("Could not poll the main chain: {}", err),
                }
            }
        });
    }

    let communication = Arc::new(Communication::new(identity, store, cache, tracker));

    // serve inbound transfers
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .expect("Could not bind the peer address.");
    let receiver = Receiver::new(communication);
    if let Err(err) = receiver.serve(listener).await {
        log::error!("Receiver failed: {}", err);
    }

    log::info!("Weichen auf Halt. Bye.");
}
