//! Wire APIs of the external collaborators every node talks to.

use crate::{BlockAbstract, BlockHash, ChainStatus, Node, NodeId};
use serde::{Deserialize, Serialize};
use siegel::{PeerId, Signed};
use std::collections::HashMap;
use telegramm::{define_api, Address};

define_api! {
    /// The request module of the main-chain API.
    mod main_chain;
    /// A request to the main chain: the shared ordering and finality oracle.
    pub enum MainChainMessage {
        /// Report the current chain status.
        Status => ChainStatus,
        /// Fetch all abstracts ordered at the given height.
        Query(u64) => Vec<Signed<BlockAbstract>>,
        /// Commit a signed block abstract. Idempotent by block hash.
        Commit(Signed<BlockAbstract>) => BlockHash,
    }
}

define_api! {
    /// The request module of the tracker API.
    mod tracker;
    /// A request to the tracker, the node registry.
    pub enum TrackerMessage {
        /// Register a public key and peer address, yielding the node entry.
        Register(PeerId, Address) => Node,
        /// Fetch the complete node table.
        ListNodes => HashMap<NodeId, Node>,
    }
}
