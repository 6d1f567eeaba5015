//! The client side of the tracker, the node registry.
//!
//! The tracker assigns node ids and hands out the node table. Discovery
//! itself is an external concern; nodes only consume the two operations
//! below.

mod memory;
mod rpc;

pub use memory::MemoryTracker;
pub use rpc::{RpcTracker, TrackerService};

use async_trait::async_trait;
use err_derive::Error;
use siegel::PeerId;
use spurplan::{Node, NodeId};
use std::collections::HashMap;
use telegramm::Address;

/// An error while talking to the tracker.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    /// The request did not reach the tracker. Transient; callers may retry.
    #[error(display = "{}", 0)]
    Transport(#[error(from)] telegramm::Error),
}

/// The operations a node needs from the tracker.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Register a public key and peer address. Registering the same key
    /// again returns the existing entry.
    async fn register_node(
        &self,
        peer_id: PeerId,
        address: Address,
    ) -> Result<Node, TrackerError>;

    /// Fetch the complete node table.
    async fn update_nodes(&self) -> Result<HashMap<NodeId, Node>, TrackerError>;
}
