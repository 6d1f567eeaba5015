use super::{Tracker, TrackerError};
use async_trait::async_trait;
use siegel::PeerId;
use spurplan::{Node, NodeId};
use std::{collections::HashMap, sync::Mutex};
use telegramm::Address;

/// An in-memory tracker assigning sequential node ids.
///
/// Used as a test double and for single-machine setups.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    nodes: Mutex<HashMap<NodeId, Node>>,
}

impl MemoryTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tracker for MemoryTracker {
    async fn register_node(
        &self,
        peer_id: PeerId,
        address: Address,
    ) -> Result<Node, TrackerError> {
        let mut nodes = self.nodes.lock().unwrap();
        if let Some(existing) = nodes.values().find(|node| *node.peer_id() == peer_id) {
            return Ok(existing.clone());
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = NodeId::new(nodes.len() as u32);
        let node = Node::new(id, peer_id, address);
        nodes.insert(id, node.clone());
        log::info!("Registered node {} at {}.", id, node.address());
        Ok(node)
    }

    async fn update_nodes(&self) -> Result<HashMap<NodeId, Node>, TrackerError> {
        Ok(self.nodes.lock().unwrap().clone())
    }
}
