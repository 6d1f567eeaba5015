use serde::{Deserialize, Serialize};
use siegel::PeerId;
use std::{
    convert::TryInto,
    fmt,
    hash::{Hash, Hasher},
};
use telegramm::Address;

/// The registry identifier of a node.
///
/// Ids are handed out by the tracker at registration time and are the only
/// way blocks and transactions refer to nodes.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a node id from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the stored integer as a big-endian byte array.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Create a `NodeId` from a byte slice.
    #[must_use]
    pub fn from_be_bytes(bytes: impl AsRef<[u8]>) -> Option<Self> {
        let bytes = bytes.as_ref().try_into().ok()?;
        Some(Self(u32::from_be_bytes(bytes)))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<NodeId> for u32 {
    fn from(v: NodeId) -> Self {
        v.0
    }
}

/// A registered participant as the tracker hands it out: id, public key and
/// the address its peer server listens on.
///
/// The private half of the key never appears here; it stays in the owning
/// process as a `siegel::Identity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    peer_id: PeerId,
    address: Address,
}

impl Node {
    /// Create a new node entry.
    #[must_use]
    pub const fn new(id: NodeId, peer_id: PeerId, address: Address) -> Self {
        Self {
            id,
            peer_id,
            address,
        }
    }

    /// The registry id of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The public key of the node.
    #[must_use]
    pub const fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The address the node's peer server listens on.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.address
    }
}

// There is one logical node per id; two entries with the same id denote the
// same node.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

#[allow(clippy::derive_hash_xor_eq)]
impl Hash for Node {
    fn hash<H>(&self, h: &mut H)
    where
        H: Hasher,
    {
        self.id.hash(h);
    }
}
