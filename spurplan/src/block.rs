use crate::{optional_id_bytes, BlockNumber, NodeId, Transaction, TransactionId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

const HASH_SIZE: usize = 32;

/// A block of a node's chain, carrying the node's outgoing transactions.
///
/// Blocks are appended by their owner only and never change afterwards.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Block {
    /// The number (position) of the block in its owner's chain.
    pub number: BlockNumber,
    /// The owning node, `None` only for the shared genesis block.
    pub owner: Option<NodeId>,
    /// The hash of the previous block of the same chain.
    pub previous_block_hash: BlockHash,
    /// The transactions placed in this block.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Calculate the hash of the block:
    /// SHA-256 over owner ‖ number ‖ previous hash ‖ transaction digests.
    #[must_use]
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Sha256::new();
        hasher.update(&optional_id_bytes(self.owner));
        hasher.update(&self.number.to_be_bytes());
        hasher.update(&self.previous_block_hash.0);
        for transaction in &self.transactions {
            hasher.update(&transaction.digest());
        }
        BlockHash(hasher.finalize().into())
    }

    /// Find a transaction in this block by its identity.
    #[must_use]
    pub fn transaction(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|transaction| transaction.id() == id)
    }
}

// Blocks are compared by identity (owner and position); whether two copies
// carry the same content is a question for `hash()`.
impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.number == other.number
    }
}

impl Eq for Block {}

/// The datatype of hashes of blocks is `BlockHash`.
#[derive(Copy, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct BlockHash(pub(crate) [u8; HASH_SIZE]);

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl Default for BlockHash {
    fn default() -> Self {
        Self([0; HASH_SIZE])
    }
}

impl PartialEq for BlockHash {
    fn eq(&self, other: &Self) -> bool {
        self.0[..] == other.0[..]
    }
}

impl Eq for BlockHash {}

#[allow(clippy::derive_hash_xor_eq)]
impl Hash for BlockHash {
    fn hash<H>(&self, h: &mut H)
    where
        H: Hasher,
    {
        self.0.hash(h);
    }
}

hexerei::impl_hex!(BlockHash, HASH_SIZE, |&hash| &hash.0, |data| Ok(Self(data)));
