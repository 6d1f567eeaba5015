use crate::{optional_id_bytes, BlockNumber, NodeId};
use err_derive::Error;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use siegel::Signable;
use std::{
    fmt,
    hash::{Hash, Hasher},
};

/// The identity of a transaction: issuing node and per-issuer number.
///
/// A source reference is exactly such an identity; the referenced
/// transaction is resolved lazily against the owner's chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId {
    /// The issuing node, `None` for genesis mints.
    pub sender: Option<NodeId>,
    /// The number, unique within the issuer's chain.
    pub number: u32,
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.sender {
            Some(sender) => write!(f, "{}/{}", sender, self.number),
            None => write!(f, "genesis/{}", self.number),
        }
    }
}

/// A value transfer between two nodes.
///
/// `amount` goes to the `receiver`, `remainder` stays with the `sender`;
/// both are covered by the `sources` consumed as inputs. Once placed in a
/// block the transaction is immutable and `block_number` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// The number, unique within the sender's chain.
    pub number: u32,
    /// The sending node, `None` for genesis mints.
    pub sender: Option<NodeId>,
    /// The receiving node.
    pub receiver: NodeId,
    /// The amount transferred to the receiver.
    pub amount: u64,
    /// The amount remaining with the sender.
    pub remainder: u64,
    /// Prior transactions consumed as inputs, in insertion order.
    pub sources: Vec<TransactionId>,
    /// The number of the block this transaction was placed in.
    pub block_number: Option<BlockNumber>,
}

impl Transaction {
    /// Create a new transfer. The transaction is not part of a block yet.
    #[must_use]
    pub const fn new(
        number: u32,
        sender: NodeId,
        receiver: NodeId,
        amount: u64,
        remainder: u64,
        sources: Vec<TransactionId>,
    ) -> Self {
        Self {
            number,
            sender: Some(sender),
            receiver,
            amount,
            remainder,
            sources,
            block_number: None,
        }
    }

    /// Create a genesis mint: value that exists without sources.
    #[must_use]
    pub const fn mint(number: u32, receiver: NodeId, amount: u64) -> Self {
        Self {
            number,
            sender: None,
            receiver,
            amount,
            remainder: 0,
            sources: Vec::new(),
            block_number: None,
        }
    }

    /// The identity of this transaction.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        TransactionId {
            sender: self.sender,
            number: self.number,
        }
    }

    /// Whether this transaction is a genesis mint.
    #[must_use]
    pub const fn is_mint(&self) -> bool {
        self.sender.is_none()
    }

    /// The canonical byte layout, used for signing and hashing:
    ///
    /// `sender (4B) ‖ receiver (4B) ‖ number (4B) ‖ amount (8B) ‖
    /// remainder (8B) ‖ sources`, every integer big-endian, every source as
    /// `sender (4B) ‖ number (4B)` in insertion order.
    #[must_use]
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(28 + self.sources.len() * 8);
        bytes.extend_from_slice(&optional_id_bytes(self.sender));
        bytes.extend_from_slice(&self.receiver.to_be_bytes());
        bytes.extend_from_slice(&self.number.to_be_bytes());
        bytes.extend_from_slice(&self.amount.to_be_bytes());
        bytes.extend_from_slice(&self.remainder.to_be_bytes());
        for source in &self.sources {
            bytes.extend_from_slice(&optional_id_bytes(source.sender));
            bytes.extend_from_slice(&source.number.to_be_bytes());
        }
        bytes
    }

    /// The SHA-256 digest of the canonical bytes.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(&self.canonical_bytes()).into()
    }
}

// Transactions are compared by identity; the content of a transaction with
// a given identity never changes after block inclusion.
impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Transaction {}

#[allow(clippy::derive_hash_xor_eq)]
impl Hash for Transaction {
    fn hash<H>(&self, h: &mut H)
    where
        H: Hasher,
    {
        self.id().hash(h);
    }
}

/// An error while creating the signable form of a transaction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SignError {
    /// Genesis mints have no sender and are never signed.
    #[error(display = "a genesis transaction cannot be signed")]
    GenesisTransaction,
}

impl Signable for Transaction {
    type SignableData = Vec<u8>;
    type Error = SignError;

    fn signable_data(&self) -> Result<Self::SignableData, Self::Error> {
        if self.sender.is_none() {
            return Err(SignError::GenesisTransaction);
        }
        Ok(self.canonical_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_bytes_layout() {
        let transaction = Transaction::new(
            3,
            NodeId::new(1),
            NodeId::new(2),
            40,
            60,
            vec![
                TransactionId {
                    sender: None,
                    number: 1,
                },
                TransactionId {
                    sender: Some(NodeId::new(4)),
                    number: 7,
                },
            ],
        );

        let bytes = transaction.canonical_bytes();
        assert_eq!(bytes.len(), 28 + 2 * 8);
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]); // sender
        assert_eq!(&bytes[4..8], &[0, 0, 0, 2]); // receiver
        assert_eq!(&bytes[8..12], &[0, 0, 0, 3]); // number
        assert_eq!(&bytes[12..20], &40u64.to_be_bytes()); // amount
        assert_eq!(&bytes[20..28], &60u64.to_be_bytes()); // remainder
        assert_eq!(&bytes[28..32], &[0xFF; 4]); // genesis source sender
        assert_eq!(&bytes[32..36], &[0, 0, 0, 1]);
        assert_eq!(&bytes[36..40], &[0, 0, 0, 4]);
        assert_eq!(&bytes[40..44], &[0, 0, 0, 7]);
    }

    #[test]
    fn identity_ignores_payload() {
        let a = Transaction::new(0, NodeId::new(1), NodeId::new(2), 40, 60, vec![]);
        let mut b = a.clone();
        b.amount = 99;
        assert_eq!(a, b);

        let other_number = Transaction::new(1, NodeId::new(1), NodeId::new(2), 40, 60, vec![]);
        assert_ne!(a, other_number);
    }

    #[test]
    fn mints_are_unsignable() {
        let mint = Transaction::mint(0, NodeId::new(1), 100);
        assert!(mint.signable_data().is_err());
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = Transaction::new(0, NodeId::new(1), NodeId::new(2), 40, 60, vec![]);
        assert_eq!(a.digest(), a.clone().digest());

        let mut b = a.clone();
        b.remainder = 61;
        assert_ne!(a.digest(), b.digest());
    }
}
