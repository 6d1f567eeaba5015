use crate::{Block, NodeId, Transaction};
use serde::{Deserialize, Serialize};
use siegel::Signed;
use std::collections::BTreeMap;

/// The provenance bundle accompanying a transaction on the wire.
///
/// For every node it mentions, `chain_updates` holds a contiguous ascending
/// slice of that node's chain, starting right after the highest block the
/// receiver is known to possess and ending at a committed block. The
/// receiver can extend its mirrors with these blocks and then validate the
/// transaction without trusting the sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proof {
    transaction: Signed<Transaction>,
    chain_updates: BTreeMap<NodeId, Vec<Block>>,
}

impl Proof {
    /// Bundle a signed transaction with its chain updates.
    #[must_use]
    pub const fn new(
        transaction: Signed<Transaction>,
        chain_updates: BTreeMap<NodeId, Vec<Block>>,
    ) -> Self {
        Self {
            transaction,
            chain_updates,
        }
    }

    /// The transaction this proof justifies.
    #[must_use]
    pub const fn transaction(&self) -> &Signed<Transaction> {
        &self.transaction
    }

    /// The chain slices the receiver is missing, per owner.
    #[must_use]
    pub const fn chain_updates(&self) -> &BTreeMap<NodeId, Vec<Block>> {
        &self.chain_updates
    }

    /// The blocks this proof carries for one node.
    #[must_use]
    pub fn blocks_for(&self, owner: NodeId) -> &[Block] {
        self.chain_updates
            .get(&owner)
            .map_or(&[], Vec::as_slice)
    }
}
