#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! The track plan of the scale-out ledger.
//!
//! Every participant runs its own linear [`Chain`] of [`Block`]s carrying
//! value [`Transaction`]s, and anchors [`BlockAbstract`]s of those blocks on
//! a shared main chain. Transfers between participants travel together with
//! a [`Proof`]: the minimal slice of foreign chains the receiver needs,
//! pruned by [`MetaKnowledge`], the record of what the receiver has already
//! been shown.
//!
//! This crate holds the data model shared by nodes and their external
//! collaborators, plus the wire APIs ([`message`]) of the main chain and the
//! tracker.

pub mod chain;
pub mod message;

mod block;
mod block_abstract;
mod block_number;
mod meta_knowledge;
mod node;
mod proof;
mod transaction;

pub use block::{Block, BlockHash};
pub use block_abstract::{BlockAbstract, ChainStatus};
pub use block_number::BlockNumber;
pub use chain::{genesis_block, Chain};
pub use meta_knowledge::MetaKnowledge;
pub use node::{Node, NodeId};
pub use proof::Proof;
pub use transaction::{SignError, Transaction, TransactionId};

/// Canonical byte encoding of an optional node id.
///
/// The absent id (genesis mints have no sender, the genesis block has no
/// owner) is reserved as `0xFFFF_FFFF`.
pub(crate) fn optional_id_bytes(id: Option<NodeId>) -> [u8; 4] {
    id.map_or([0xFF; 4], NodeId::to_be_bytes)
}
