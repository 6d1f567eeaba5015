#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! Ein Stellwerk stellt die Weichen: **the signal box of the scale-out
//! ledger**.
//!
//! ## Overview
//!
//! `Stellwerk` is a node of a scale-out distributed ledger. Every node
//! appends transactions to its own chain of blocks and anchors abstracts of
//! those blocks on a shared byzantine-fault-tolerant main chain, which acts
//! as the global ordering and finality oracle. Value transfers are sent
//! directly between nodes, accompanied by a proof: the minimal slice of
//! foreign chains, pruned by what the receiver has already been shown,
//! that lets the receiver validate the provenance of every input.
//!
//! The node keeps an eventually-consistent mirror of the committed abstract
//! hashes (the [`abstract_cache`]), builds proofs with the
//! [`proof_constructor`], validates incoming transfers in [`verification`]
//! and keeps all local state in the [`local_store`].

pub mod abstract_cache;
pub mod communication;
pub mod local_store;
pub mod main_chain;
pub mod peer;
pub mod proof_constructor;
pub mod tracker;
pub mod verification;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
