#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! A telegram is the digital message a trackside balise transmits to a
//! passing train. This crate carries the telegrams of the ledger: small
//! request/response messages framed with a length prefix and encoded with
//! `postcard`, sent over plain TCP.
//!
//! An API is described once with [`define_api!`]; the same definition drives
//! the typed [`client::Client`] and the [`server::Server`].

pub mod client;
pub mod server;

mod address;
mod error;
mod frame;
mod macros;

pub use address::Address;
pub use error::Error;

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request to the API always has a specific response type.
pub trait Request<T>: Serialize + Into<T> + Debug {
    /// The type of the response.
    type Response: Serialize + DeserializeOwned + Debug;
}
