#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! Key material and signatures of ledger participants.
//!
//! A node generates an [`Identity`] once, registers the public half (its
//! [`PeerId`]) at the tracker, and from then on signs exactly two kinds of
//! values: the transactions it transfers and the abstracts of the blocks it
//! appends. Both describe their canonical bytes through [`Signable`] and
//! travel as [`Signed`] values; the receiving side checks the signature and,
//! separately, that the embedded signer is the key registered for the
//! claimed node.
//!
//! ```
//! use siegel::Identity;
//!
//! let identity = Identity::generate();
//!
//! // The secret half round-trips through its hex form (that is how it is
//! // stored in the config directory)...
//! let restored = Identity::from_hex(&identity.hex()).unwrap();
//!
//! // ...and still derives the same public id.
//! assert_eq!(identity.id(), restored.id());
//! ```

mod error;
mod key;
mod signable;
mod signature;

pub use error::Error;
pub use key::{Identity, PeerId};
pub use signable::{Signable, Signed};
pub use signature::Signature;
