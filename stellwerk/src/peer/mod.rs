//! Message types and endpoints for node-to-node transfers.
//!
//! # Example
//!
//! ```no_run
//! use stellwerk::peer::Sender;
//!
//! # async fn example() {
//! // use a sender to reach another node's receiver
//! let addr = "127.0.0.1:2480".parse().unwrap();
//! let mut sender = Sender::new(addr);
//! match sender.ping().await {
//!     Err(err) => log::error!("Failed to send Ping: {}", err),
//!     Ok(res) => log::debug!("Ping response: {:?}", res),
//! }
//! # }
//! ```

mod receiver;
mod sender;

pub use receiver::Receiver;
pub use sender::Sender;

use serde::{Deserialize, Serialize};
use spurplan::Proof;
use telegramm::define_api;

/// Play ping pong. See [`Ping`](message/struct.Ping.html).
#[derive(Debug, Serialize, Deserialize)]
pub struct Pong;

define_api! {
    /// The message API module for communication between nodes.
    mod message;
    /// One of the requests.
    pub enum PeerMessage {
        /// Deliver a transaction together with the proof justifying it.
        SendTransaction(Proof) => (),

        /// Ping Message. See [`Pong`](../struct.Pong.html).
        Ping => Pong,
    }
}
