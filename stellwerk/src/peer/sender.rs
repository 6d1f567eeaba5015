//! A client for delivering transfers to other nodes.

use super::{message, PeerMessage, Pong};
use spurplan::Proof;
use telegramm::{client::Client, Address};

/// A sender instance.
pub struct Sender {
    client: Client<PeerMessage>,
}

impl Sender {
    /// Create a new sender instance for the receiver at `addr`.
    #[must_use]
    pub const fn new(addr: Address) -> Self {
        Self {
            client: Client::new(addr),
        }
    }

    /// Deliver a transaction and its proof.
    pub async fn send_transaction(&mut self, proof: Proof) -> Result<(), telegramm::Error> {
        self.client
            .send_request(message::SendTransaction(proof))
            .await
    }

    /// Check whether the receiver is reachable.
    pub async fn ping(&mut self) -> Result<Pong, telegramm::Error> {
        self.client.send_request(message::Ping).await
    }
}
