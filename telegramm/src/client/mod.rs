//! The calling side of a [`define_api!`](crate::define_api) API.

mod pool;

use crate::{frame, Address, Error, Request};
use serde::Serialize;
use std::{marker::PhantomData, time::Duration};

/// How often a lease (including the underlying connect) is attempted before
/// the error is surfaced. The delay grows linearly between attempts.
const LEASE_ATTEMPTS: u32 = 4;
const LEASE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// A typed client for one API endpoint.
///
/// Connections to the endpoint are pooled process-wide, so constructing a
/// client per request costs nothing beyond the address clone.
///
/// ```
/// use telegramm::{client::Client, define_api};
/// use serde::{Deserialize, Serialize};
///
/// define_api! {
///     /// Requests understood by a level crossing.
///     mod crossing;
///     /// One of the crossing requests.
///     pub enum CrossingMessage {
///         /// Lower barrier number `n`; answers whether it moved.
///         Lower(u32) => bool,
///     }
/// }
///
/// # async fn demo() -> Result<(), telegramm::Error> {
/// let mut client = Client::new("crossing.local:2480".parse().unwrap());
/// let moved = client.send_request(crossing::Lower(7)).await?;
/// # let _ = moved;
/// # Ok(())
/// # }
/// # fn main() {}
/// ```
pub struct Client<T> {
    addr: Address,
    request_data: PhantomData<T>,
}

impl<T> Client<T> {
    /// Create a client for the endpoint at `addr`.
    #[must_use]
    pub const fn new(addr: Address) -> Self {
        Self {
            addr,
            request_data: PhantomData,
        }
    }

    /// Send a request and wait for its typed response.
    pub async fn send_request<Req>(&mut self, req: Req) -> Result<Req::Response, Error>
    where
        Req: Request<T>,
        T: Serialize,
    {
        log::trace!("Sending request to {}: {:?}", self.addr, req);
        let request: T = req.into();
        let payload = postcard::to_stdvec(&request)?;

        let mut lease = self.lease_with_retry().await?;
        frame::write(lease.stream_mut(), &payload).await?;
        let response = frame::read(lease.stream_mut())
            .await?
            .ok_or(Error::ConnectionClosed)?;
        // The exchange went through; anything below is a decoding problem,
        // not the connection's fault.
        lease.release().await;

        match postcard::from_bytes::<Result<&[u8], String>>(&response)? {
            Ok(data) => {
                let response = postcard::from_bytes(data)?;
                log::trace!("Received response from {}: {:?}", self.addr, response);
                Ok(response)
            }
            Err(message) => Err(Error::Server(message)),
        }
    }

    /// Lease a pooled connection, retrying a few times while the endpoint
    /// is unreachable.
    async fn lease_with_retry(&self) -> Result<pool::Lease, Error> {
        let mut attempt = 1;
        loop {
            match pool::lease(self.addr.clone()).await {
                Ok(lease) => return Ok(lease),
                Err(err) if attempt < LEASE_ATTEMPTS => {
                    let delay = LEASE_RETRY_DELAY * attempt;
                    log::warn!(
                        "Connection attempt {}/{} to {} failed, next try in {:?}: {}",
                        attempt,
                        LEASE_ATTEMPTS,
                        self.addr,
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
