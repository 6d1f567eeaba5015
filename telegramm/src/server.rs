//! A server side for a [`define_api!`](crate::define_api) API.

use crate::{frame, BoxError, Request};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, marker::PhantomData, net::SocketAddr};
use tokio::net::{TcpListener, TcpStream};

/// A successfully handled request, already encoded for the wire.
#[derive(Debug)]
pub struct Response(Vec<u8>);

impl Response {
    /// Encode a response value.
    pub fn new<T>(value: &T) -> Result<Self, crate::Error>
    where
        T: Serialize,
    {
        Ok(Self(postcard::to_stdvec(value)?))
    }
}

/// Handles a request and returns the corresponding response.
#[async_trait]
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// Handle the request.
    async fn handle(&self, addr: &SocketAddr, req: T) -> Result<Response, BoxError>;
}

/// A server instance, listening for connections and dispatching requests
/// to its handler.
pub struct Server<T, H> {
    request_data: PhantomData<fn() -> T>,
    handler: H,
}

impl<T, H> Clone for Server<T, H>
where
    H: Clone,
{
    fn clone(&self) -> Self {
        Self {
            request_data: PhantomData,
            handler: self.handler.clone(),
        }
    }
}

impl<T, H> Server<T, H>
where
    T: DeserializeOwned + Debug + Send + 'static,
    H: Handler<T>,
{
    /// Create a new server instance.
    ///
    /// The `handler` needs to provide a `handle` callback to handle requests
    /// on the server.
    #[must_use]
    pub const fn new(handler: H) -> Self {
        Self {
            request_data: PhantomData,
            handler,
        }
    }

    /// The main server loop.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        log::info!(
            "Server is now listening on port {}.",
            listener.local_addr()?.port()
        );
        loop {
            let (stream, peer_addr) = listener.accept().await?;

            let clone_self = self.clone();

            // handle the client in a new task
            tokio::spawn(async move {
                log::debug!("Connected: {}", peer_addr);
                match clone_self.handle_client(peer_addr, stream).await {
                    Ok(()) => log::debug!("Disconnected: {}", peer_addr),
                    Err(err) => log::warn!("Server error: {:?}", err),
                }
            });
        }
    }

    async fn handle_client(self, addr: SocketAddr, mut stream: TcpStream) -> Result<(), BoxError> {
        while let Some(payload) = frame::read(&mut stream).await? {
            // handle the request
            let res = match self.handle_request(&addr, &payload).await {
                Ok(res) => Ok(res.0),
                Err(err) => Err(err.to_string()),
            };

            // send the response envelope
            frame::write(&mut stream, &postcard::to_stdvec(&res)?).await?;
        }
        Ok(())
    }

    async fn handle_request(&self, addr: &SocketAddr, req: &[u8]) -> Result<Response, BoxError> {
        // Deserialize request.
        let req: T = postcard::from_bytes(req)?;
        log::trace!("Received request from {}: {:?}", addr, req);
        // handle the actual request
        let res = self.handler.handle(addr, req).await;
        log::trace!("Send response to {}: {:?}", addr, res.as_ref().map(|_| ()));
        res
    }
}

/// Encode the response of a request by its request type.
pub trait ServerRequest<T>: Request<T> + Sized {
    /// Turn a plain response value into a wire [`Response`].
    fn response(res: Self::Response) -> Result<Response, BoxError> {
        Ok(Response::new(&res)?)
    }
}

impl<T, R> ServerRequest<T> for R where R: Request<T> {}
