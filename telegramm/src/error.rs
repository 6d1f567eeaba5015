#![allow(clippy::pub_enum_variant_names)]

use err_derive::Error;

/// An error of the `telegramm` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The message does not fit into a frame.
    #[error(display = "The message is too long.")]
    MessageTooLong,

    /// The connection was closed before the response arrived.
    #[error(display = "The connection was closed early.")]
    ConnectionClosed,

    /// An IO error.
    #[error(display = "{}", 0)]
    IO(#[error(from)] std::io::Error),

    /// An encoding error.
    #[error(display = "{}", 0)]
    Encoding(#[error(from)] postcard::Error),

    /// The other side handled the request but reported a failure.
    #[error(display = "Server: {}", 0)]
    Server(#[error(from)] String),
}
