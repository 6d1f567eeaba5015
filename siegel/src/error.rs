use err_derive::Error;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// An error of the `siegel` crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Hex-encoded key or signature material could not be parsed.
    #[error(display = "malformed hex material: {}", 0)]
    MalformedHex(#[error(from)] hexerei::FromHexError),

    /// The key or signature was rejected by the Ed25519 backend. Invalid
    /// material surfaces here, never as a panic.
    #[error(display = "rejected by ed25519: {}", 0)]
    Rejected(#[error(from)] ed25519_dalek::SignatureError),

    /// A `Signable` could not assemble its canonical bytes.
    #[error(display = "no canonical bytes to sign: {}", 0)]
    Canonical(BoxError),
}

impl Error {
    pub(crate) fn canonical(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Canonical(err.into())
    }
}
