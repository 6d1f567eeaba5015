use std::fmt;

const SIGNATURE_LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// The cryptographic signature of some `Signable` data.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(pub(crate) ed25519_dalek::Signature);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

hexerei::impl_hex!(
    Signature,
    SIGNATURE_LEN,
    |&signature| &signature.0.to_bytes(),
    |data| {
        ed25519_dalek::Signature::from_bytes(&data)
            .map(Self)
            .map_err(|_| hexerei::FromHexError::InvalidValue)
    }
);
