use crate::{Error, Identity, PeerId, Signature};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

/// Something with a canonical byte form a node puts its signature on.
///
/// In this ledger that is a transaction before it is transferred and a
/// block abstract before it is committed to the main chain. The canonical
/// bytes must be derivable from the value's content alone, bit for bit,
/// or the counterparty has nothing stable to verify against.
///
/// ```
/// use siegel::{Identity, Signable};
/// use std::convert::Infallible;
///
/// // A bare-bones transfer: `amount` coins to node `to`.
/// struct Transfer {
///     to: u32,
///     amount: u64,
/// }
///
/// impl Signable for Transfer {
///     type SignableData = Vec<u8>;
///     type Error = Infallible;
///
///     fn signable_data(&self) -> Result<Self::SignableData, Self::Error> {
///         let mut bytes = self.to.to_be_bytes().to_vec();
///         bytes.extend_from_slice(&self.amount.to_be_bytes());
///         Ok(bytes)
///     }
/// }
///
/// let identity = Identity::generate();
/// let signed = Transfer { to: 7, amount: 40 }.sign(&identity).unwrap();
///
/// assert_eq!(signed.signer(), identity.id());
/// signed.verify().unwrap();
/// assert_eq!(signed.body().amount, 40);
/// ```
pub trait Signable {
    /// The canonical byte representation.
    type SignableData: AsRef<[u8]>;

    /// What can go wrong while assembling the canonical bytes.
    type Error: StdError + Send + Sync + 'static;

    /// Assemble the canonical bytes of this value.
    fn signable_data(&self) -> Result<Self::SignableData, Self::Error>;

    /// Wrap this value with the signer's id and a signature over its
    /// canonical bytes.
    fn sign(self, identity: &Identity) -> Result<Signed<Self>, Error>
    where
        Self: Sized,
    {
        let signature = identity.sign(&self)?;
        Ok(Signed {
            signer: identity.id().clone(),
            body: self,
            signature,
        })
    }
}

/// A value bundled with the id of its signer and a signature over its
/// canonical bytes.
///
/// The bundle proves nothing by itself. Receivers call
/// [`verify`](Self::verify) and then check, against their node table, that
/// the embedded signer is the key registered for the node the value claims
/// to come from; both checks together tie the value to its origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signed<T> {
    signer: PeerId,
    body: T,
    signature: Signature,
}

impl<T> Signed<T> {
    /// The id the signature claims to come from.
    pub const fn signer(&self) -> &PeerId {
        &self.signer
    }

    /// The signature over the body's canonical bytes.
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The signed value. Nothing is checked on this path.
    pub const fn body(&self) -> &T {
        &self.body
    }

    /// Unwrap the signed value. Nothing is checked on this path.
    #[allow(clippy::missing_const_for_fn)]
    pub fn into_body(self) -> T {
        self.body
    }
}

impl<T> Signed<T>
where
    T: Signable,
{
    /// Check the signature against the embedded signer.
    pub fn verify(&self) -> Result<(), Error> {
        self.signer.verify(&self.body, &self.signature)
    }
}
