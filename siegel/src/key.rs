//! Key material: the secret [`Identity`] a node keeps to itself and the
//! public [`PeerId`] everyone else knows it by.

use crate::{Error, Signable, Signature};
use ed25519_dalek::{ExpandedSecretKey, PublicKey, SecretKey, Verifier};
use hex::FromHex;
use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
    sync::RwLock,
};

const SEED_LEN: usize = ed25519_dalek::SECRET_KEY_LENGTH;
const PUBLIC_LEN: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;

/// The key pair a node generates before registering at the tracker.
///
/// The public half becomes the node's [`PeerId`] in the registry; the
/// secret half never leaves the process and signs every outgoing
/// transaction and every block abstract. Ed25519 signing is deterministic:
/// the same canonical bytes always produce the same signature, so a
/// re-signed transaction stays byte-identical on the wire.
pub struct Identity {
    id: PeerId,
    secret: SecretKey,
}

impl Identity {
    fn with_secret(secret: SecretKey) -> Self {
        Self {
            id: PeerId((&secret).into()),
            secret,
        }
    }

    /// Generate a fresh key pair from the system's entropy source.
    #[must_use]
    pub fn generate() -> Self {
        Self::with_secret(SecretKey::generate(&mut rand::rngs::OsRng {}))
    }

    /// Load an identity from the hex form of its seed, as written by the
    /// `gen-key` tool into the config directory.
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let seed: [u8; SEED_LEN] = FromHex::from_hex(hex).map_err(hexerei::FromHexError::Hex)?;
        Ok(Self::with_secret(SecretKey::from_bytes(&seed)?))
    }

    /// The hex form of the seed, suitable for [`from_hex`](Self::from_hex).
    #[must_use]
    pub fn hex(&self) -> String {
        hex::encode(self.secret.as_bytes())
    }

    /// The public id this identity registers and signs under.
    #[must_use]
    pub const fn id(&self) -> &PeerId {
        &self.id
    }

    /// Sign the canonical bytes of `message`.
    pub fn sign<S>(&self, message: &S) -> Result<Signature, Error>
    where
        S: Signable,
    {
        let data = message.signable_data().map_err(Error::canonical)?;
        let expanded = ExpandedSecretKey::from(&self.secret);
        Ok(Signature(expanded.sign(data.as_ref(), &self.id.0)))
    }
}

impl Clone for Identity {
    fn clone(&self) -> Self {
        // `SecretKey` itself refuses to be `Clone`; its bytes are valid by
        // construction.
        Self {
            id: self.id.clone(),
            secret: SecretKey::from_bytes(self.secret.as_bytes()).unwrap(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Never leak the seed into logs.
        f.debug_struct("Identity").field("id", &self.id).finish()
    }
}

/// The public identifier of a peer: its Ed25519 verifying key.
///
/// Node entries handed out by the tracker carry the `PeerId` under which a
/// node must have signed everything it claims to have issued.
#[derive(Clone, PartialEq, Eq)]
pub struct PeerId(PublicKey);

impl PeerId {
    /// Check `signature` against the canonical bytes of `message`.
    pub fn verify<S>(&self, message: &S, signature: &Signature) -> Result<(), Error>
    where
        S: Signable,
    {
        let data = message.signable_data().map_err(Error::canonical)?;
        Ok(self.0.verify(data.as_ref(), &signature.0)?)
    }

    /// Give this peer id a human-readable nickname for log output.
    ///
    /// Once set, `Debug` prints the nickname instead of the key.
    pub fn set_name(&self, name: &str) {
        NICKNAMES
            .write()
            .unwrap()
            .insert(self.clone(), name.to_string());
    }

    /// The raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

lazy_static! {
    static ref NICKNAMES: RwLock<HashMap<PeerId, String>> = RwLock::new(HashMap::new());
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(name) = NICKNAMES.read().ok().as_ref().and_then(|n| n.get(self)) {
            return f.write_str(name);
        }
        fmt::Display::fmt(self, f)
    }
}

#[allow(clippy::derive_hash_xor_eq)]
impl Hash for PeerId {
    fn hash<H>(&self, h: &mut H)
    where
        H: Hasher,
    {
        self.0.as_bytes().hash(h);
    }
}

hexerei::impl_hex!(PeerId, PUBLIC_LEN, |&id| id.0.as_bytes(), |data| {
    PublicKey::from_bytes(&data)
        .map(Self)
        .map_err(|_| hexerei::FromHexError::InvalidValue)
});
