#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::similar_names)]

//! Helpers for types that wrap a fixed number of bytes (hashes, keys,
//! signatures): compact serde representations and hexadecimal formatting.

mod serde;

pub use crate::serde::ByteArrayHelper;

use err_derive::Error;

/// An error while parsing a hexadecimal representation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FromHexError {
    /// The hexadecimal string could not be decoded.
    #[error(display = "{}", 0)]
    Hex(#[error(from)] hex::FromHexError),

    /// The decoded bytes do not form a valid value.
    #[error(display = "invalid value")]
    InvalidValue,
}

/// Write a byte array as lowercase hex into a `fmt::Formatter` without
/// allocating.
#[macro_export]
macro_rules! write_hex {
    ($f:ident, $data:expr, $len:expr) => {{
        let data: &[u8; $len] = $data;
        let data: &[u8] = data;
        let out = &mut [0; $len * 2];
        $crate::private::encode_to_slice(data, out).unwrap();
        $f.write_str(::std::str::from_utf8(out).unwrap())
    }};
}

/// Implement the hexadecimal surface of a fixed-width byte wrapper:
/// `from_hex` / `hex` inherent methods, `Display`, `FromStr` and compact
/// serde implementations.
///
/// The first closure extracts the raw bytes from a value, the second
/// rebuilds the type from a decoded `[u8; LEN]` (it may reject invalid
/// values with [`FromHexError::InvalidValue`]).
///
/// # Example
/// ```
/// pub struct Digest([u8; 4]);
///
/// hexerei::impl_hex!(Digest, 4, |&digest| &digest.0, |data| Ok(Self(data)));
///
/// let digest: Digest = "2480cafe".parse().unwrap();
/// assert_eq!(digest.hex(), "2480cafe");
/// assert_eq!(digest.to_string(), "2480cafe");
/// ```
#[macro_export]
macro_rules! impl_hex {
    ($type:ty, $len:expr, |&$this:ident| $data:expr, |$bytes:ident| $from:expr) => {
        impl $type {
            /// Create a value from it's hexadecimal representation.
            pub fn from_hex(hex: &str) -> Result<Self, $crate::FromHexError> {
                let $bytes: [u8; $len] = $crate::private::FromHex::from_hex(hex)?;
                $from
            }

            /// Create a hexadecimal representation.
            #[must_use]
            pub fn hex(&self) -> String {
                let $this = self;
                let data: &[u8; $len] = $data;
                $crate::private::encode(&data[..])
            }
        }

        impl ::std::fmt::Display for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                let $this = self;
                $crate::write_hex!(f, $data, $len)
            }
        }

        impl ::std::str::FromStr for $type {
            type Err = $crate::FromHexError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        const _: () = {
            use $crate::private::{DeError, Deserializer, Serializer};

            const HELPER: $crate::ByteArrayHelper =
                $crate::ByteArrayHelper(stringify!($type), $len);

            impl $crate::private::Serialize for $type {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: Serializer,
                {
                    let $this = self;
                    let data: &[u8; $len] = $data;
                    HELPER.serialize(serializer, data)
                }
            }

            impl<'de> $crate::private::Deserialize<'de> for $type {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    let mut buf = [0; $len];
                    HELPER.deserialize(deserializer, &mut buf)?;
                    let $bytes = buf;
                    let result: Result<Self, $crate::FromHexError> = $from;
                    result.map_err(|_| DeError::custom("invalid value"))
                }
            }
        };
    };
}

#[doc(hidden)]
pub mod private {
    pub use hex::{encode, encode_to_slice, FromHex};
    pub use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
}
