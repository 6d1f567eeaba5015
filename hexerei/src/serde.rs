use serde::{
    de::{Error, SeqAccess, Visitor},
    ser::SerializeTupleStruct,
    Deserializer, Serializer,
};
use std::fmt;

/// Serialize and deserialize a `[u8; N]` wrapper as a named tuple struct of
/// bytes. Compact formats like `postcard` encode this without any length
/// prefix, which keeps hashes and keys at their exact width on the wire.
#[derive(Copy, Clone)]
pub struct ByteArrayHelper(pub &'static str, pub usize);

impl ByteArrayHelper {
    /// Serialize `data` (must be exactly as long as declared).
    pub fn serialize<S>(self, serializer: S, data: &[u8]) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple_struct(self.0, self.1)?;
        for byte in data {
            tuple.serialize_field(byte)?;
        }
        tuple.end()
    }

    /// Deserialize into `data` (must be exactly as long as declared).
    pub fn deserialize<'de, D>(self, deserializer: D, data: &mut [u8]) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple_struct(self.0, self.1, FillBytes(data))
    }
}

struct FillBytes<'a>(&'a mut [u8]);

impl<'de, 'a> Visitor<'de> for FillBytes<'a> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{} raw bytes", self.0.len())
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut filled = 0;
        while filled < self.0.len() {
            match seq.next_element()? {
                Some(byte) => self.0[filled] = byte,
                None => return Err(Error::invalid_length(filled, &self)),
            }
            filled += 1;
        }
        Ok(())
    }
}
