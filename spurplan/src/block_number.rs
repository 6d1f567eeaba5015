use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// Number of a block in a node's chain.
///
/// Numbers are dense: the block at position `i` has number `i`, with the
/// shared genesis block at `0`.
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlockNumber(u32);

impl BlockNumber {
    /// Create a block number from its raw value.
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Return the stored integer as a big-endian byte array.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// The position of this block in its chain.
    #[must_use]
    pub fn position(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add<u32> for BlockNumber {
    type Output = Self;
    fn add(self, other: u32) -> Self {
        Self(self.0 + other)
    }
}

impl AddAssign<u32> for BlockNumber {
    fn add_assign(&mut self, other: u32) {
        self.0 += other;
    }
}

impl Sub<u32> for BlockNumber {
    type Output = Self;
    fn sub(self, other: u32) -> Self {
        Self(self.0 - other)
    }
}

impl SubAssign<u32> for BlockNumber {
    fn sub_assign(&mut self, other: u32) {
        self.0 -= other;
    }
}

impl From<u32> for BlockNumber {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<BlockNumber> for u32 {
    fn from(v: BlockNumber) -> Self {
        v.0
    }
}
