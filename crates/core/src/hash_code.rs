//! Hash codes of unbounded magnitude
//!
//! A user capability may return any integer as its hash, including values far
//! outside the machine word (`1 << 100`). `HashCode` carries the full value
//! and [`HashCode::fold`] reduces it to the 64-bit hash the table indexes by.
//!
//! ## Folding
//!
//! - The magnitude is split into 64-bit limbs and XOR-folded
//! - Negative values are mixed with a fixed constant so `n` and `-n` differ
//! - Folding is total: it never fails on magnitude
//!
//! Distinct codes may fold to the same 64-bit hash. That is an ordinary
//! collision and is resolved by key equality.

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use std::fmt;

/// Mixed into the fold of negative hash codes
const NEGATIVE_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// Hash code returned by a [`Storable`](crate::Storable) capability
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashCode(BigInt);

impl HashCode {
    /// Wrap an arbitrary-precision integer
    pub fn new(value: BigInt) -> Self {
        HashCode(value)
    }

    /// Hash code of `1 << bits`
    pub fn pow2(bits: usize) -> Self {
        HashCode(BigInt::from(1u8) << bits)
    }

    /// The underlying integer
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// The code as an `i64`, if it fits a machine word
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Reduce to the 64-bit hash used for bucket placement
    pub fn fold(&self) -> u64 {
        let (sign, limbs) = self.0.to_u64_digits();
        let folded = limbs.iter().fold(0u64, |acc, limb| acc ^ limb);
        match sign {
            Sign::Minus => folded.rotate_left(1) ^ NEGATIVE_MIX,
            Sign::NoSign | Sign::Plus => folded,
        }
    }
}

impl From<i64> for HashCode {
    fn from(v: i64) -> Self {
        HashCode(BigInt::from(v))
    }
}

impl From<u64> for HashCode {
    fn from(v: u64) -> Self {
        HashCode(BigInt::from(v))
    }
}

impl From<i32> for HashCode {
    fn from(v: i32) -> Self {
        HashCode(BigInt::from(v))
    }
}

impl From<BigInt> for HashCode {
    fn from(v: BigInt) -> Self {
        HashCode(v)
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
