//! Key hashing and fingerprint splitting.
//!
//! Every key is hashed once with a fixed 64-bit multiplicative-shift hash.
//! The hash is then split in two: `hash % buckets` picks the owning bucket and
//! `hash / buckets`, truncated to 16 bits, becomes the key's [`Fingerprint`].
//!
//! ```text
//!  key ──▶ MulShift ──▶ hash ──┬──▶ hash % E        = bucket index
//!                              └──▶ (hash / E) as u16 = fingerprint
//!
//!  fingerprint (16 bits):   [ remainder : 11 ][ quotient : 5 ]
//!                              tag within       group 0..32
//!                              the group
//! ```

use core::fmt;
use core::num::NonZeroUsize;

/// Number of bits of a fingerprint used as the quotient.
pub const QUOTIENT_BITS: u32 = 5;

/// Number of bits of a fingerprint used as the remainder.
pub const REMAINDER_BITS: u32 = 11;

/// Number of quotient groups in a bucket.
pub const QUOTIENTS: usize = 1 << QUOTIENT_BITS;

const QUOTIENT_MASK: u16 = (1 << QUOTIENT_BITS) - 1;

/// A 16-bit, hash-derived proxy for a key.
///
/// Fingerprints are not unique: distinct keys may share one, and a bucket
/// cannot tell such keys apart without an external confirmation check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u16);

impl Fingerprint {
    /// Wraps a raw 16-bit fingerprint.
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Fingerprint(raw)
    }

    /// Builds a fingerprint from a quotient (`0..32`) and a remainder
    /// (`0..2048`). Out-of-range bits are discarded.
    #[inline]
    pub const fn from_parts(quotient: u8, remainder: u16) -> Self {
        Fingerprint((remainder << QUOTIENT_BITS) | (quotient as u16 & QUOTIENT_MASK))
    }

    /// The raw 16-bit value.
    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// The group this fingerprint belongs to, in `0..32`.
    #[inline]
    pub const fn quotient(self) -> u8 {
        (self.0 & QUOTIENT_MASK) as u8
    }

    /// The 11-bit tag that disambiguates entries within a group.
    #[inline]
    pub const fn remainder(self) -> u16 {
        self.0 >> QUOTIENT_BITS
    }
}

impl From<u16> for Fingerprint {
    fn from(raw: u16) -> Self {
        Fingerprint(raw)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}:r{}", self.quotient(), self.remainder())
    }
}

/// Fixed multiplicative-shift hash: the high 64 bits of the 128-bit product
/// of the key with an odd 128-bit constant.
#[derive(Clone, Copy, Debug, Default)]
pub struct MulShift;

impl MulShift {
    const HI: u64 = 0x5150_2a83_3430_4aae;
    const LO: u64 = 0x9743_df29_cdf1_096f;
    const MULTIPLIER: u128 = ((Self::HI as u128) << 64) | Self::LO as u128;

    /// Hashes a key.
    #[inline]
    pub const fn hash(key: u64) -> u64 {
        ((key as u128).wrapping_mul(Self::MULTIPLIER) >> 64) as u64
    }
}

/// Maps keys to `(bucket index, fingerprint)` pairs for a fixed bucket count.
#[derive(Clone, Copy)]
pub struct HashSplitter {
    buckets: u64,
}

impl HashSplitter {
    /// Creates a splitter for `buckets` buckets.
    pub fn new(buckets: NonZeroUsize) -> Self {
        HashSplitter {
            buckets: buckets.get() as u64,
        }
    }

    /// Number of buckets keys are spread over.
    #[inline]
    pub fn buckets(&self) -> usize {
        self.buckets as usize
    }

    /// Splits a key into its owning bucket and fingerprint.
    #[inline]
    pub fn split(&self, key: u64) -> (usize, Fingerprint) {
        self.split_hash(MulShift::hash(key))
    }

    /// Splits an already-hashed value.
    #[inline]
    pub fn split_hash(&self, hash: u64) -> (usize, Fingerprint) {
        let bucket = (hash % self.buckets) as usize;
        let fingerprint = Fingerprint::new((hash / self.buckets) as u16);
        (bucket, fingerprint)
    }
}

impl fmt::Debug for HashSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashSplitter")
            .field("buckets", &self.buckets)
            .finish()
    }
}
