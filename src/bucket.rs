//! Pocket dictionaries: the fixed-capacity buckets a sharded cache is made of.
//!
//! A bucket holds at most [`CAPACITY`] entries. Each entry is a fingerprint
//! remainder plus an opaque payload, filed under one of 32 quotient groups.
//! Inside a group, entries are ordered by recency: the front is the most
//! recently matched or inserted entry, the back is the next eviction victim.
//!
//! ```text
//!   group:     0        1     2        ...        31
//!           ┌───────┬───────┬───┬─────────────┬────────┐
//!   slots:  │ a  b  │ c     │   │     ...     │ x  y   │   ≤ 27 entries
//!           └───────┴───────┴───┴─────────────┴────────┘
//!            front ▲    back ▲
//! ```
//!
//! Two layouts implement the same [`Bucket`] contract:
//!
//! | Layout | Storage | Notes |
//! |--------|---------|-------|
//! | [`PackedBucket`] | 59-bit header + 27 packed slots + payload slab | allocation-free, O(1) group lookup via `select` |
//! | [`DequeBucket`] | one `VecDeque` per quotient | simpler, heavier, used as a reference layout |
//!
//! Neither layout can tell two keys with the same fingerprint apart. Callers
//! that need exact answers pass a confirmation predicate to
//! [`Bucket::find_with`], which is run against each candidate payload.

mod deque;
mod packed;

pub use self::deque::DequeBucket;
pub use self::packed::PackedBucket;

use crate::hash::Fingerprint;
pub use crate::policy::GroupSizes;
use core::fmt;

/// Number of entries a bucket can hold.
pub const CAPACITY: usize = 27;

/// Common interface of both bucket layouts.
///
/// Payloads are small `Copy` handles (addresses, ids); lookups return a copy.
pub trait Bucket<V: Copy> {
    /// Looks up `fp`, accepting only candidates for which `confirm` returns
    /// `true`. A hit moves the entry to the front of its group.
    fn find_with<F>(&mut self, fp: Fingerprint, confirm: F) -> Option<V>
    where
        F: FnMut(&V) -> bool;

    /// Looks up `fp`, trusting the first remainder match.
    #[inline]
    fn find(&mut self, fp: Fingerprint) -> Option<V> {
        self.find_with(fp, |_| true)
    }

    /// Admits a new entry at the front of its group, evicting first if the
    /// bucket is full.
    fn insert(&mut self, fp: Fingerprint, payload: V) -> Insertion<V>;

    /// Removes the entry whose remainder and payload both match.
    ///
    /// Returns `false` and leaves the bucket untouched if there is none.
    fn remove(&mut self, fp: Fingerprint, payload: &V) -> bool
    where
        V: PartialEq;

    /// Number of stored entries.
    fn len(&self) -> usize;

    /// Returns `true` if the bucket holds no entries.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the next insert must evict.
    #[inline]
    fn is_full(&self) -> bool {
        self.len() >= CAPACITY
    }

    /// Current size of each quotient group.
    fn group_sizes(&self) -> GroupSizes;

    /// Visits every payload in physical order: groups ascending, each group
    /// front to back.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&V);

    /// Verifies the layout's internal bookkeeping.
    fn check_invariants(&self) -> Result<(), InvariantViolation>;
}

/// An entry discarded to make room for an insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eviction<V> {
    /// Group the victim was taken from.
    pub quotient: u8,
    /// Remainder of the victim.
    pub remainder: u16,
    /// Payload of the victim.
    pub payload: V,
    /// Size of the victim's group just before the eviction.
    pub group_len: u8,
}

impl<V> Eviction<V> {
    /// Reassembles the victim's fingerprint.
    #[inline]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(self.quotient, self.remainder)
    }
}

/// Outcome of [`Bucket::insert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Insertion<V> {
    /// Stored in a free slot.
    Inserted,
    /// Stored after evicting another entry.
    Replaced(Eviction<V>),
    /// Not stored: the bucket was full and its policy declined to evict.
    Dropped,
}

impl<V> Insertion<V> {
    /// Returns `true` unless the entry was dropped.
    #[inline]
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Insertion::Dropped)
    }

    /// The eviction that made room, if any.
    #[inline]
    pub fn eviction(&self) -> Option<&Eviction<V>> {
        match self {
            Insertion::Replaced(eviction) => Some(eviction),
            _ => None,
        }
    }
}

/// A broken internal invariant, reported by [`Bucket::check_invariants`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More than [`CAPACITY`] entries are recorded.
    Overfull {
        /// Recorded occupancy.
        occupancy: usize,
    },
    /// Group sizes do not add up to the recorded occupancy.
    GroupSum {
        /// Sum of the group sizes.
        sum: usize,
        /// Recorded occupancy.
        occupancy: usize,
    },
    /// The header does not carry exactly one terminator per group.
    HeaderTerminators {
        /// Number of set bits found.
        ones: u32,
    },
    /// The last group terminator is not where the occupancy puts it.
    HeaderLength {
        /// Position of the last terminator.
        last: u32,
        /// Recorded occupancy.
        occupancy: usize,
    },
    /// A slot points at a slab cell that is free, out of range, or shared
    /// with another slot.
    SlabReference {
        /// Offending cell index.
        cell: u8,
    },
    /// The free list is cyclic, has the wrong length, or runs through an
    /// occupied cell.
    FreeList {
        /// Cells walked before the chain broke or ended.
        length: usize,
        /// Expected chain length.
        expected: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvariantViolation::Overfull { occupancy } => {
                write!(f, "occupancy {} exceeds capacity {}", occupancy, CAPACITY)
            }
            InvariantViolation::GroupSum { sum, occupancy } => {
                write!(f, "group sizes sum to {} but occupancy is {}", sum, occupancy)
            }
            InvariantViolation::HeaderTerminators { ones } => {
                write!(f, "header has {} terminators, expected 32", ones)
            }
            InvariantViolation::HeaderLength { last, occupancy } => write!(
                f,
                "last header terminator at bit {} does not match occupancy {}",
                last, occupancy
            ),
            InvariantViolation::SlabReference { cell } => {
                write!(f, "slot references invalid slab cell {}", cell)
            }
            InvariantViolation::FreeList { length, expected } => write!(
                f,
                "free list walked {} cells, expected {}",
                length, expected
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for InvariantViolation {}
