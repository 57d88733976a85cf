//! Deque-per-quotient pocket dictionary.
//!
//! Each quotient group is its own `VecDeque<(remainder, payload)>`, front =
//! most recent. This trades the packed layout's header arithmetic for plain
//! queue operations and a heap allocation per non-empty group.

extern crate alloc;

use super::{Bucket, Eviction, GroupSizes, Insertion, InvariantViolation, CAPACITY};
use crate::hash::{Fingerprint, QUOTIENTS};
use crate::policy::{EvictionPolicy, RoundRobin};
use alloc::collections::VecDeque;
use core::fmt;

/// A 27-entry pocket dictionary backed by 32 deques.
///
/// # Example
///
/// ```
/// use pocket_cache::bucket::{Bucket, DequeBucket};
/// use pocket_cache::hash::Fingerprint;
///
/// let mut bucket: DequeBucket<u32> = DequeBucket::new();
/// bucket.insert(Fingerprint::from_parts(0, 1), 10);
/// bucket.insert(Fingerprint::from_parts(0, 2), 20);
///
/// assert_eq!(bucket.find(Fingerprint::from_parts(0, 1)), Some(10));
/// assert_eq!(bucket.len(), 2);
/// ```
pub struct DequeBucket<V, P = RoundRobin> {
    groups: [VecDeque<(u16, V)>; QUOTIENTS],
    occupancy: usize,
    policy: P,
}

impl<V: Copy> DequeBucket<V, RoundRobin> {
    /// Creates an empty bucket with the default round-robin policy.
    pub fn new() -> Self {
        Self::with_policy(RoundRobin)
    }
}

impl<V: Copy, P: EvictionPolicy> DequeBucket<V, P> {
    /// Creates an empty bucket that evicts with `policy`.
    pub fn with_policy(policy: P) -> Self {
        DequeBucket {
            groups: core::array::from_fn(|_| VecDeque::new()),
            occupancy: 0,
            policy,
        }
    }

    /// The eviction policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of entries filed under quotient `q`.
    pub fn group_len(&self, q: u8) -> usize {
        self.groups.get(q as usize).map_or(0, VecDeque::len)
    }

    /// Iterates over `(fingerprint, payload)` pairs in physical order.
    pub fn entries(&self) -> impl Iterator<Item = (Fingerprint, &V)> + '_ {
        self.groups.iter().enumerate().flat_map(|(q, group)| {
            group
                .iter()
                .map(move |(r, payload)| (Fingerprint::from_parts(q as u8, *r), payload))
        })
    }

    /// Iterates over payloads in physical order.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.iter().map(|(_, payload)| payload))
    }

    fn evict(&mut self, victim: u8) -> Option<Eviction<V>> {
        let group = self.groups.get_mut(victim as usize)?;
        let group_len = group.len() as u8;
        let (remainder, payload) = group.pop_back()?;
        self.occupancy -= 1;
        Some(Eviction {
            quotient: victim,
            remainder,
            payload,
            group_len,
        })
    }
}

impl<V: Copy, P: EvictionPolicy> Bucket<V> for DequeBucket<V, P> {
    fn find_with<F>(&mut self, fp: Fingerprint, mut confirm: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
    {
        let r = fp.remainder();
        let group = &mut self.groups[fp.quotient() as usize];
        let pos = group
            .iter()
            .position(|(remainder, payload)| *remainder == r && confirm(payload))?;
        let entry = group.remove(pos)?;
        group.push_front(entry);
        Some(entry.1)
    }

    fn insert(&mut self, fp: Fingerprint, payload: V) -> Insertion<V> {
        let q = fp.quotient();

        let mut evicted = None;
        while self.occupancy >= CAPACITY {
            let groups = self.group_sizes();
            let Some(victim) = self.policy.victim(&groups, q) else {
                return Insertion::Dropped;
            };
            match self.evict(victim) {
                Some(eviction) => evicted = Some(eviction),
                None => return Insertion::Dropped,
            }
        }

        self.groups[q as usize].push_front((fp.remainder(), payload));
        self.occupancy += 1;
        match evicted {
            Some(eviction) => Insertion::Replaced(eviction),
            None => Insertion::Inserted,
        }
    }

    fn remove(&mut self, fp: Fingerprint, payload: &V) -> bool
    where
        V: PartialEq,
    {
        let r = fp.remainder();
        let group = &mut self.groups[fp.quotient() as usize];
        let Some(pos) = group
            .iter()
            .position(|(remainder, stored)| *remainder == r && stored == payload)
        else {
            return false;
        };
        group.remove(pos);
        self.occupancy -= 1;
        true
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupancy
    }

    fn group_sizes(&self) -> GroupSizes {
        let mut sizes = [0u8; QUOTIENTS];
        for (size, group) in sizes.iter_mut().zip(&self.groups) {
            *size = group.len() as u8;
        }
        sizes
    }

    fn for_each<F>(&self, f: F)
    where
        F: FnMut(&V),
    {
        self.iter().for_each(f)
    }

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let occupancy = self.occupancy;
        if occupancy > CAPACITY {
            return Err(InvariantViolation::Overfull { occupancy });
        }
        let sum: usize = self.groups.iter().map(VecDeque::len).sum();
        if sum != occupancy {
            return Err(InvariantViolation::GroupSum { sum, occupancy });
        }
        Ok(())
    }
}

impl<V: Copy, P: EvictionPolicy + Default> Default for DequeBucket<V, P> {
    fn default() -> Self {
        Self::with_policy(P::default())
    }
}

impl<V: Copy, P: EvictionPolicy + fmt::Debug> fmt::Debug for DequeBucket<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DequeBucket")
            .field("len", &self.occupancy)
            .field("group_sizes", &self.group_sizes())
            .field("policy", &self.policy)
            .finish()
    }
}
