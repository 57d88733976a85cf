//! Victim selection for full buckets.
//!
//! A bucket consults its [`EvictionPolicy`] only when it is full and must
//! admit a new fingerprint. The policy sees the current size of each of the
//! 32 quotient groups plus the quotient of the incoming item, and names the
//! group whose least-recent entry (the back of the group) is discarded.
//!
//! None of the policies track global recency inside a bucket; they are
//! O(32) heuristics that approximate LRU.
//!
//! | Policy | Victim group |
//! |--------|--------------|
//! | [`LargestGroup`] | the largest group, lowest quotient on ties |
//! | [`RoundRobin`] | first non-empty group after the incoming quotient, wrapping; the incoming group itself last |
//! | [`LargestThenRoundRobin`] | round-robin restricted to groups of maximal size |
//! | [`DropNew`] | none: the incoming item is dropped |

use crate::hash::QUOTIENTS;
use core::fmt;

/// Per-quotient entry counts of a bucket.
pub type GroupSizes = [u8; QUOTIENTS];

/// Strategy that picks which group of a full bucket gives up an entry.
pub trait EvictionPolicy {
    /// Returns the quotient whose least-recent entry should be evicted, or
    /// `None` if the incoming item should be dropped instead.
    ///
    /// Only called when the bucket is full, so at least one group is
    /// non-empty. Implementations must return a non-empty group.
    fn victim(&mut self, groups: &GroupSizes, incoming: u8) -> Option<u8>;
}

impl<P: EvictionPolicy + ?Sized> EvictionPolicy for &mut P {
    #[inline]
    fn victim(&mut self, groups: &GroupSizes, incoming: u8) -> Option<u8> {
        (**self).victim(groups, incoming)
    }
}

/// Evicts from the largest group, assuming size skew tracks staleness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LargestGroup;

impl EvictionPolicy for LargestGroup {
    fn victim(&mut self, groups: &GroupSizes, _incoming: u8) -> Option<u8> {
        let mut best = 0usize;
        for q in 1..QUOTIENTS {
            if groups[q] > groups[best] {
                best = q;
            }
        }
        Some(best as u8)
    }
}

/// Evicts from the first non-empty group following the incoming quotient,
/// spreading eviction pressure away from the hot group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundRobin;

impl EvictionPolicy for RoundRobin {
    fn victim(&mut self, groups: &GroupSizes, incoming: u8) -> Option<u8> {
        Some(scan_after(incoming, |q| groups[q] != 0))
    }
}

/// Round-robin over the groups currently holding the most entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LargestThenRoundRobin;

impl EvictionPolicy for LargestThenRoundRobin {
    fn victim(&mut self, groups: &GroupSizes, incoming: u8) -> Option<u8> {
        let max = groups.iter().copied().max().unwrap_or(0);
        Some(scan_after(incoming, |q| groups[q] == max))
    }
}

/// Never evicts; a full bucket silently drops new items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DropNew;

impl EvictionPolicy for DropNew {
    #[inline]
    fn victim(&mut self, _groups: &GroupSizes, _incoming: u8) -> Option<u8> {
        None
    }
}

/// Scans `incoming + 1, incoming + 2, ...` circularly and returns the first
/// quotient accepted by `pick`, falling back to `incoming`.
#[inline]
fn scan_after(incoming: u8, mut pick: impl FnMut(usize) -> bool) -> u8 {
    let start = incoming as usize % QUOTIENTS;
    let mut q = (start + 1) % QUOTIENTS;
    while q != start {
        if pick(q) {
            return q as u8;
        }
        q = (q + 1) % QUOTIENTS;
    }
    start as u8
}

/// Runtime-selectable policy, for callers that choose the heuristic from
/// configuration rather than at compile time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Policy {
    /// See [`LargestGroup`].
    LargestGroup,
    /// See [`RoundRobin`].
    #[default]
    RoundRobin,
    /// See [`LargestThenRoundRobin`].
    LargestThenRoundRobin,
    /// See [`DropNew`].
    DropNew,
}

impl Policy {
    /// Short identifier used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::LargestGroup => "largest",
            Policy::RoundRobin => "round-robin",
            Policy::LargestThenRoundRobin => "largest-rr",
            Policy::DropNew => "drop-new",
        }
    }

    /// All policies, in a stable order.
    pub fn all() -> [Policy; 4] {
        [
            Policy::LargestGroup,
            Policy::RoundRobin,
            Policy::LargestThenRoundRobin,
            Policy::DropNew,
        ]
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EvictionPolicy for Policy {
    fn victim(&mut self, groups: &GroupSizes, incoming: u8) -> Option<u8> {
        match self {
            Policy::LargestGroup => LargestGroup.victim(groups, incoming),
            Policy::RoundRobin => RoundRobin.victim(groups, incoming),
            Policy::LargestThenRoundRobin => LargestThenRoundRobin.victim(groups, incoming),
            Policy::DropNew => DropNew.victim(groups, incoming),
        }
    }
}
