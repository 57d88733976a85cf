//! Select-indexed pocket dictionary.
//!
//! All state lives inline; a `PackedBucket` never allocates.
//!
//! ```text
//! header (59 bits used), bit 0 first:
//!
//!     0 0 1 1 0 1 1 ... 1
//!     └┬┘ │ │ │ └──────── group 2 terminator, then groups 3..=31
//!      │  │ │ └────────── one entry in group 2
//!      │  │ └──────────── group 1 terminator (group 1 is empty)
//!      │  └────────────── group 0 terminator
//!      └───────────────── two entries in group 0
//!
//! slots:  [ r|c  r|c  r|c  ...                 ]   27 × u16, compacted
//!            │    │    └─ remainder (11 bits) | slab cell (5 bits)
//!            ▼    ▼
//! slab:   [ Occupied(v) | Free(next) | Occupied(v) | ... ]   27 cells
//!                         ▲
//!                     free_head
//! ```
//!
//! Group `q` occupies slots `[begin(q), end(q))` where
//! `end(q) = select(header, q) - q` and `begin(q) = end(q - 1)`, with
//! `begin(0) = 0`. Inserting or removing an entry shifts the header suffix
//! above the entry's bit by one position; nothing else about the header ever
//! changes.

use super::{Bucket, Eviction, GroupSizes, Insertion, InvariantViolation, CAPACITY};
use crate::bits::select;
use crate::hash::{Fingerprint, QUOTIENTS, QUOTIENT_BITS};
use crate::policy::{EvictionPolicy, RoundRobin};
use core::fmt;
use core::mem;

/// 32 terminators, no entries.
const EMPTY_HEADER: u64 = 0xFFFF_FFFF;

/// Free-list terminator.
const NIL: u8 = CAPACITY as u8;

const CELL_MASK: u16 = (1 << QUOTIENT_BITS) - 1;

#[inline]
fn pack_slot(remainder: u16, cell: u8) -> u16 {
    (remainder << QUOTIENT_BITS) | (cell as u16 & CELL_MASK)
}

#[inline]
fn slot_remainder(slot: u16) -> u16 {
    slot >> QUOTIENT_BITS
}

#[inline]
fn slot_cell(slot: u16) -> usize {
    (slot & CELL_MASK) as usize
}

enum Cell<V> {
    Free(u8),
    Occupied(V),
}

/// A 27-entry pocket dictionary with a select-indexed header.
///
/// `P` picks the victim when a full bucket admits a new entry. With
/// [`DropNew`](crate::policy::DropNew) a full bucket rejects inserts instead.
///
/// # Example
///
/// ```
/// use pocket_cache::bucket::{Bucket, Insertion, PackedBucket};
/// use pocket_cache::hash::Fingerprint;
///
/// let mut bucket: PackedBucket<u64> = PackedBucket::new();
/// let fp = Fingerprint::from_parts(3, 417);
///
/// assert_eq!(bucket.insert(fp, 0xdead), Insertion::Inserted);
/// assert_eq!(bucket.find(fp), Some(0xdead));
/// assert_eq!(bucket.group_len(3), 1);
/// assert!(bucket.remove(fp, &0xdead));
/// assert!(bucket.is_empty());
/// ```
pub struct PackedBucket<V, P = RoundRobin> {
    header: u64,
    slots: [u16; CAPACITY],
    slab: [Cell<V>; CAPACITY],
    free_head: u8,
    occupancy: u8,
    policy: P,
}

impl<V: Copy> PackedBucket<V, RoundRobin> {
    /// Creates an empty bucket with the default round-robin policy.
    pub fn new() -> Self {
        Self::with_policy(RoundRobin)
    }
}

impl<V: Copy, P: EvictionPolicy> PackedBucket<V, P> {
    /// Creates an empty bucket that evicts with `policy`.
    pub fn with_policy(policy: P) -> Self {
        PackedBucket {
            header: EMPTY_HEADER,
            slots: [0; CAPACITY],
            slab: core::array::from_fn(|i| Cell::Free(i as u8 + 1)),
            free_head: 0,
            occupancy: 0,
            policy,
        }
    }

    /// The raw header word.
    #[inline]
    pub fn header(&self) -> u64 {
        self.header
    }

    /// The eviction policy.
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of entries filed under quotient `q`.
    #[inline]
    pub fn group_len(&self, q: u8) -> usize {
        let (begin, end) = self.group_range(q);
        end - begin
    }

    #[inline]
    fn group_end(&self, q: u8) -> usize {
        (select(self.header, q as u32) - q as u32) as usize
    }

    #[inline]
    fn group_range(&self, q: u8) -> (usize, usize) {
        let begin = if q == 0 { 0 } else { self.group_end(q - 1) };
        (begin, self.group_end(q))
    }

    #[inline]
    fn payload(&self, slot: u16) -> Option<&V> {
        match self.slab.get(slot_cell(slot)) {
            Some(Cell::Occupied(payload)) => Some(payload),
            _ => None,
        }
    }

    /// Looks up `fp`, skipping candidates rejected by `confirm`.
    ///
    /// Colliding entries that fail `confirm` are passed over, not treated as
    /// a miss. A hit is rotated to the front of its group.
    pub fn find_with<F>(&mut self, fp: Fingerprint, mut confirm: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
    {
        let q = fp.quotient();
        let r = fp.remainder();
        let (begin, end) = self.group_range(q);

        for pos in begin..end {
            let slot = self.slots[pos];
            if slot_remainder(slot) != r {
                continue;
            }
            if let Some(&payload) = self.payload(slot) {
                if confirm(&payload) {
                    self.slots[begin..=pos].rotate_right(1);
                    return Some(payload);
                }
            }
        }
        None
    }

    /// Stores `payload` under `fp` at the front of its group.
    ///
    /// A full bucket first asks its policy for a victim group and evicts the
    /// back of that group; if the policy declines, nothing changes and
    /// [`Insertion::Dropped`] is returned.
    pub fn insert(&mut self, fp: Fingerprint, payload: V) -> Insertion<V> {
        let q = fp.quotient();

        let mut evicted = None;
        if self.is_full() {
            let groups = self.group_sizes();
            let Some(victim) = self.policy.victim(&groups, q) else {
                return Insertion::Dropped;
            };
            match self.evict(victim) {
                Some(eviction) => evicted = Some(eviction),
                None => return Insertion::Dropped,
            }
        }

        self.admit(q, fp.remainder(), payload);
        match evicted {
            Some(eviction) => Insertion::Replaced(eviction),
            None => Insertion::Inserted,
        }
    }

    /// Removes the entry matching both the remainder of `fp` and `payload`.
    pub fn remove(&mut self, fp: Fingerprint, payload: &V) -> bool
    where
        V: PartialEq,
    {
        let q = fp.quotient();
        let r = fp.remainder();
        let (begin, end) = self.group_range(q);

        let found = (begin..end).find(|&pos| {
            let slot = self.slots[pos];
            slot_remainder(slot) == r && self.payload(slot) == Some(payload)
        });
        match found {
            Some(pos) => self.take(q, pos).is_some(),
            None => false,
        }
    }

    /// Iterates over payloads in physical order.
    pub fn iter(&self) -> impl Iterator<Item = &V> + '_ {
        self.slots[..self.occupancy as usize]
            .iter()
            .filter_map(move |&slot| self.payload(slot))
    }

    /// Iterates over `(fingerprint, payload)` pairs in physical order.
    pub fn entries(&self) -> impl Iterator<Item = (Fingerprint, &V)> + '_ {
        (0..QUOTIENTS as u8).flat_map(move |q| {
            let (begin, end) = self.group_range(q);
            self.slots[begin..end].iter().filter_map(move |&slot| {
                self.payload(slot)
                    .map(|payload| (Fingerprint::from_parts(q, slot_remainder(slot)), payload))
            })
        })
    }

    /// Evicts the least-recent entry of group `victim`.
    fn evict(&mut self, victim: u8) -> Option<Eviction<V>> {
        if victim as usize >= QUOTIENTS {
            return None;
        }
        let (begin, end) = self.group_range(victim);
        if begin == end {
            return None;
        }
        let group_len = (end - begin) as u8;
        let (remainder, payload) = self.take(victim, end - 1)?;
        Some(Eviction {
            quotient: victim,
            remainder,
            payload,
            group_len,
        })
    }

    /// Opens a gap at the front of group `q` and fills it.
    fn admit(&mut self, q: u8, remainder: u16, payload: V) {
        debug_assert!(!self.is_full(), "admit into a full bucket");

        let bit = if q == 0 {
            0
        } else {
            select(self.header, q as u32 - 1) + 1
        };
        let mask = (1u64 << bit) - 1;
        self.header = (self.header & mask) | ((self.header & !mask) << 1);

        let pos = (bit - q as u32) as usize;
        let occupancy = self.occupancy as usize;
        self.slots.copy_within(pos..occupancy, pos + 1);

        let cell = self.alloc(payload);
        self.slots[pos] = pack_slot(remainder, cell);
        self.occupancy += 1;
    }

    /// Unlinks the slot at `pos`, which must belong to group `q`.
    fn take(&mut self, q: u8, pos: usize) -> Option<(u16, V)> {
        let slot = self.slots[pos];

        let bit = pos as u32 + q as u32;
        let mask = (1u64 << bit) - 1;
        self.header = (self.header & mask) | ((self.header >> 1) & !mask);

        let occupancy = self.occupancy as usize;
        self.slots.copy_within(pos + 1..occupancy, pos);
        self.occupancy -= 1;

        let payload = self.release(slot_cell(slot) as u8)?;
        Some((slot_remainder(slot), payload))
    }

    fn alloc(&mut self, payload: V) -> u8 {
        let cell = self.free_head;
        let prev = mem::replace(&mut self.slab[cell as usize], Cell::Occupied(payload));
        match prev {
            Cell::Free(next) => self.free_head = next,
            Cell::Occupied(_) => debug_assert!(false, "free list reached an occupied cell"),
        }
        cell
    }

    fn release(&mut self, cell: u8) -> Option<V> {
        let prev = mem::replace(&mut self.slab[cell as usize], Cell::Free(self.free_head));
        self.free_head = cell;
        match prev {
            Cell::Occupied(payload) => Some(payload),
            Cell::Free(_) => None,
        }
    }
}

impl<V: Copy, P: EvictionPolicy> Bucket<V> for PackedBucket<V, P> {
    #[inline]
    fn find_with<F>(&mut self, fp: Fingerprint, confirm: F) -> Option<V>
    where
        F: FnMut(&V) -> bool,
    {
        PackedBucket::find_with(self, fp, confirm)
    }

    #[inline]
    fn insert(&mut self, fp: Fingerprint, payload: V) -> Insertion<V> {
        PackedBucket::insert(self, fp, payload)
    }

    #[inline]
    fn remove(&mut self, fp: Fingerprint, payload: &V) -> bool
    where
        V: PartialEq,
    {
        PackedBucket::remove(self, fp, payload)
    }

    #[inline]
    fn len(&self) -> usize {
        self.occupancy as usize
    }

    fn group_sizes(&self) -> GroupSizes {
        let mut sizes = [0u8; QUOTIENTS];
        let mut begin = 0;
        for (q, size) in sizes.iter_mut().enumerate() {
            let end = self.group_end(q as u8);
            *size = (end - begin) as u8;
            begin = end;
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
        let occupancy = self.occupancy as usize;
        if occupancy > CAPACITY {
            return Err(InvariantViolation::Overfull { occupancy });
        }

        let ones = self.header.count_ones();
        if ones != QUOTIENTS as u32 {
            return Err(InvariantViolation::HeaderTerminators { ones });
        }
        let last = select(self.header, QUOTIENTS as u32 - 1);
        if last as usize != QUOTIENTS - 1 + occupancy {
            return Err(InvariantViolation::HeaderLength { last, occupancy });
        }

        let mut referenced = [false; CAPACITY];
        for &slot in &self.slots[..occupancy] {
            let cell = slot_cell(slot);
            let valid = matches!(self.slab.get(cell), Some(Cell::Occupied(_)));
            if !valid || referenced[cell] {
                return Err(InvariantViolation::SlabReference { cell: cell as u8 });
            }
            referenced[cell] = true;
        }

        let expected = CAPACITY - occupancy;
        let mut visited = [false; CAPACITY];
        let mut length = 0;
        let mut cell = self.free_head;
        while cell != NIL {
            let next = match self.slab.get(cell as usize) {
                Some(Cell::Free(next)) if !visited[cell as usize] => *next,
                _ => return Err(InvariantViolation::FreeList { length, expected }),
            };
            visited[cell as usize] = true;
            length += 1;
            cell = next;
        }
        if length != expected {
            return Err(InvariantViolation::FreeList { length, expected });
        }
        Ok(())
    }
}

impl<V: Copy, P: EvictionPolicy + Default> Default for PackedBucket<V, P> {
    fn default() -> Self {
        Self::with_policy(P::default())
    }
}

impl<V: Copy, P: EvictionPolicy + fmt::Debug> fmt::Debug for PackedBucket<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedBucket")
            .field("len", &self.occupancy)
            .field("header", &format_args!("{:#x}", self.header))
            .field("free_head", &self.free_head)
            .field("policy", &self.policy)
            .finish()
    }
}
