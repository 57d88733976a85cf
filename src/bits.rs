//! Broadword bit primitives used by the packed bucket header.
//!
//! The header of a [`PackedBucket`](crate::bucket::PackedBucket) is a unary
//! encoding of cumulative group sizes, so every group boundary lookup is a
//! single `select` on a 64-bit word. On x86-64 builds with BMI2 enabled the
//! primitives compile down to `PDEP` + `TZCNT`; every other target uses the
//! portable versions below, which return identical results.

/// Returns the position of the `k`-th set bit (0-based) of `word`.
///
/// Returns 64 when `word` has `k` or fewer set bits.
///
/// # Example
///
/// ```
/// use pocket_cache::bits::select;
///
/// assert_eq!(select(0b1011_0000, 0), 4);
/// assert_eq!(select(0b1011_0000, 2), 7);
/// assert_eq!(select(0b1011_0000, 3), 64);
/// ```
#[inline]
pub fn select(word: u64, k: u32) -> u32 {
    #[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
    {
        bit_index(word, k).trailing_zeros()
    }
    #[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
    {
        select_portable(word, k)
    }
}

/// Isolates the `k`-th set bit of `word`, or returns 0 if there is none.
#[inline]
pub fn bit_index(word: u64, k: u32) -> u64 {
    if k >= 64 {
        return 0;
    }
    deposit(1u64 << k, word)
}

/// Parallel bit deposit: scatters the low bits of `src` to the set positions
/// of `mask`, lowest first.
#[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
#[inline]
pub fn deposit(src: u64, mask: u64) -> u64 {
    // SAFETY: this path is only compiled when BMI2 is statically enabled.
    unsafe { core::arch::x86_64::_pdep_u64(src, mask) }
}

/// Parallel bit deposit: scatters the low bits of `src` to the set positions
/// of `mask`, lowest first.
#[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
#[inline]
pub fn deposit(src: u64, mask: u64) -> u64 {
    deposit_portable(src, mask)
}

#[cfg_attr(
    all(target_arch = "x86_64", target_feature = "bmi2"),
    allow(dead_code)
)]
#[inline]
pub(crate) fn deposit_portable(src: u64, mut mask: u64) -> u64 {
    let mut out = 0u64;
    let mut bit = 1u64;
    while mask != 0 {
        let lowest = mask & mask.wrapping_neg();
        if src & bit != 0 {
            out |= lowest;
        }
        mask &= mask - 1;
        bit <<= 1;
    }
    out
}

/// Byte-skipping select that does not go through `deposit`.
///
/// This is what [`select`] compiles to without BMI2; it is public so the two
/// can be compared on targets that have it.
#[inline]
pub fn select_portable(mut word: u64, mut k: u32) -> u32 {
    let mut base = 0u32;
    while base < 64 {
        let ones = (word & 0xff).count_ones();
        if k < ones {
            for _ in 0..k {
                word &= word - 1;
            }
            return base + word.trailing_zeros();
        }
        k -= ones;
        word >>= 8;
        base += 8;
    }
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_select(word: u64, k: u32) -> u32 {
        let mut seen = 0;
        for pos in 0..64 {
            if word & (1u64 << pos) != 0 {
                if seen == k {
                    return pos;
                }
                seen += 1;
            }
        }
        64
    }

    const WORDS: [u64; 8] = [
        0,
        1,
        u64::MAX,
        0xffff_ffff,
        0x8000_0000_0000_0001,
        0x0123_4567_89ab_cdef,
        0x5555_5555_5555_5555,
        0x07ff_ffe0_0000_0000,
    ];

    #[test]
    fn test_select_matches_naive() {
        for &word in &WORDS {
            for k in 0..66 {
                assert_eq!(select(word, k), naive_select(word, k), "word={word:#x} k={k}");
                assert_eq!(
                    select_portable(word, k.min(64)),
                    naive_select(word, k),
                    "word={word:#x} k={k}"
                );
            }
        }
    }

    #[test]
    fn test_deposit_scatters_low_bits() {
        assert_eq!(deposit(0b101, 0b1111_0000), 0b0101_0000);
        assert_eq!(deposit(u64::MAX, 0xf0f0), 0xf0f0);
        assert_eq!(deposit(0, u64::MAX), 0);
        assert_eq!(deposit_portable(0b11, 0x8000_0000_0000_0001), 0x8000_0000_0000_0001);
    }

    #[test]
    fn test_bit_index_isolates_kth_bit() {
        assert_eq!(bit_index(0b1010_1000, 1), 0b0010_0000);
        assert_eq!(bit_index(0b1010_1000, 3), 0);
    }
}
