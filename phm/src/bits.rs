//! Hash-chunk arithmetic shared by every trie level.
//!
//! The trie consumes the 32-bit key hash four bits at a time, starting from
//! the low end. At shift `s` the node looks at `(h >> s) & 0xF` and uses a
//! one-hot `u32` bitmap to record which of the 16 possible slots are in use.

pub(crate) type HashBits = u32;

/// Bits of hash consumed per trie level.
pub(crate) const TRIE_SHIFT: u32 = 4;
/// Width of the hash; no node lives deeper than this shift.
pub(crate) const TRIE_MAX_SHIFT: u32 = 32;
/// Possible children of a bitmap node.
pub(crate) const TRIE_MAX_NODES: u32 = 1 << TRIE_SHIFT;
pub(crate) const TRIE_MASK: u32 = TRIE_MAX_NODES - 1;

/// The 4-bit chunk of `hash` at `shift`.
#[inline(always)]
pub(crate) fn local_index(hash: HashBits, shift: u32) -> u32 {
    debug_assert!(shift < TRIE_MAX_SHIFT, "shift {shift} out of range");
    (hash >> shift) & TRIE_MASK
}

/// The bitmap bit standing for the chunk of `hash` at `shift`.
#[inline(always)]
pub(crate) fn bit_for(hash: HashBits, shift: u32) -> u32 {
    1 << local_index(hash, shift)
}

/// Number of set bits in `bitmap`.
#[cfg(any(
    target_feature = "popcnt",
    target_arch = "aarch64",
    target_arch = "wasm32"
))]
#[inline(always)]
pub(crate) fn pop_count(bitmap: u32) -> u32 {
    bitmap.count_ones()
}

/// Number of set bits in `bitmap`.
#[cfg(not(any(
    target_feature = "popcnt",
    target_arch = "aarch64",
    target_arch = "wasm32"
)))]
#[inline(always)]
pub(crate) fn pop_count(bitmap: u32) -> u32 {
    pop_count_swar(bitmap)
}

/// Branch-free parallel bit count, for targets without a popcount
/// instruction. See "Counting bits set, in parallel" in Sean Anderson's
/// bit twiddling hacks.
#[inline(always)]
#[allow(dead_code)]
pub(crate) const fn pop_count_swar(bitmap: u32) -> u32 {
    let mut v = bitmap;
    v -= (v >> 1) & 0x5555_5555;
    v = (v & 0x3333_3333) + ((v >> 2) & 0x3333_3333);
    (((v + (v >> 4)) & 0x0F0F_0F0F).wrapping_mul(0x0101_0101)) >> 24
}

/// Position of `bit`'s child in the dense child array of a node with
/// `bitmap`: the number of populated slots below it.
#[inline(always)]
pub(crate) fn index_of(bitmap: u32, bit: u32) -> usize {
    debug_assert!(bit.is_power_of_two());
    pop_count(bitmap & (bit - 1)) as usize
}

/// The low `shift` bits of `hash`. `shift` may be the full hash width.
#[cfg(any(test, feature = "invariants"))]
#[inline]
pub(crate) fn low_bits(hash: HashBits, shift: u32) -> HashBits {
    if shift >= TRIE_MAX_SHIFT {
        hash
    } else {
        hash & ((1 << shift) - 1)
    }
}
