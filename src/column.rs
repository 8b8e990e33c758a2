/// Bit-vector algebra for one tile column
///
/// A `TileColumn` holds the coverage state of a single screen column inside a
/// tile: bit `y` is set when pixel row `y` of that column is already occluded.
/// All operations are single-word bit twiddling, so the scanline fill and the
/// flush sweeps work on 64 pixels at a time.
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

/// Tile height in pixels; one bit per row.
pub const TILE_HEIGHT: usize = 64;

/// Coverage bits for one column of a tile. A set bit means "occluded".
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct TileColumn(u64);

impl TileColumn {
    pub const EMPTY: TileColumn = TileColumn(0);
    pub const FULL: TileColumn = TileColumn(u64::MAX);

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_full(self) -> bool {
        self.0 == u64::MAX
    }

    #[inline]
    pub fn test_bit(self, y: usize) -> bool {
        debug_assert!(y < TILE_HEIGHT);
        self.0 & (1u64 << y) != 0
    }

    #[inline]
    pub fn set_bit(&mut self, y: usize) {
        debug_assert!(y < TILE_HEIGHT);
        self.0 |= 1u64 << y;
    }

    #[inline]
    pub fn clear_bit(&mut self, y: usize) {
        debug_assert!(y < TILE_HEIGHT);
        self.0 &= !(1u64 << y);
    }

    #[inline]
    pub fn xor_bit(&mut self, y: usize) {
        debug_assert!(y < TILE_HEIGHT);
        self.0 ^= 1u64 << y;
    }

    /// `self & !other`: the bits this column would newly set on `other`.
    #[inline]
    pub fn and_inverted(self, other: TileColumn) -> TileColumn {
        TileColumn(self.0 & !other.0)
    }

    /// True if `self` has any bit set that `other` does not.
    #[inline]
    pub fn test_inverted_mask(self, other: TileColumn) -> bool {
        self.0 & !other.0 != 0
    }

    /// True if any bit of the n-th 8-bit group is set. Group `n` covers pixel
    /// rows `8n..8n+8` and maps to one row of 8x8 depth blocks.
    #[inline]
    pub fn check_byte(self, n: usize) -> bool {
        debug_assert!(n < TILE_HEIGHT / 8);
        self.0 & (0xFFu64 << (n * 8)) != 0
    }

    /// Mask with rows `0..=y` set.
    #[inline]
    pub fn span_from_top(y: usize) -> TileColumn {
        debug_assert!(y < TILE_HEIGHT);
        if y >= TILE_HEIGHT - 1 {
            TileColumn::FULL
        } else {
            TileColumn((1u64 << (y + 1)) - 1)
        }
    }

    /// Mask with rows `y..TILE_HEIGHT` set.
    #[inline]
    pub fn span_to_bottom(y: usize) -> TileColumn {
        debug_assert!(y < TILE_HEIGHT);
        TileColumn(u64::MAX << y)
    }

    /// Mask with rows `y1..=y2` set.
    #[inline]
    pub fn span(y1: usize, y2: usize) -> TileColumn {
        debug_assert!(y1 <= y2);
        TileColumn(Self::span_from_top(y2).0 & Self::span_to_bottom(y1).0)
    }
}

impl Not for TileColumn {
    type Output = TileColumn;
    #[inline]
    fn not(self) -> TileColumn {
        TileColumn(!self.0)
    }
}

impl BitXor for TileColumn {
    type Output = TileColumn;
    #[inline]
    fn bitxor(self, rhs: TileColumn) -> TileColumn {
        TileColumn(self.0 ^ rhs.0)
    }
}

impl BitXorAssign for TileColumn {
    #[inline]
    fn bitxor_assign(&mut self, rhs: TileColumn) {
        self.0 ^= rhs.0;
    }
}

impl BitOr for TileColumn {
    type Output = TileColumn;
    #[inline]
    fn bitor(self, rhs: TileColumn) -> TileColumn {
        TileColumn(self.0 | rhs.0)
    }
}

impl BitOrAssign for TileColumn {
    #[inline]
    fn bitor_assign(&mut self, rhs: TileColumn) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TileColumn {
    type Output = TileColumn;
    #[inline]
    fn bitand(self, rhs: TileColumn) -> TileColumn {
        TileColumn(self.0 & rhs.0)
    }
}

impl BitAndAssign for TileColumn {
    #[inline]
    fn bitand_assign(&mut self, rhs: TileColumn) {
        self.0 &= rhs.0;
    }
}

impl std::fmt::Debug for TileColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TileColumn({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_invert_is_identity() {
        let mut x = TileColumn::EMPTY;
        x.set_bit(3);
        x.set_bit(40);
        assert_eq!(!!x, x);
    }

    #[test]
    fn test_xor_self_is_empty() {
        let mut x = TileColumn::EMPTY;
        x.set_bit(0);
        x.set_bit(63);
        assert!((x ^ x).is_empty());
    }

    #[test]
    fn test_or_with_complement_is_full() {
        let mut x = TileColumn::EMPTY;
        x.set_bit(17);
        assert!((x | !x).is_full());
    }

    #[test]
    fn test_and_inverted() {
        let mut a = TileColumn::EMPTY;
        a.set_bit(1);
        a.set_bit(2);
        let mut b = TileColumn::EMPTY;
        b.set_bit(2);

        let r = a.and_inverted(b);
        assert!(r.test_bit(1));
        assert!(!r.test_bit(2));
        assert!(a.test_inverted_mask(b));
        assert!(!b.test_inverted_mask(a));
    }

    #[test]
    fn test_check_byte_maps_to_row_groups() {
        let mut x = TileColumn::EMPTY;
        x.set_bit(8); // first row of group 1
        assert!(!x.check_byte(0));
        assert!(x.check_byte(1));
        assert!(!x.check_byte(2));

        x.set_bit(63); // last row of group 7
        assert!(x.check_byte(7));
    }

    #[test]
    fn test_span_masks() {
        assert_eq!(TileColumn::span_from_top(63), TileColumn::FULL);
        assert_eq!(TileColumn::span_to_bottom(0), TileColumn::FULL);

        let top = TileColumn::span_from_top(7);
        assert!(top.test_bit(0) && top.test_bit(7) && !top.test_bit(8));

        let bottom = TileColumn::span_to_bottom(56);
        assert!(bottom.test_bit(56) && bottom.test_bit(63) && !bottom.test_bit(55));

        let mid = TileColumn::span(10, 20);
        assert!(!mid.test_bit(9) && mid.test_bit(10) && mid.test_bit(20) && !mid.test_bit(21));
    }

    #[test]
    fn test_span_is_xor_of_precomputed_masks() {
        // The scanline fill relies on span(y1, y2) being equivalent to the
        // three-stage xor: start-mask xor end-mask xor full.
        for y1 in 0..TILE_HEIGHT {
            for y2 in y1..TILE_HEIGHT {
                let staged = TileColumn::span_from_top(y2)
                    ^ TileColumn::span_to_bottom(y1)
                    ^ TileColumn::FULL;
                assert_eq!(TileColumn::span(y1, y2), staged, "y1={} y2={}", y1, y2);
            }
        }
    }
}
