/// 16.16 fixed-point scalar for the edge rasterizer
///
/// Screen x coordinates and per-scanline slopes are carried as two's-complement
/// integers with 16 fractional bits so the per-tile edge walk needs one
/// division per edge and pure integer adds per scanline. Viewport dimensions
/// are capped (see `error::MAX_DIMENSION`) so any on-screen x shifted into
/// 16.16 stays well inside `i32` range.
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::tile::{SHIFT_TILE_COL, TILE_WIDTH};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Mask selecting the tile-local part of a 16.16 screen x coordinate.
const TILE_X_MASK: i32 = ((TILE_WIDTH as i32) << FRAC_BITS) - 1;

/// A 16.16 fixed-point value.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Fixed16(i32);

impl Fixed16 {
    pub const ZERO: Fixed16 = Fixed16(0);

    /// Convert a whole pixel coordinate to fixed point.
    #[inline]
    pub fn from_int(v: i32) -> Fixed16 {
        debug_assert!(
            (-0x4000..=0x4000).contains(&v),
            "pixel coordinate {} out of fixed-point range",
            v
        );
        Fixed16(v << FRAC_BITS)
    }

    #[inline]
    pub fn from_raw(raw: i32) -> Fixed16 {
        Fixed16(raw)
    }

    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Whole-pixel part (floor for non-negative values, arithmetic shift).
    #[inline]
    pub fn floor(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// The x-delta per scanline of an edge spanning `dx` pixels over `dy` rows.
    #[inline]
    pub fn slope(dx: i32, dy: i32) -> Fixed16 {
        debug_assert!(dy != 0);
        let raw = ((dx as i64) << FRAC_BITS) / dy as i64;
        debug_assert!(i32::try_from(raw).is_ok(), "slope overflow: {}/{}", dx, dy);
        Fixed16(raw as i32)
    }

    /// Reduce a screen-space x to its tile-local part, in `[0, TILE_WIDTH)`.
    /// Two's-complement masking keeps the result non-negative even when the
    /// incremental walk momentarily steps outside the tile.
    #[inline]
    pub fn tile_local(self) -> Fixed16 {
        Fixed16(self.0 & TILE_X_MASK)
    }

    /// Column index of a tile-local value, in `0..TILE_WIDTH`.
    #[inline]
    pub fn col(self) -> usize {
        debug_assert!(self.0 >= 0);
        (self.0 >> FRAC_BITS) as usize
    }

    /// Tile column of a screen-space value.
    #[inline]
    pub fn tile_col(self) -> i32 {
        self.0 >> (FRAC_BITS + SHIFT_TILE_COL as u32)
    }
}

impl Add for Fixed16 {
    type Output = Fixed16;
    #[inline]
    fn add(self, rhs: Fixed16) -> Fixed16 {
        Fixed16(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign for Fixed16 {
    #[inline]
    fn add_assign(&mut self, rhs: Fixed16) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub for Fixed16 {
    type Output = Fixed16;
    #[inline]
    fn sub(self, rhs: Fixed16) -> Fixed16 {
        Fixed16(self.0.wrapping_sub(rhs.0))
    }
}

impl SubAssign for Fixed16 {
    #[inline]
    fn sub_assign(&mut self, rhs: Fixed16) {
        self.0 = self.0.wrapping_sub(rhs.0);
    }
}

impl Neg for Fixed16 {
    type Output = Fixed16;
    #[inline]
    fn neg(self) -> Fixed16 {
        Fixed16(self.0.wrapping_neg())
    }
}

impl Mul<i32> for Fixed16 {
    type Output = Fixed16;
    #[inline]
    fn mul(self, rhs: i32) -> Fixed16 {
        Fixed16(self.0.wrapping_mul(rhs))
    }
}

impl std::fmt::Debug for Fixed16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed16({})", self.0 as f64 / (1 << FRAC_BITS) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_round_trip() {
        assert_eq!(Fixed16::from_int(0).floor(), 0);
        assert_eq!(Fixed16::from_int(31).floor(), 31);
        assert_eq!(Fixed16::from_int(-5).floor(), -5);
    }

    #[test]
    fn test_slope_accumulation() {
        // An edge from x=0 to x=10 over 5 rows steps 2 pixels per row.
        let dx = Fixed16::slope(10, 5);
        let mut x = Fixed16::from_int(0);
        for _ in 0..5 {
            x += dx;
        }
        assert_eq!(x.floor(), 10);
    }

    #[test]
    fn test_slope_truncates_toward_zero() {
        // 1 pixel over 3 rows never overshoots the end vertex.
        let dx = Fixed16::slope(1, 3);
        let mut x = Fixed16::from_int(0);
        for _ in 0..3 {
            x += dx;
        }
        assert_eq!(x.floor(), 0);
        assert!(x.raw() > 0);
    }

    #[test]
    fn test_tile_local_masks_into_range() {
        let x = Fixed16::from_int(100);
        let local = x.tile_local();
        assert_eq!(local.col(), 100 % TILE_WIDTH);

        // Negative overshoot wraps to a valid column instead of going negative.
        let under = Fixed16::from_int(0) - Fixed16::slope(3, 2);
        assert!(under.raw() < 0);
        let local = under.tile_local();
        assert!(local.col() < TILE_WIDTH);
    }

    #[test]
    fn test_tile_col() {
        assert_eq!(Fixed16::from_int(0).tile_col(), 0);
        assert_eq!(Fixed16::from_int(31).tile_col(), 0);
        assert_eq!(Fixed16::from_int(32).tile_col(), 1);
        assert_eq!(Fixed16::from_int(95).tile_col(), 2);
    }
}
