//! # Section Coordinates
//!
//! Integer coordinates of 16³ block sections and their packed 64-bit form.
//!
//! Packed layout (most significant first):
//!
//! ```text
//! ┌──────────────┬──────────────┬────────────┐
//! │  x: 22 bits  │  z: 22 bits  │ y: 20 bits │
//! └──────────────┴──────────────┴────────────┘
//! ```

/// log2 of the section edge length in blocks.
pub const SECTION_SHIFT: i32 = 4;

/// Edge length of a section in blocks.
pub const SECTION_SIZE: i32 = 1 << SECTION_SHIFT;

const XZ_BITS: u32 = 22;
const Y_BITS: u32 = 20;
const XZ_MASK: i64 = (1 << XZ_BITS) - 1;
const Y_MASK: i64 = (1 << Y_BITS) - 1;
const Z_OFFSET: u32 = Y_BITS;
const X_OFFSET: u32 = Y_BITS + XZ_BITS;

/// Position of a section in the section grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionPos {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl SectionPos {
    /// Creates a new section position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the section containing the given block.
    #[inline]
    #[must_use]
    pub const fn from_block(x: i32, y: i32, z: i32) -> Self {
        Self::new(x >> SECTION_SHIFT, y >> SECTION_SHIFT, z >> SECTION_SHIFT)
    }

    /// Packs the position into a single integer key.
    ///
    /// Coordinates outside the packable range wrap.
    #[inline]
    #[must_use]
    pub const fn as_long(self) -> u64 {
        let x = (self.x as i64) & XZ_MASK;
        let y = (self.y as i64) & Y_MASK;
        let z = (self.z as i64) & XZ_MASK;

        ((x << X_OFFSET) | (z << Z_OFFSET) | y) as u64
    }

    /// Unpacks a key produced by [`SectionPos::as_long`].
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn from_long(packed: u64) -> Self {
        let packed = packed as i64;

        Self {
            x: (packed >> X_OFFSET) as i32,
            y: ((packed << (64 - Y_BITS)) >> (64 - Y_BITS)) as i32,
            z: ((packed << (64 - X_OFFSET)) >> (64 - XZ_BITS)) as i32,
        }
    }

    /// Returns this position shifted by the given amounts.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Block X coordinate of the section's minimum corner.
    #[inline]
    #[must_use]
    pub const fn min_block_x(self) -> i32 {
        self.x << SECTION_SHIFT
    }

    /// Block Y coordinate of the section's minimum corner.
    #[inline]
    #[must_use]
    pub const fn min_block_y(self) -> i32 {
        self.y << SECTION_SHIFT
    }

    /// Block Z coordinate of the section's minimum corner.
    #[inline]
    #[must_use]
    pub const fn min_block_z(self) -> i32 {
        self.z << SECTION_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_signed_coordinates() {
        for pos in [
            SectionPos::new(0, 0, 0),
            SectionPos::new(-1, -4, -1),
            SectionPos::new(1_000_000, 300, -1_000_000),
            SectionPos::new(-2_097_152, -524_288, 2_097_151),
        ] {
            assert_eq!(SectionPos::from_long(pos.as_long()), pos);
        }
    }

    #[test]
    fn test_distinct_positions_distinct_keys() {
        let a = SectionPos::new(1, 0, 0).as_long();
        let b = SectionPos::new(0, 1, 0).as_long();
        let c = SectionPos::new(0, 0, 1).as_long();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_block_floors_negative() {
        assert_eq!(SectionPos::from_block(-1, 15, 16), SectionPos::new(-1, 0, 1));
        assert_eq!(SectionPos::new(-1, 2, 3).min_block_x(), -16);
        assert_eq!(SectionPos::new(-1, 2, 3).min_block_y(), 32);
    }
}
