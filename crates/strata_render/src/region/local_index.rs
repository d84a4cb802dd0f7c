//! Packed position of a section inside its region.
//!
//! ```text
//!   bit:  7 6 5 | 4 3 2 | 1 0
//!          x    |   z   |  y
//! ```

use strata_core::SectionPos;

use super::region::{REGION_HEIGHT_M, REGION_LENGTH_M, REGION_WIDTH_M};

const X_SHIFT: u8 = 5;
const Z_SHIFT: u8 = 2;
const Y_SHIFT: u8 = 0;

/// Local slot of a section within an 8×4×8 region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSectionIndex(u8);

impl LocalSectionIndex {
    /// Packs region-local coordinates. Bits above the region size are dropped.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const fn pack(x: i32, y: i32, z: i32) -> Self {
        let x = (x & REGION_WIDTH_M) as u8;
        let y = (y & REGION_HEIGHT_M) as u8;
        let z = (z & REGION_LENGTH_M) as u8;

        Self((x << X_SHIFT) | (z << Z_SHIFT) | (y << Y_SHIFT))
    }

    /// Slot of a section given its world section coordinates.
    #[inline]
    #[must_use]
    pub const fn from_section(pos: SectionPos) -> Self {
        Self::pack(pos.x, pos.y, pos.z)
    }

    /// Wraps a raw slot number.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw slot number.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Slot number as an array index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Local X.
    #[inline]
    #[must_use]
    pub const fn x(self) -> i32 {
        ((self.0 >> X_SHIFT) as i32) & REGION_WIDTH_M
    }

    /// Local Y.
    #[inline]
    #[must_use]
    pub const fn y(self) -> i32 {
        ((self.0 >> Y_SHIFT) as i32) & REGION_HEIGHT_M
    }

    /// Local Z.
    #[inline]
    #[must_use]
    pub const fn z(self) -> i32 {
        ((self.0 >> Z_SHIFT) as i32) & REGION_LENGTH_M
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_covers_every_slot_once() {
        let mut seen = [false; 256];
        for x in 0..8 {
            for y in 0..4 {
                for z in 0..8 {
                    let index = LocalSectionIndex::pack(x, y, z);
                    assert!(!seen[index.as_usize()]);
                    seen[index.as_usize()] = true;
                    assert_eq!((index.x(), index.y(), index.z()), (x, y, z));
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_negative_sections_wrap_into_region() {
        let index = LocalSectionIndex::from_section(SectionPos::new(-1, -1, -8));
        assert_eq!((index.x(), index.y(), index.z()), (7, 3, 0));
    }
}
