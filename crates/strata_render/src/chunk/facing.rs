//! Facing buckets: geometry grouped by dominant face normal.

/// One of the seven facing buckets a section mesh is split into.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelQuadFacing {
    /// Normal points to +X.
    PosX = 0,
    /// Normal points to +Y.
    PosY = 1,
    /// Normal points to +Z.
    PosZ = 2,
    /// Normal points to -X.
    NegX = 3,
    /// Normal points to -Y.
    NegY = 4,
    /// Normal points to -Z.
    NegZ = 5,
    /// Not axis aligned; always drawn.
    Unassigned = 6,
}

impl ModelQuadFacing {
    /// Number of buckets.
    pub const COUNT: usize = 7;

    /// Mask with every bucket set.
    pub const ALL: u8 = (1 << Self::COUNT) - 1;

    /// Mask with no bucket set.
    pub const NONE: u8 = 0;

    /// Buckets in ordinal order.
    pub const VALUES: [Self; Self::COUNT] = [
        Self::PosX,
        Self::PosY,
        Self::PosZ,
        Self::NegX,
        Self::NegY,
        Self::NegZ,
        Self::Unassigned,
    ];

    /// Index of the bucket.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Mask bit of the bucket.
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Bucket on the opposite side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::PosY => Self::NegY,
            Self::PosZ => Self::NegZ,
            Self::NegX => Self::PosX,
            Self::NegY => Self::PosY,
            Self::NegZ => Self::PosZ,
            Self::Unassigned => Self::Unassigned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(ModelQuadFacing::ALL, 0b111_1111);
        assert_eq!(ModelQuadFacing::Unassigned.bit(), 0b100_0000);
        for facing in ModelQuadFacing::VALUES {
            assert_eq!(facing.opposite().opposite(), facing);
            assert_eq!(ModelQuadFacing::VALUES[facing.ordinal()], facing);
        }
    }
}
