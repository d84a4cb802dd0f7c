//! Cardinal directions of the section graph and small sets of them.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign};

/// One of the six faces of a section.
///
/// North is -Z, south is +Z, west is -X, east is +X.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphDirection {
    /// -Y.
    Down = 0,
    /// +Y.
    Up = 1,
    /// -Z.
    North = 2,
    /// +Z.
    South = 3,
    /// -X.
    West = 4,
    /// +X.
    East = 5,
}

impl GraphDirection {
    /// Number of directions.
    pub const COUNT: usize = 6;

    /// All directions in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// Bit position of the direction inside a [`GraphDirectionSet`].
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Returns the direction with the given ordinal.
    #[inline]
    #[must_use]
    pub const fn from_ordinal(ordinal: usize) -> Option<Self> {
        if ordinal < Self::COUNT {
            Some(Self::ALL[ordinal])
        } else {
            None
        }
    }

    /// Returns the direction pointing the other way.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Grid offset of the neighbor in this direction.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }
}

/// A set of [`GraphDirection`]s packed into the low six bits of a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GraphDirectionSet(u8);

impl GraphDirectionSet {
    /// The empty set.
    pub const NONE: Self = Self(0);

    /// Every direction.
    pub const ALL: Self = Self((1 << GraphDirection::COUNT) - 1);

    /// A set holding one direction.
    #[inline]
    #[must_use]
    pub const fn of(direction: GraphDirection) -> Self {
        Self(1 << direction.ordinal())
    }

    /// Builds a set from raw bits, ignoring bits above the sixth.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits of the set.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if the direction is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, direction: GraphDirection) -> bool {
        self.0 & (1 << direction.ordinal()) != 0
    }

    /// Returns true if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set union.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Set intersection.
    #[inline]
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns a copy of the set with the direction added.
    #[inline]
    #[must_use]
    pub const fn with(self, direction: GraphDirection) -> Self {
        Self(self.0 | (1 << direction.ordinal()))
    }

    /// Returns a copy of the set with the direction removed.
    #[inline]
    #[must_use]
    pub const fn without(self, direction: GraphDirection) -> Self {
        Self(self.0 & !(1 << direction.ordinal()))
    }

    /// Number of directions in the set.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterates the directions in ordinal order.
    pub fn iter(self) -> impl Iterator<Item = GraphDirection> {
        GraphDirection::ALL
            .into_iter()
            .filter(move |direction| self.contains(*direction))
    }
}

impl BitOr for GraphDirectionSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for GraphDirectionSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for GraphDirectionSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for GraphDirectionSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl From<GraphDirection> for GraphDirectionSet {
    fn from(direction: GraphDirection) -> Self {
        Self::of(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposites_are_involutions() {
        for direction in GraphDirection::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_ne!(direction.opposite(), direction);

            let (x, y, z) = direction.offset();
            let (ox, oy, oz) = direction.opposite().offset();
            assert_eq!((x + ox, y + oy, z + oz), (0, 0, 0));
        }
    }

    #[test]
    fn test_set_operations() {
        let up_down = GraphDirectionSet::of(GraphDirection::Up) | GraphDirection::Down.into();
        assert!(up_down.contains(GraphDirection::Up));
        assert!(!up_down.contains(GraphDirection::East));
        assert_eq!(up_down.len(), 2);

        let east = GraphDirectionSet::NONE.with(GraphDirection::East);
        assert!((up_down & east).is_empty());
        assert_eq!((up_down | east).len(), 3);
        assert_eq!(GraphDirectionSet::ALL.without(GraphDirection::Up).len(), 5);
        assert_eq!(GraphDirectionSet::from_bits(0xFF), GraphDirectionSet::ALL);
    }

    #[test]
    fn test_iteration_in_ordinal_order() {
        let set = GraphDirectionSet::of(GraphDirection::East)
            .with(GraphDirection::Down)
            .with(GraphDirection::South);

        let collected: Vec<_> = set.iter().collect();
        assert_eq!(
            collected,
            vec![GraphDirection::Down, GraphDirection::South, GraphDirection::East]
        );
    }
}
