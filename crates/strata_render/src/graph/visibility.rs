//! # Visibility Encoding
//!
//! Per-section reachability between faces, packed into a `u64`.
//!
//! Bit `from * 8 + to` is set when something entering the section through
//! face `from` can leave through face `to`:
//!
//! ```text
//!   byte:   7   6   5   4   3   2   1   0
//!   from: ─── ─── EAST WEST SOUTH NORTH UP DOWN
//!   bits in each byte: outgoing faces (low 6 bits)
//! ```
//!
//! The encoding is computed once per mesh build by [`OcclusionGraphBuilder`]
//! and only read during traversal.

use ndshape::{ConstShape, ConstShape3u32};

use super::direction::{GraphDirection, GraphDirectionSet};

/// Bits of one byte that carry outgoing directions.
const OUTGOING_MASK: u64 = GraphDirectionSet::ALL.bits() as u64;

#[inline]
const fn bit(from: GraphDirection, to: GraphDirection) -> u64 {
    1 << (from.ordinal() * 8 + to.ordinal())
}

/// Encoding helpers for section visibility data.
pub struct VisibilityEncoding;

impl VisibilityEncoding {
    /// Nothing passes through the section.
    pub const NULL: u64 = 0;

    /// Every face sees every other face.
    pub const ALL_CONNECTED: u64 = OUTGOING_MASK * 0x0000_0101_0101_0101;

    /// Encodes a face-to-face predicate.
    #[must_use]
    pub fn encode(mut is_visible_through: impl FnMut(GraphDirection, GraphDirection) -> bool) -> u64 {
        let mut data = Self::NULL;

        for from in GraphDirection::ALL {
            for to in GraphDirection::ALL {
                if is_visible_through(from, to) {
                    data |= bit(from, to);
                }
            }
        }

        data
    }

    /// Returns true if `to` can be reached after entering through `from`.
    #[inline]
    #[must_use]
    pub const fn is_connected(data: u64, from: GraphDirection, to: GraphDirection) -> bool {
        data & bit(from, to) != 0
    }

    /// Outgoing directions reachable from any of the incoming directions.
    ///
    /// An empty incoming set means the section is the traversal origin, in
    /// which case every outgoing direction reachable from any face counts.
    #[inline]
    #[must_use]
    pub fn get_connections(data: u64, incoming: GraphDirectionSet) -> GraphDirectionSet {
        if incoming.is_empty() {
            return Self::get_all_connections(data);
        }

        let mut outgoing = 0u64;
        for from in incoming.iter() {
            outgoing |= data >> (from.ordinal() * 8);
        }

        #[allow(clippy::cast_possible_truncation)]
        GraphDirectionSet::from_bits((outgoing & OUTGOING_MASK) as u8)
    }

    /// Union of the outgoing directions over all incoming faces.
    #[inline]
    #[must_use]
    pub const fn get_all_connections(data: u64) -> GraphDirectionSet {
        let mut folded = data;
        folded |= folded >> 32;
        folded |= folded >> 16;
        folded |= folded >> 8;

        #[allow(clippy::cast_possible_truncation)]
        GraphDirectionSet::from_bits((folded & OUTGOING_MASK) as u8)
    }
}

/// Edge length of a section in blocks.
const SIZE: u32 = 16;

type SectionShape = ConstShape3u32<SIZE, SIZE, SIZE>;

const VOLUME: usize = (SIZE * SIZE * SIZE) as usize;

/// Below this many opaque blocks no wall can separate two faces.
const MIN_OPAQUE_FOR_OCCLUSION: u32 = SIZE * SIZE;

/// Computes the visibility encoding of a 16³ block volume.
///
/// Mark opaque blocks with [`OcclusionGraphBuilder::mark_opaque`], then call
/// [`OcclusionGraphBuilder::build`]. The builder flood-fills every pocket of
/// open blocks and connects all faces a pocket touches.
pub struct OcclusionGraphBuilder {
    opaque: [u64; VOLUME / 64],
    opaque_count: u32,
}

impl OcclusionGraphBuilder {
    /// Creates a builder with every block open.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            opaque: [0; VOLUME / 64],
            opaque_count: 0,
        }
    }

    #[inline]
    fn index(x: u32, y: u32, z: u32) -> usize {
        SectionShape::linearize([x, y, z]) as usize
    }

    #[inline]
    fn is_opaque_index(&self, index: usize) -> bool {
        self.opaque[index >> 6] & (1 << (index & 63)) != 0
    }

    #[inline]
    fn set_index(&mut self, index: usize) {
        self.opaque[index >> 6] |= 1 << (index & 63);
    }

    /// Marks a block opaque. Coordinates are local to the section.
    ///
    /// # Panics
    ///
    /// Panics if a coordinate is outside `0..16`.
    pub fn mark_opaque(&mut self, x: u32, y: u32, z: u32) {
        assert!(x < SIZE && y < SIZE && z < SIZE, "block ({x}, {y}, {z}) outside section");

        let index = Self::index(x, y, z);
        if !self.is_opaque_index(index) {
            self.set_index(index);
            self.opaque_count += 1;
        }
    }

    /// Returns true if the block has been marked opaque.
    #[must_use]
    pub fn is_opaque(&self, x: u32, y: u32, z: u32) -> bool {
        x < SIZE && y < SIZE && z < SIZE && self.is_opaque_index(Self::index(x, y, z))
    }

    /// Number of opaque blocks.
    #[must_use]
    pub const fn opaque_count(&self) -> u32 {
        self.opaque_count
    }

    /// Flood-fills the open blocks and encodes face connectivity.
    #[must_use]
    pub fn build(&self) -> u64 {
        if self.opaque_count < MIN_OPAQUE_FOR_OCCLUSION {
            return VisibilityEncoding::ALL_CONNECTED;
        }

        if self.opaque_count as usize == VOLUME {
            return VisibilityEncoding::NULL;
        }

        let mut visited = self.opaque;
        let mut stack: Vec<usize> = Vec::with_capacity(VOLUME);
        let mut data = VisibilityEncoding::NULL;

        for start in 0..VOLUME {
            if visited[start >> 6] & (1 << (start & 63)) != 0 {
                continue;
            }

            visited[start >> 6] |= 1 << (start & 63);
            stack.push(start);

            let mut faces = GraphDirectionSet::NONE;

            while let Some(index) = stack.pop() {
                #[allow(clippy::cast_possible_truncation)]
                let [x, y, z] = SectionShape::delinearize(index as u32);
                faces |= touched_faces(x, y, z);

                for direction in GraphDirection::ALL {
                    let (dx, dy, dz) = direction.offset();
                    let (Some(nx), Some(ny), Some(nz)) = (
                        step(x, dx),
                        step(y, dy),
                        step(z, dz),
                    ) else {
                        continue;
                    };

                    let neighbor = Self::index(nx, ny, nz);
                    if visited[neighbor >> 6] & (1 << (neighbor & 63)) == 0 {
                        visited[neighbor >> 6] |= 1 << (neighbor & 63);
                        stack.push(neighbor);
                    }
                }
            }

            data |= VisibilityEncoding::encode(|from, to| faces.contains(from) && faces.contains(to));
        }

        data
    }
}

impl Default for OcclusionGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn step(value: u32, delta: i32) -> Option<u32> {
    let next = value.checked_add_signed(delta)?;
    (next < SIZE).then_some(next)
}

fn touched_faces(x: u32, y: u32, z: u32) -> GraphDirectionSet {
    let mut faces = GraphDirectionSet::NONE;
    let last = SIZE - 1;

    if x == 0 {
        faces |= GraphDirection::West.into();
    }
    if x == last {
        faces |= GraphDirection::East.into();
    }
    if y == 0 {
        faces |= GraphDirection::Down.into();
    }
    if y == last {
        faces |= GraphDirection::Up.into();
    }
    if z == 0 {
        faces |= GraphDirection::North.into();
    }
    if z == last {
        faces |= GraphDirection::South.into();
    }

    faces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_connected_reaches_everything() {
        for from in GraphDirection::ALL {
            let outgoing =
                VisibilityEncoding::get_connections(VisibilityEncoding::ALL_CONNECTED, from.into());
            assert_eq!(outgoing, GraphDirectionSet::ALL);
        }
        assert_eq!(
            VisibilityEncoding::get_connections(VisibilityEncoding::NULL, GraphDirectionSet::ALL),
            GraphDirectionSet::NONE
        );
    }

    #[test]
    fn test_single_pair_only_opens_that_pair() {
        let data = VisibilityEncoding::encode(|from, to| {
            from == GraphDirection::Down && to == GraphDirection::East
        });

        assert!(VisibilityEncoding::is_connected(data, GraphDirection::Down, GraphDirection::East));
        assert!(!VisibilityEncoding::is_connected(data, GraphDirection::East, GraphDirection::Down));
        assert_eq!(
            VisibilityEncoding::get_connections(data, GraphDirection::Down.into()),
            GraphDirectionSet::of(GraphDirection::East)
        );
        assert_eq!(
            VisibilityEncoding::get_connections(data, GraphDirection::Up.into()),
            GraphDirectionSet::NONE
        );
    }

    #[test]
    fn test_empty_incoming_folds_every_face() {
        let data = VisibilityEncoding::encode(|from, to| {
            (from == GraphDirection::North && to == GraphDirection::South)
                || (from == GraphDirection::Up && to == GraphDirection::West)
        });

        let outgoing = VisibilityEncoding::get_connections(data, GraphDirectionSet::NONE);
        assert_eq!(
            outgoing,
            GraphDirectionSet::of(GraphDirection::South).with(GraphDirection::West)
        );
        assert_eq!(outgoing, VisibilityEncoding::get_all_connections(data));
    }

    #[test]
    fn test_sparse_volume_is_fully_connected() {
        let mut builder = OcclusionGraphBuilder::new();
        for x in 0..16 {
            builder.mark_opaque(x, 3, 3);
        }
        assert_eq!(builder.opaque_count(), 16);
        assert_eq!(builder.build(), VisibilityEncoding::ALL_CONNECTED);
    }

    #[test]
    fn test_horizontal_wall_separates_up_and_down() {
        let mut builder = OcclusionGraphBuilder::new();
        for x in 0..16 {
            for z in 0..16 {
                builder.mark_opaque(x, 8, z);
            }
        }

        let data = builder.build();
        assert!(!VisibilityEncoding::is_connected(data, GraphDirection::Down, GraphDirection::Up));
        assert!(!VisibilityEncoding::is_connected(data, GraphDirection::Up, GraphDirection::Down));
        assert!(VisibilityEncoding::is_connected(data, GraphDirection::Down, GraphDirection::North));
        assert!(VisibilityEncoding::is_connected(data, GraphDirection::East, GraphDirection::West));
        assert!(VisibilityEncoding::is_connected(data, GraphDirection::Up, GraphDirection::South));
    }

    #[test]
    fn test_solid_volume_is_null() {
        let mut builder = OcclusionGraphBuilder::new();
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    builder.mark_opaque(x, y, z);
                }
            }
        }
        assert_eq!(builder.build(), VisibilityEncoding::NULL);
        assert!(builder.is_opaque(15, 15, 15));
        assert!(!builder.is_opaque(16, 0, 0));
    }
}
