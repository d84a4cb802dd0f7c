//! Per-pass mesh directory of a region.
//!
//! One fixed-layout record per local slot. A record says where each facing
//! bucket of the section's mesh starts in the region's geometry arena and
//! how many indices draw it.

use bytemuck::{Pod, Zeroable};

use super::arena::ArenaAllocation;
use super::local_index::LocalSectionIndex;
use super::region::REGION_SIZE;
use crate::chunk::index_buffer::{ELEMENTS_PER_PRIMITIVE, VERTICES_PER_PRIMITIVE};
use crate::chunk::{BuiltSectionMesh, ModelQuadFacing};

/// Draw parameters of one section for one pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SectionRenderData {
    /// Facing buckets with geometry. Zero means the slot is skipped.
    pub slice_mask: u32,
    /// Base vertex of each bucket within the arena.
    pub vertex_offset: [u32; ModelQuadFacing::COUNT],
    /// Indices to draw for each bucket.
    pub element_count: [u32; ModelQuadFacing::COUNT],
}

impl SectionRenderData {
    /// Record for a mesh placed at `allocation`.
    #[must_use]
    pub fn new(allocation: ArenaAllocation, mesh: &BuiltSectionMesh) -> Self {
        let mut data = Self::default();

        for (facing, range) in mesh.ranges.iter().enumerate() {
            let Some(range) = range.filter(|r| r.vertex_count > 0) else {
                continue;
            };

            debug_assert!(
                range.vertex_start + range.vertex_count <= allocation.count,
                "facing range ends past the section's allocation"
            );
            data.slice_mask |= 1 << facing;
            data.vertex_offset[facing] = allocation.offset + range.vertex_start;
            data.element_count[facing] =
                (range.vertex_count / VERTICES_PER_PRIMITIVE) * ELEMENTS_PER_PRIMITIVE;
        }

        data
    }

    /// Slice mask narrowed to the facing bits.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn slices(&self) -> u8 {
        (self.slice_mask & ModelQuadFacing::ALL as u32) as u8
    }
}

/// Directory of [`SectionRenderData`] for every slot of a region.
#[derive(Debug)]
pub struct SectionRenderDataStorage {
    records: Box<[SectionRenderData; REGION_SIZE]>,
    allocations: Box<[Option<ArenaAllocation>; REGION_SIZE]>,
}

impl SectionRenderDataStorage {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Box::new([SectionRenderData::default(); REGION_SIZE]),
            allocations: Box::new([None; REGION_SIZE]),
        }
    }

    /// Record of a slot. Empty slots read as all zeroes.
    #[inline]
    #[must_use]
    pub fn get(&self, index: LocalSectionIndex) -> &SectionRenderData {
        &self.records[index.as_usize()]
    }

    /// Arena allocation backing a slot.
    #[inline]
    #[must_use]
    pub fn allocation(&self, index: LocalSectionIndex) -> Option<ArenaAllocation> {
        self.allocations[index.as_usize()]
    }

    /// Installs a mesh, returning the allocation it replaces.
    pub fn set_meshes(
        &mut self,
        index: LocalSectionIndex,
        allocation: ArenaAllocation,
        mesh: &BuiltSectionMesh,
    ) -> Option<ArenaAllocation> {
        self.records[index.as_usize()] = SectionRenderData::new(allocation, mesh);
        self.allocations[index.as_usize()].replace(allocation)
    }

    /// Clears a slot, returning its allocation for the caller to free.
    pub fn remove_meshes(&mut self, index: LocalSectionIndex) -> Option<ArenaAllocation> {
        self.records[index.as_usize()] = SectionRenderData::default();
        self.allocations[index.as_usize()].take()
    }

    /// Returns true if no slot holds a mesh.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.iter().all(Option::is_none)
    }
}

impl Default for SectionRenderDataStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::VertexRange;

    fn mesh() -> BuiltSectionMesh {
        let mut mesh = BuiltSectionMesh::default();
        mesh.ranges[ModelQuadFacing::PosY.ordinal()] = Some(VertexRange::new(0, 8));
        mesh.ranges[ModelQuadFacing::NegZ.ordinal()] = Some(VertexRange::new(8, 4));
        mesh.ranges[ModelQuadFacing::PosX.ordinal()] = Some(VertexRange::new(12, 0));
        mesh
    }

    #[test]
    fn test_record_offsets_are_arena_relative() {
        let allocation = ArenaAllocation {
            offset: 100,
            count: 12,
        };
        let data = SectionRenderData::new(allocation, &mesh());

        assert_eq!(
            data.slices(),
            ModelQuadFacing::PosY.bit() | ModelQuadFacing::NegZ.bit()
        );
        assert_eq!(data.vertex_offset[ModelQuadFacing::PosY.ordinal()], 100);
        assert_eq!(data.element_count[ModelQuadFacing::PosY.ordinal()], 12);
        assert_eq!(data.vertex_offset[ModelQuadFacing::NegZ.ordinal()], 108);
        assert_eq!(data.element_count[ModelQuadFacing::NegZ.ordinal()], 6);
        assert_eq!(data.element_count[ModelQuadFacing::PosX.ordinal()], 0);
    }

    #[test]
    fn test_replace_and_remove_return_allocations() {
        let mut storage = SectionRenderDataStorage::new();
        let slot = LocalSectionIndex::pack(1, 2, 3);
        let first = ArenaAllocation { offset: 0, count: 12 };
        let second = ArenaAllocation { offset: 12, count: 12 };

        assert_eq!(storage.set_meshes(slot, first, &mesh()), None);
        assert_eq!(storage.set_meshes(slot, second, &mesh()), Some(first));
        assert!(!storage.is_empty());

        assert_eq!(storage.remove_meshes(slot), Some(second));
        assert_eq!(storage.get(slot).slice_mask, 0);
        assert!(storage.is_empty());
    }
}
