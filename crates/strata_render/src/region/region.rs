//! # Render Regions
//!
//! A region groups an 8×4×8 block of sections that share one geometry arena
//! and one tessellation, so a whole region draws with a single call.
//!
//! ```text
//!   RenderRegion
//!   ├── sections[256]        slot → SectionId
//!   ├── storage[pass]        slot → SectionRenderData   (lazy, per pass)
//!   ├── render_list          slots drawn this frame
//!   └── resources            arena + tessellation       (lazy, freed when empty)
//! ```

use strata_core::{PoolHandle, SectionPos, SECTION_SHIFT};
use tracing::debug;

use super::arena::GeometryArena;
use super::local_index::LocalSectionIndex;
use super::storage::SectionRenderDataStorage;
use crate::chunk::index_buffer::IndexType;
use crate::chunk::vertex::VertexFormat;
use crate::chunk::TerrainRenderPass;
use crate::device::{BufferHandle, RenderDevice, TessellationDescriptor, TessellationHandle};
use crate::error::{RenderError, RenderResult};
use crate::graph::SectionId;
use crate::lists::ChunkRenderList;

/// log2 of the region width in sections.
pub const REGION_WIDTH_SH: u32 = 3;
/// log2 of the region height in sections.
pub const REGION_HEIGHT_SH: u32 = 2;
/// log2 of the region length in sections.
pub const REGION_LENGTH_SH: u32 = 3;

/// Region width in sections.
pub const REGION_WIDTH: i32 = 1 << REGION_WIDTH_SH;
/// Region height in sections.
pub const REGION_HEIGHT: i32 = 1 << REGION_HEIGHT_SH;
/// Region length in sections.
pub const REGION_LENGTH: i32 = 1 << REGION_LENGTH_SH;

/// Mask of a local X coordinate.
pub const REGION_WIDTH_M: i32 = REGION_WIDTH - 1;
/// Mask of a local Y coordinate.
pub const REGION_HEIGHT_M: i32 = REGION_HEIGHT - 1;
/// Mask of a local Z coordinate.
pub const REGION_LENGTH_M: i32 = REGION_LENGTH - 1;

/// Sections per region.
#[allow(clippy::cast_sign_loss)]
pub const REGION_SIZE: usize = (REGION_WIDTH * REGION_HEIGHT * REGION_LENGTH) as usize;

/// Initial geometry arena size, in vertices.
#[allow(clippy::cast_possible_truncation)]
pub const REGION_ARENA_INITIAL_VERTICES: u32 = REGION_SIZE as u32 * 756;

/// Handle of a region in the region manager.
pub type RegionId = PoolHandle;

/// GPU objects of a region. Exist only while the region has geometry.
#[derive(Debug)]
pub struct DeviceResources {
    geometry_arena: GeometryArena,
    tessellation: Option<TessellationHandle>,
    vertex_format: VertexFormat,
}

impl DeviceResources {
    /// Allocates an arena sized for a typical region.
    pub fn new<D: RenderDevice + ?Sized>(device: &mut D, vertex_format: VertexFormat) -> Self {
        Self {
            geometry_arena: GeometryArena::new(
                device,
                "region_geometry",
                REGION_ARENA_INITIAL_VERTICES,
                vertex_format.stride,
            ),
            tessellation: None,
            vertex_format,
        }
    }

    /// Vertex arena.
    #[inline]
    #[must_use]
    pub const fn geometry_arena(&self) -> &GeometryArena {
        &self.geometry_arena
    }

    /// Vertex arena, mutably.
    #[inline]
    pub fn geometry_arena_mut(&mut self) -> &mut GeometryArena {
        &mut self.geometry_arena
    }

    /// Cached tessellation, if one has been built since the last refresh.
    #[inline]
    #[must_use]
    pub const fn tessellation(&self) -> Option<TessellationHandle> {
        self.tessellation
    }

    /// Returns the cached tessellation, binding the arena to `index_buffer`
    /// first if there is none.
    pub fn prepare_tessellation<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        index_buffer: BufferHandle,
        index_type: IndexType,
    ) -> TessellationHandle {
        if let Some(tessellation) = self.tessellation {
            return tessellation;
        }

        let tessellation = device.create_tessellation(&TessellationDescriptor {
            vertex_buffer: self.geometry_arena.buffer(),
            index_buffer,
            index_type,
            vertex_format: self.vertex_format,
        });
        self.tessellation = Some(tessellation);
        tessellation
    }

    /// Drops the cached tessellation.
    pub fn delete_tessellation<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(tessellation) = self.tessellation.take() {
            device.delete_tessellation(tessellation);
        }
    }

    /// Releases every GPU object.
    pub fn delete<D: RenderDevice + ?Sized>(mut self, device: &mut D) {
        self.delete_tessellation(device);
        self.geometry_arena.delete(device);
    }
}

/// An 8×4×8 group of sections sharing GPU resources.
#[derive(Debug)]
pub struct RenderRegion {
    pos: SectionPos,
    sections: Box<[Option<SectionId>; REGION_SIZE]>,
    section_count: usize,
    storage: [Option<SectionRenderDataStorage>; TerrainRenderPass::COUNT],
    render_list: ChunkRenderList,
    resources: Option<DeviceResources>,
}

impl RenderRegion {
    /// Creates an empty region at region coordinates `pos`.
    #[must_use]
    pub fn new(pos: SectionPos) -> Self {
        Self {
            pos,
            sections: Box::new([None; REGION_SIZE]),
            section_count: 0,
            storage: Default::default(),
            render_list: ChunkRenderList::new(),
            resources: None,
        }
    }

    /// Region coordinates of the region containing a section.
    #[inline]
    #[must_use]
    pub const fn key_of(section: SectionPos) -> SectionPos {
        SectionPos::new(
            section.x >> REGION_WIDTH_SH,
            section.y >> REGION_HEIGHT_SH,
            section.z >> REGION_LENGTH_SH,
        )
    }

    /// Region coordinates.
    #[inline]
    #[must_use]
    pub const fn pos(&self) -> SectionPos {
        self.pos
    }

    /// Section X of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn chunk_x(&self) -> i32 {
        self.pos.x << REGION_WIDTH_SH
    }

    /// Section Y of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn chunk_y(&self) -> i32 {
        self.pos.y << REGION_HEIGHT_SH
    }

    /// Section Z of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn chunk_z(&self) -> i32 {
        self.pos.z << REGION_LENGTH_SH
    }

    /// Block X of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_x(&self) -> i32 {
        self.chunk_x() << SECTION_SHIFT
    }

    /// Block Y of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_y(&self) -> i32 {
        self.chunk_y() << SECTION_SHIFT
    }

    /// Block Z of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_z(&self) -> i32 {
        self.chunk_z() << SECTION_SHIFT
    }

    /// Block coordinates of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn bounds_min(&self) -> [i32; 3] {
        [self.origin_x(), self.origin_y(), self.origin_z()]
    }

    /// Block coordinates of the maximum corner (exclusive).
    #[inline]
    #[must_use]
    pub const fn bounds_max(&self) -> [i32; 3] {
        [
            (self.chunk_x() + REGION_WIDTH) << SECTION_SHIFT,
            (self.chunk_y() + REGION_HEIGHT) << SECTION_SHIFT,
            (self.chunk_z() + REGION_LENGTH) << SECTION_SHIFT,
        ]
    }

    /// Places a section in its slot.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SlotOccupied`] if the slot holds a section.
    pub fn add_section(&mut self, index: LocalSectionIndex, section: SectionId) -> RenderResult<()> {
        let slot = &mut self.sections[index.as_usize()];
        if slot.is_some() {
            return Err(RenderError::SlotOccupied {
                region: self.pos,
                index: index.raw(),
            });
        }

        *slot = Some(section);
        self.section_count += 1;
        Ok(())
    }

    /// Clears a section's slot.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SlotEmpty`] if the slot is empty, or
    /// [`RenderError::SlotMismatch`] if it holds a different section.
    pub fn remove_section(&mut self, index: LocalSectionIndex, section: SectionId) -> RenderResult<()> {
        let slot = &mut self.sections[index.as_usize()];
        match *slot {
            None => Err(RenderError::SlotEmpty {
                region: self.pos,
                index: index.raw(),
            }),
            Some(current) if current != section => Err(RenderError::SlotMismatch {
                region: self.pos,
                index: index.raw(),
            }),
            Some(_) => {
                *slot = None;
                self.section_count -= 1;
                Ok(())
            }
        }
    }

    /// Section in a slot.
    #[inline]
    #[must_use]
    pub fn section(&self, index: LocalSectionIndex) -> Option<SectionId> {
        self.sections[index.as_usize()]
    }

    /// Occupied slots.
    #[inline]
    #[must_use]
    pub const fn section_count(&self) -> usize {
        self.section_count
    }

    /// Returns true if no slot is occupied.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.section_count == 0
    }

    /// Mesh directory of a pass, if any section has geometry for it.
    #[inline]
    #[must_use]
    pub fn storage(&self, pass: TerrainRenderPass) -> Option<&SectionRenderDataStorage> {
        self.storage[pass.ordinal()].as_ref()
    }

    /// Mesh directory of a pass, created on first use.
    pub fn create_storage(&mut self, pass: TerrainRenderPass) -> &mut SectionRenderDataStorage {
        self.storage[pass.ordinal()].get_or_insert_with(SectionRenderDataStorage::new)
    }

    /// Frame render list.
    #[inline]
    #[must_use]
    pub const fn render_list(&self) -> &ChunkRenderList {
        &self.render_list
    }

    /// Frame render list, mutably.
    #[inline]
    pub fn render_list_mut(&mut self) -> &mut ChunkRenderList {
        &mut self.render_list
    }

    /// GPU objects, if allocated.
    #[inline]
    #[must_use]
    pub const fn resources(&self) -> Option<&DeviceResources> {
        self.resources.as_ref()
    }

    /// GPU objects, mutably.
    #[inline]
    pub fn resources_mut(&mut self) -> Option<&mut DeviceResources> {
        self.resources.as_mut()
    }

    /// GPU objects, allocated on first use.
    pub fn create_resources<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        vertex_format: VertexFormat,
    ) -> &mut DeviceResources {
        let pos = self.pos;
        self.resources.get_or_insert_with(|| {
            debug!(region = ?pos, "Allocating region resources");
            DeviceResources::new(device, vertex_format)
        })
    }

    /// Removes a section's meshes from every pass and frees their arena space.
    pub fn remove_meshes(&mut self, index: LocalSectionIndex) {
        for storage in self.storage.iter_mut().flatten() {
            if let Some(allocation) = storage.remove_meshes(index) {
                if let Some(resources) = self.resources.as_mut() {
                    resources.geometry_arena_mut().free(allocation);
                }
            }
        }
    }

    /// Drops the cached tessellation after the arena moved to a new buffer.
    pub fn refresh<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(resources) = self.resources.as_mut() {
            resources.delete_tessellation(device);
        }
    }

    /// Frees the GPU objects once the arena holds nothing.
    pub fn update<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        let empty = self
            .resources
            .as_ref()
            .is_some_and(|resources| resources.geometry_arena().is_empty());

        if empty {
            self.delete_resources(device);
        }
    }

    /// Releases everything the region holds on the device.
    pub fn delete<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        self.delete_resources(device);
        self.storage = Default::default();
    }

    fn delete_resources<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        if let Some(resources) = self.resources.take() {
            debug!(region = ?self.pos, "Releasing region resources");
            resources.delete(device);
        }
        // Directory entries point into the arena that just went away.
        for storage in &mut self.storage {
            if storage.as_ref().is_some_and(SectionRenderDataStorage::is_empty) {
                *storage = None;
            }
        }
    }
}
