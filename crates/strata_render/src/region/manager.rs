//! # Region Manager
//!
//! Owns every [`RenderRegion`] and keeps them in step with the section graph:
//! a region is created with its first section and deleted with its last.
//! Completed mesh builds are uploaded through here.

use std::collections::HashMap;

use strata_core::{PoolAllocator, SectionPos};
use tracing::{debug, trace, warn};

use super::region::{RegionId, RenderRegion};
use crate::chunk::vertex::VertexFormat;
use crate::chunk::{ChunkBuildOutput, ChunkUpdateType, TerrainRenderPass};
use crate::device::RenderDevice;
use crate::error::{RenderError, RenderResult};
use crate::graph::{RenderSection, SectionGraph, SectionId};

/// All regions with at least one loaded section.
#[derive(Debug)]
pub struct RenderRegionManager {
    regions: PoolAllocator<RenderRegion>,
    by_position: HashMap<u64, RegionId>,
    vertex_format: VertexFormat,
}

impl RenderRegionManager {
    /// Creates a manager whose arenas hold vertices of `vertex_format`.
    #[must_use]
    pub fn new(vertex_format: VertexFormat) -> Self {
        Self {
            regions: PoolAllocator::new(64),
            by_position: HashMap::new(),
            vertex_format,
        }
    }

    /// Number of regions.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.regions.allocated_count()
    }

    /// Returns true if there are no regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Resolves a handle.
    #[inline]
    #[must_use]
    pub fn get(&self, id: RegionId) -> Option<&RenderRegion> {
        self.regions.get(id)
    }

    /// Resolves a handle mutably.
    #[inline]
    pub fn get_mut(&mut self, id: RegionId) -> Option<&mut RenderRegion> {
        self.regions.get_mut(id)
    }

    /// Looks up a region by region coordinates.
    #[must_use]
    pub fn find(&self, region_pos: SectionPos) -> Option<RegionId> {
        self.by_position.get(&region_pos.as_long()).copied()
    }

    /// Iterates every region.
    pub fn iter(&self) -> impl Iterator<Item = (RegionId, &RenderRegion)> {
        self.regions.iter()
    }

    fn get_or_create(&mut self, region_pos: SectionPos) -> RegionId {
        if let Some(id) = self.find(region_pos) {
            return id;
        }

        let id = self.regions.allocate(RenderRegion::new(region_pos));
        self.by_position.insert(region_pos.as_long(), id);
        debug!(region = ?region_pos, "Created render region");
        id
    }

    /// Creates the section at `pos`, links it into the graph and places it
    /// in its region.
    ///
    /// # Errors
    ///
    /// Fails if the section is already loaded or its region slot is taken.
    pub fn add_section(&mut self, graph: &mut SectionGraph, pos: SectionPos) -> RenderResult<SectionId> {
        if graph.find(pos).is_some() {
            return Err(RenderError::DuplicateSection(pos));
        }

        let region_id = self.get_or_create(RenderRegion::key_of(pos));
        let section = RenderSection::new(pos, region_id);
        let index = section.section_index();
        let id = graph.insert(section)?;

        self.regions
            .get_mut(region_id)
            .ok_or(RenderError::UnknownRegion(pos))?
            .add_section(index, id)?;

        Ok(id)
    }

    /// Unlinks the section at `pos`, frees its meshes and deletes its region
    /// if it was the last one there. Returns the removed section, or `None`
    /// if nothing was loaded at `pos`.
    ///
    /// # Errors
    ///
    /// Fails if the section's region does not hold it.
    pub fn remove_section<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        graph: &mut SectionGraph,
        pos: SectionPos,
    ) -> RenderResult<Option<RenderSection>> {
        let Some((id, mut section)) = graph.remove(pos) else {
            return Ok(None);
        };
        section.set_build_token(None);

        let region_id = section.region();
        let region = self
            .regions
            .get_mut(region_id)
            .ok_or(RenderError::UnknownRegion(pos))?;

        let index = section.section_index();
        region.remove_meshes(index);
        region.remove_section(index, id)?;
        region.update(device);

        if region.is_empty() {
            region.delete(device);
            let region_pos = region.pos();
            self.regions.free(region_id);
            self.by_position.remove(&region_pos.as_long());
            debug!(region = ?region_pos, "Deleted render region");
        }

        Ok(Some(section))
    }

    /// Uploads completed builds. Results for sections that were unloaded or
    /// whose build was cancelled are dropped. Returns how many were applied.
    ///
    /// A rejected result is not applied and its section is marked for
    /// rebuild; the remaining results are still uploaded.
    ///
    /// # Errors
    ///
    /// Returns the first rejection: malformed vertex data, or an arena that
    /// cannot grow.
    pub fn upload_meshes<D, I>(
        &mut self,
        device: &mut D,
        graph: &mut SectionGraph,
        outputs: I,
    ) -> RenderResult<usize>
    where
        D: RenderDevice + ?Sized,
        I: IntoIterator<Item = ChunkBuildOutput>,
    {
        let mut applied = 0;
        let mut first_error = None;

        for output in outputs {
            let Some(section) = graph.find(output.section).and_then(|id| graph.get_mut(id)) else {
                trace!(section = ?output.section, "Dropped build for unloaded section");
                continue;
            };

            // A cancelled or rejected build must not keep the section out
            // of the rebuild queues.
            section.finish_build(&output.token);

            if output.token.is_cancelled() {
                trace!(section = ?output.section, "Dropped cancelled build");
                continue;
            }

            match self.apply_output(device, section, &output) {
                Ok(()) => applied += 1,
                Err(error) => {
                    warn!(section = ?output.section, %error, "Rejected chunk build output");
                    section.set_pending_update(Some(ChunkUpdateType::promote(
                        section.pending_update(),
                        ChunkUpdateType::Rebuild,
                    )));
                    first_error.get_or_insert(error);
                }
            }
        }

        first_error.map_or(Ok(applied), Err)
    }

    fn apply_output<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        section: &mut RenderSection,
        output: &ChunkBuildOutput,
    ) -> RenderResult<()> {
        let stride = self.vertex_format.stride;
        for mesh in output.meshes.iter().flatten() {
            mesh.validate(stride)?;
        }

        let region = self
            .regions
            .get_mut(section.region())
            .ok_or(RenderError::UnknownRegion(output.section))?;

        let index = section.section_index();
        region.remove_meshes(index);
        section.set_visibility_data(output.visibility_data);

        let mut resized = false;
        let mut result = Ok(());
        for pass in TerrainRenderPass::ALL {
            section.set_slice_mask(pass, 0);

            let Some(mesh) = output.meshes[pass.ordinal()]
                .as_ref()
                .filter(|mesh| mesh.slice_mask() != 0)
            else {
                continue;
            };

            let upload = match region
                .create_resources(device, self.vertex_format)
                .geometry_arena_mut()
                .upload(device, &mesh.vertex_data)
            {
                Ok(upload) => upload,
                Err(error) => {
                    result = Err(error);
                    break;
                }
            };
            resized |= upload.resized;

            region.create_storage(pass).set_meshes(index, upload.allocation, mesh);
            section.set_slice_mask(pass, mesh.slice_mask());
        }

        if result.is_err() {
            region.remove_meshes(index);
            for pass in TerrainRenderPass::ALL {
                section.set_slice_mask(pass, 0);
            }
        }

        if resized {
            region.refresh(device);
        }
        region.update(device);
        result
    }

    /// Releases every region's device resources and forgets all regions.
    pub fn delete<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        for (_, region) in self.regions.iter_mut() {
            region.delete(device);
        }
        self.regions.clear();
        self.by_position.clear();
    }
}
