//! # Default Chunk Renderer
//!
//! Turns the frame's render lists into draw calls, one per region and pass.
//!
//! ```text
//!   for region in lists (back to front for translucent):
//!       batch ← (base vertex, element count) per visible facing bucket
//!       ensure shared index buffer ≥ largest element count
//!       bind region tessellation, set region offset
//!       multi-draw batch
//! ```
//!
//! Every command indexes the shared quad pattern from index zero; the base
//! vertex selects the bucket's vertices inside the region's arena.

use tracing::trace;

use super::batch::MultiDrawBatch;
use super::facing::ModelQuadFacing;
use super::index_buffer::{IndexType, SharedQuadIndexBuffer};
use super::pass::TerrainRenderPass;
use crate::culling::CameraTransform;
use crate::device::{ChunkRenderMatrices, RenderDevice};
use crate::error::RenderResult;
use crate::lists::SortedRenderLists;
use crate::region::{RenderRegion, RenderRegionManager, SectionRenderDataStorage, REGION_SIZE};
use crate::stats::RenderStats;

/// Worst-case batch: every bucket of every slot, with headroom.
const COMMAND_BUFFER_CAPACITY: usize = ModelQuadFacing::COUNT * REGION_SIZE * 2;

/// Blocks beyond a face plane the camera may be before that face is culled.
const FACE_CULLING_MARGIN: i32 = 3;

/// Batched renderer over the shared quad index buffer.
#[derive(Debug)]
pub struct DefaultChunkRenderer {
    batch: MultiDrawBatch,
    index_buffer: SharedQuadIndexBuffer,
}

impl DefaultChunkRenderer {
    /// Creates a renderer drawing with indices of `index_type`.
    pub fn new<D: RenderDevice + ?Sized>(device: &mut D, index_type: IndexType) -> Self {
        Self {
            batch: MultiDrawBatch::new(COMMAND_BUFFER_CAPACITY),
            index_buffer: SharedQuadIndexBuffer::new(device, index_type),
        }
    }

    /// Shared index buffer.
    #[must_use]
    pub const fn index_buffer(&self) -> &SharedQuadIndexBuffer {
        &self.index_buffer
    }

    /// Draws one pass over the frame's render lists.
    ///
    /// # Errors
    ///
    /// Fails if a batch needs more indices than the index width can address.
    #[allow(clippy::too_many_arguments)]
    pub fn render<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        regions: &mut RenderRegionManager,
        lists: &SortedRenderLists,
        pass: TerrainRenderPass,
        matrices: &ChunkRenderMatrices,
        camera: &CameraTransform,
        use_block_face_culling: bool,
    ) -> RenderResult<RenderStats> {
        let mut stats = RenderStats::default();

        device.begin_pass(pass, matrices);
        let result = self.draw_regions(
            device,
            regions,
            lists,
            pass,
            camera,
            use_block_face_culling,
            &mut stats,
        );
        device.end_pass();
        self.batch.clear();

        trace!(
            pass = pass.label(),
            draw_calls = stats.draw_calls,
            draw_commands = stats.draw_commands,
            "Rendered terrain pass"
        );
        result.map(|()| stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_regions<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        regions: &mut RenderRegionManager,
        lists: &SortedRenderLists,
        pass: TerrainRenderPass,
        camera: &CameraTransform,
        use_block_face_culling: bool,
        stats: &mut RenderStats,
    ) -> RenderResult<()> {
        let multi_draw = device.capabilities().multi_draw;

        for region_id in lists.iter(pass.is_reverse_order()) {
            let Some(region) = regions.get_mut(region_id) else {
                continue;
            };
            let Some(storage) = region.storage(pass) else {
                stats.regions_skipped += 1;
                continue;
            };

            fill_command_buffer(
                &mut self.batch,
                region,
                storage,
                camera,
                pass,
                use_block_face_culling,
            );

            if self.batch.is_empty() {
                stats.regions_skipped += 1;
                continue;
            }

            self.index_buffer
                .ensure_capacity(device, self.batch.index_buffer_size())?;

            let offset = region_offset(region, camera);
            let Some(resources) = region.resources_mut() else {
                stats.regions_skipped += 1;
                continue;
            };
            let tessellation = resources.prepare_tessellation(
                device,
                self.index_buffer.buffer(),
                self.index_buffer.index_type(),
            );

            device.set_region_offset(offset);

            let index_type = self.index_buffer.index_type();
            let commands = self.batch.commands();
            if multi_draw {
                device.multi_draw_elements_base_vertex(tessellation, index_type, commands);
                stats.draw_calls += 1;
            } else {
                for command in commands {
                    device.draw_elements_base_vertex(tessellation, index_type, *command);
                    stats.draw_calls += 1;
                }
            }

            #[allow(clippy::cast_possible_truncation)]
            {
                stats.draw_commands += commands.len() as u32;
            }
        }

        Ok(())
    }

    /// Releases the shared index buffer.
    pub fn delete<D: RenderDevice + ?Sized>(self, device: &mut D) {
        self.index_buffer.delete(device);
    }
}

#[allow(clippy::cast_possible_wrap)]
fn fill_command_buffer(
    batch: &mut MultiDrawBatch,
    region: &RenderRegion,
    storage: &SectionRenderDataStorage,
    camera: &CameraTransform,
    pass: TerrainRenderPass,
    use_block_face_culling: bool,
) {
    batch.clear();

    let visible = if use_block_face_culling {
        visible_faces(camera, region.bounds_min(), region.bounds_max())
    } else {
        ModelQuadFacing::ALL
    };

    for index in region
        .render_list()
        .sections_with_geometry(pass.is_reverse_order())
    {
        let data = storage.get(index);
        let slices = visible & data.slices();
        if slices == 0 {
            continue;
        }

        for facing in ModelQuadFacing::VALUES {
            if slices & facing.bit() != 0 {
                batch.push(
                    data.vertex_offset[facing.ordinal()] as i32,
                    data.element_count[facing.ordinal()],
                );
            }
        }
    }
}

/// Facing buckets that can face the camera, given the block bounds
/// `min..max` of the geometry. Unassigned geometry is always included.
#[must_use]
pub fn visible_faces(camera: &CameraTransform, min: [i32; 3], max: [i32; 3]) -> u8 {
    let (x, y, z) = (camera.int_x, camera.int_y, camera.int_z);
    let mut planes = ModelQuadFacing::Unassigned.bit();

    if x > min[0] - FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::PosX.bit();
    }
    if y > min[1] - FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::PosY.bit();
    }
    if z > min[2] - FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::PosZ.bit();
    }

    if x < max[0] + FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::NegX.bit();
    }
    if y < max[1] + FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::NegY.bit();
    }
    if z < max[2] + FACE_CULLING_MARGIN {
        planes |= ModelQuadFacing::NegZ.bit();
    }

    planes
}

/// Translation from camera space to the region's local space.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn region_offset(region: &RenderRegion, camera: &CameraTransform) -> [f32; 3] {
    [
        (region.origin_x() - camera.int_x) as f32 - camera.frac_x,
        (region.origin_y() - camera.int_y) as f32 - camera.frac_y,
        (region.origin_z() - camera.int_z) as f32 - camera.frac_z,
    ]
}

#[cfg(test)]
mod tests {
    use strata_core::SectionPos;

    use super::*;

    #[test]
    fn test_camera_inside_bounds_sees_all_faces() {
        let camera = CameraTransform::new(40.5, 70.0, 100.25);
        assert_eq!(visible_faces(&camera, [0, 64, 0], [128, 128, 128]), ModelQuadFacing::ALL);
    }

    #[test]
    fn test_camera_outside_bounds_culls_far_faces() {
        // Well above and east of the box.
        let camera = CameraTransform::new(200.0, 300.0, 64.0);
        let faces = visible_faces(&camera, [0, 0, 0], [128, 64, 128]);

        assert_ne!(faces & ModelQuadFacing::PosX.bit(), 0);
        assert_ne!(faces & ModelQuadFacing::PosY.bit(), 0);
        assert_eq!(faces & ModelQuadFacing::NegX.bit(), 0);
        assert_eq!(faces & ModelQuadFacing::NegY.bit(), 0);
        assert_ne!(faces & ModelQuadFacing::PosZ.bit(), 0);
        assert_ne!(faces & ModelQuadFacing::NegZ.bit(), 0);
        assert_ne!(faces & ModelQuadFacing::Unassigned.bit(), 0);
    }

    #[test]
    fn test_margin_keeps_faces_near_the_plane() {
        // Two blocks below the box still sees its downward faces and,
        // within the margin, its upward ones.
        let camera = CameraTransform::new(8.0, -2.0, 8.0);
        let faces = visible_faces(&camera, [0, 0, 0], [16, 16, 16]);
        assert_ne!(faces & ModelQuadFacing::NegY.bit(), 0);
        assert_ne!(faces & ModelQuadFacing::PosY.bit(), 0);

        let camera = CameraTransform::new(8.0, -3.0, 8.0);
        let faces = visible_faces(&camera, [0, 0, 0], [16, 16, 16]);
        assert_eq!(faces & ModelQuadFacing::PosY.bit(), 0);
    }

    #[test]
    fn test_region_offset_subtracts_fraction() {
        let region = RenderRegion::new(SectionPos::new(1, 0, -1));
        let camera = CameraTransform::new(100.25, 10.5, -3.75);

        let offset = region_offset(&region, &camera);
        assert!((offset[0] - (128.0 - 100.0 - 0.25)).abs() < 1e-5);
        assert!((offset[1] - (0.0 - 10.0 - 0.5)).abs() < 1e-5);
        assert!((offset[2] - (-128.0 + 4.0 - 0.25)).abs() < 1e-5);
    }
}
