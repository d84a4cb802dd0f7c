//! # Render Section Manager
//!
//! Front door of the terrain renderer. Owns the section graph, the regions,
//! the culler and the chunk renderer, and runs them in frame order:
//!
//! ```text
//!   world events ─► on_section_added / on_section_removed / schedule_rebuild
//!   build workers ─► build_result_sender ─► upload_meshes
//!
//!   per frame:  update(viewport, frame)      traversal + collection
//!               render_layer(pass) × 3       batched draws
//! ```
//!
//! Everything runs on the render thread. The only cross-thread edge is the
//! build result channel.

use crossbeam_channel::{Receiver, Sender};
use strata_core::SectionPos;
use tracing::{debug, info, trace};

use crate::chunk::vertex::COMPACT_FORMAT;
use crate::chunk::{
    CancellationToken, ChunkBuildOutput, ChunkBuildTask, ChunkUpdateType, DefaultChunkRenderer,
    TerrainRenderPass,
};
use crate::config::RendererConfig;
use crate::culling::{CameraTransform, OcclusionCuller, TraversalParams, Viewport};
use crate::device::{ChunkRenderMatrices, RenderDevice};
use crate::error::RenderResult;
use crate::graph::{RenderSection, SectionGraph, SectionId};
use crate::lists::{RebuildQueues, SortedRenderLists, VisibleChunkCollector};
use crate::region::RenderRegionManager;
use crate::stats::RenderStats;

/// Terrain renderer state for one world.
#[derive(Debug)]
pub struct RenderSectionManager {
    config: RendererConfig,

    graph: SectionGraph,
    regions: RenderRegionManager,
    culler: OcclusionCuller,
    renderer: DefaultChunkRenderer,

    sorted_render_lists: SortedRenderLists,
    rebuild_queues: RebuildQueues,

    build_results_tx: Sender<ChunkBuildOutput>,
    build_results_rx: Receiver<ChunkBuildOutput>,

    camera: CameraTransform,
    stats: RenderStats,
}

impl RenderSectionManager {
    /// Creates an empty renderer.
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate.
    pub fn new<D: RenderDevice + ?Sized>(device: &mut D, config: RendererConfig) -> RenderResult<Self> {
        config.validate()?;

        let (build_results_tx, build_results_rx) = crossbeam_channel::unbounded();

        info!(
            render_distance = config.render_distance,
            occlusion_culling = config.use_occlusion_culling,
            face_culling = config.use_block_face_culling,
            index_type = ?config.index_type,
            "Terrain renderer initialized"
        );

        Ok(Self {
            graph: SectionGraph::new(),
            regions: RenderRegionManager::new(COMPACT_FORMAT),
            culler: OcclusionCuller::new(),
            renderer: DefaultChunkRenderer::new(device, config.index_type),
            sorted_render_lists: SortedRenderLists::new(),
            rebuild_queues: RebuildQueues::new(config.rebuild_limits),
            build_results_tx,
            build_results_rx,
            camera: CameraTransform::default(),
            stats: RenderStats::default(),
            config,
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Section graph.
    #[must_use]
    pub const fn graph(&self) -> &SectionGraph {
        &self.graph
    }

    /// Regions.
    #[must_use]
    pub const fn regions(&self) -> &RenderRegionManager {
        &self.regions
    }

    /// Section at a grid position, if loaded.
    #[must_use]
    pub fn section(&self, pos: SectionPos) -> Option<&RenderSection> {
        self.graph.find(pos).and_then(|id| self.graph.get(id))
    }

    /// Loads a section and queues its first build.
    ///
    /// # Errors
    ///
    /// Fails if the section is already loaded.
    pub fn on_section_added(&mut self, pos: SectionPos) -> RenderResult<SectionId> {
        let id = self.regions.add_section(&mut self.graph, pos)?;
        if let Some(section) = self.graph.get_mut(id) {
            section.set_pending_update(Some(ChunkUpdateType::InitialBuild));
        }

        debug!(?pos, "Section added");
        Ok(id)
    }

    /// Unloads a section, cancelling its build and freeing its geometry.
    /// Returns false if nothing was loaded at `pos`.
    ///
    /// # Errors
    ///
    /// Fails if the section's region bookkeeping is inconsistent.
    pub fn on_section_removed<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        pos: SectionPos,
    ) -> RenderResult<bool> {
        let removed = self.regions.remove_section(device, &mut self.graph, pos)?;
        if removed.is_some() {
            debug!(?pos, "Section removed");
        }
        Ok(removed.is_some())
    }

    /// Marks a section as needing a new mesh. A pending update is only ever
    /// made more urgent. Returns false if the section is not loaded.
    pub fn schedule_rebuild(&mut self, pos: SectionPos, important: bool) -> bool {
        let Some(section) = self.graph.find(pos).and_then(|id| self.graph.get_mut(id)) else {
            return false;
        };

        let requested = if important {
            ChunkUpdateType::ImportantRebuild
        } else {
            ChunkUpdateType::Rebuild
        };
        section.set_pending_update(Some(ChunkUpdateType::promote(section.pending_update(), requested)));
        true
    }

    /// Drops a section's pending update and cancels its in-flight build.
    /// Returns false if the section is not loaded.
    pub fn cancel_rebuild(&mut self, pos: SectionPos) -> bool {
        let Some(section) = self.graph.find(pos).and_then(|id| self.graph.get_mut(id)) else {
            return false;
        };

        section.set_pending_update(None);
        section.set_build_token(None);
        true
    }

    /// Claims a queued section for a build worker: clears its pending update
    /// and arms a fresh cancellation token. Returns `None` if the section is
    /// gone or has nothing pending.
    pub fn begin_build(&mut self, id: SectionId) -> Option<ChunkBuildTask> {
        let section = self.graph.get_mut(id)?;
        let update = section.pending_update()?;

        let token = CancellationToken::new();
        section.set_pending_update(None);
        section.set_build_token(Some(token.clone()));

        trace!(section = ?section.pos(), ?update, "Build started");
        Some(ChunkBuildTask {
            section: section.pos(),
            update,
            token,
        })
    }

    /// Channel end for build workers to deliver results on.
    #[must_use]
    pub fn build_result_sender(&self) -> Sender<ChunkBuildOutput> {
        self.build_results_tx.clone()
    }

    /// Uploads every build result delivered so far. Returns how many were
    /// applied; stale results are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first rejection (malformed vertex data, or an arena that
    /// cannot grow) after every delivered result has been handled. Rejected
    /// sections are scheduled for rebuild.
    pub fn upload_meshes<D: RenderDevice + ?Sized>(&mut self, device: &mut D) -> RenderResult<usize> {
        let applied = self.regions.upload_meshes(
            device,
            &mut self.graph,
            self.build_results_rx.try_iter(),
        )?;

        if applied > 0 {
            trace!(applied, "Uploaded chunk meshes");
        }
        Ok(applied)
    }

    /// Runs the visibility traversal for a frame and rebuilds the render
    /// lists and rebuild queues. `frame` must change every call.
    pub fn update(&mut self, viewport: &Viewport, frame: u32) {
        let params = TraversalParams {
            search_distance: self.config.render_distance,
            use_occlusion_culling: self.config.use_occlusion_culling,
            bottom_section_y: self.config.world_min_section_y,
            top_section_y: self.config.world_max_section_y,
        };

        let mut collector = VisibleChunkCollector::new(
            &mut self.regions,
            &mut self.sorted_render_lists,
            &mut self.rebuild_queues,
            frame,
        );
        self.culler
            .find_visible(&mut self.graph, &mut collector, viewport, &params, frame);
        let (visited, visible) = (collector.visited(), collector.visible());

        let listed: usize = self
            .sorted_render_lists
            .iter(false)
            .filter_map(|id| self.regions.get(id))
            .map(|region| region.render_list().len())
            .sum();

        #[allow(clippy::cast_possible_truncation)]
        {
            self.stats = RenderStats {
                sections_visited: visited,
                sections_visible: visible,
                render_lists: self.sorted_render_lists.len() as u32,
                sections_listed: listed as u32,
                ..RenderStats::default()
            };
        }
        self.camera = *viewport.transform();

        trace!(
            frame,
            visited,
            visible,
            regions = self.sorted_render_lists.len(),
            queued = self.rebuild_queues.len(),
            "Visibility updated"
        );
    }

    /// Regions to draw this frame, in traversal order.
    #[must_use]
    pub const fn render_lists(&self) -> &SortedRenderLists {
        &self.sorted_render_lists
    }

    /// Sections waiting for a build, by kind.
    #[must_use]
    pub const fn rebuild_queues(&self) -> &RebuildQueues {
        &self.rebuild_queues
    }

    /// Sections waiting for a build, for the scheduler to drain.
    pub fn rebuild_queues_mut(&mut self) -> &mut RebuildQueues {
        &mut self.rebuild_queues
    }

    /// Draws one pass from the last [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// Fails if a draw needs more indices than the index width can address.
    pub fn render_layer<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        pass: TerrainRenderPass,
        matrices: &ChunkRenderMatrices,
    ) -> RenderResult<RenderStats> {
        let pass_stats = self.renderer.render(
            device,
            &mut self.regions,
            &self.sorted_render_lists,
            pass,
            matrices,
            &self.camera,
            self.config.use_block_face_culling,
        )?;

        self.stats.add_draw_counters(&pass_stats);
        Ok(pass_stats)
    }

    /// Counters of the current frame.
    #[must_use]
    pub const fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Releases every device object.
    pub fn destroy<D: RenderDevice + ?Sized>(mut self, device: &mut D) {
        self.regions.delete(device);
        self.graph.clear();
        self.renderer.delete(device);
        debug!("Terrain renderer destroyed");
    }
}
