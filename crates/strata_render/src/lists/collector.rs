//! # Visible Chunk Collector
//!
//! The traversal visitor. Buckets every reached section into its region's
//! render list and every section waiting for a mesh into a rebuild queue.
//!
//! ```text
//!   OcclusionCuller ──visit(id, section, visible)──► VisibleChunkCollector
//!                                                     ├─► SortedRenderLists
//!                                                     └─► RebuildQueues[kind]
//! ```

use std::collections::VecDeque;

use super::render_list::SortedRenderLists;
use crate::chunk::ChunkUpdateType;
use crate::config::RebuildQueueLimits;
use crate::culling::Visitor;
use crate::graph::{RenderSection, SectionId};
use crate::region::RenderRegionManager;

/// Sections waiting for a build, one bounded queue per update kind.
#[derive(Debug, Clone)]
pub struct RebuildQueues {
    queues: [VecDeque<SectionId>; ChunkUpdateType::COUNT],
    limits: RebuildQueueLimits,
}

impl RebuildQueues {
    /// Empty queues with the given size limits.
    #[must_use]
    pub fn new(limits: RebuildQueueLimits) -> Self {
        Self {
            queues: Default::default(),
            limits,
        }
    }

    /// Empties every queue.
    pub fn clear(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
    }

    /// Appends a section unless its queue is full. Returns true if queued.
    pub fn push(&mut self, kind: ChunkUpdateType, section: SectionId) -> bool {
        let queue = &mut self.queues[kind.ordinal()];
        if queue.len() >= self.limits.limit(kind) as usize {
            return false;
        }

        queue.push_back(section);
        true
    }

    /// Takes the next section of a kind.
    pub fn pop(&mut self, kind: ChunkUpdateType) -> Option<SectionId> {
        self.queues[kind.ordinal()].pop_front()
    }

    /// Queue of a kind, in discovery order.
    #[must_use]
    pub fn get(&self, kind: ChunkUpdateType) -> &VecDeque<SectionId> {
        &self.queues[kind.ordinal()]
    }

    /// Sections queued across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }
}

/// Visitor that fills the frame's render lists and rebuild queues.
#[derive(Debug)]
pub struct VisibleChunkCollector<'a> {
    regions: &'a mut RenderRegionManager,
    sorted_render_lists: &'a mut SortedRenderLists,
    rebuild_queues: &'a mut RebuildQueues,
    frame: u32,
    visited: u32,
    visible: u32,
}

impl<'a> VisibleChunkCollector<'a> {
    /// Clears the outputs and starts collecting for `frame`.
    pub fn new(
        regions: &'a mut RenderRegionManager,
        sorted_render_lists: &'a mut SortedRenderLists,
        rebuild_queues: &'a mut RebuildQueues,
        frame: u32,
    ) -> Self {
        sorted_render_lists.clear();
        rebuild_queues.clear();

        Self {
            regions,
            sorted_render_lists,
            rebuild_queues,
            frame,
            visited: 0,
            visible: 0,
        }
    }

    /// Sections reported by the traversal.
    #[must_use]
    pub const fn visited(&self) -> u32 {
        self.visited
    }

    /// Sections reported as visible.
    #[must_use]
    pub const fn visible(&self) -> u32 {
        self.visible
    }
}

impl Visitor for VisibleChunkCollector<'_> {
    fn visit(&mut self, id: SectionId, section: &RenderSection, visible: bool) {
        self.visited += 1;
        let pending_update = section.pending_update();

        if !visible && pending_update.is_none() {
            return;
        }

        let Some(region) = self.regions.get_mut(section.region()) else {
            return;
        };

        let render_list = region.render_list_mut();
        if render_list.last_visible_frame() != self.frame {
            render_list.reset(self.frame);
            self.sorted_render_lists.push(section.region());
        }

        if visible {
            self.visible += 1;
            if section.has_geometry() {
                render_list.add(section.section_index());
            }
        }

        if let Some(kind) = pending_update {
            if !section.has_build_in_flight() {
                self.rebuild_queues.push(kind, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use strata_core::SectionPos;

    use super::*;
    use crate::chunk::vertex::COMPACT_FORMAT;
    use crate::chunk::{CancellationToken, TerrainRenderPass};
    use crate::graph::SectionGraph;

    struct Fixture {
        graph: SectionGraph,
        regions: RenderRegionManager,
        lists: SortedRenderLists,
        queues: RebuildQueues,
    }

    impl Fixture {
        fn new(limits: RebuildQueueLimits) -> Self {
            Self {
                graph: SectionGraph::new(),
                regions: RenderRegionManager::new(COMPACT_FORMAT),
                lists: SortedRenderLists::new(),
                queues: RebuildQueues::new(limits),
            }
        }

        fn add(&mut self, x: i32, y: i32, z: i32) -> SectionId {
            self.regions
                .add_section(&mut self.graph, SectionPos::new(x, y, z))
                .unwrap()
        }

        fn visit_all(&mut self, visits: &[(SectionId, bool)], frame: u32) {
            let mut collector =
                VisibleChunkCollector::new(&mut self.regions, &mut self.lists, &mut self.queues, frame);
            for &(id, visible) in visits {
                let section = self.graph.get(id).unwrap();
                collector.visit(id, section, visible);
            }
        }
    }

    #[test]
    fn test_lists_follow_discovery_order() {
        let mut fixture = Fixture::new(RebuildQueueLimits::default());
        let near = fixture.add(0, 0, 0);
        let far = fixture.add(9, 0, 0);
        let near_too = fixture.add(1, 0, 0);
        for id in [near, far, near_too] {
            fixture
                .graph
                .get_mut(id)
                .unwrap()
                .set_slice_mask(TerrainRenderPass::Solid, 1);
        }

        fixture.visit_all(&[(near, true), (far, true), (near_too, true)], 0);

        let regions: Vec<_> = fixture.lists.iter(false).collect();
        assert_eq!(regions.len(), 2);
        let first = fixture.regions.get(regions[0]).unwrap();
        assert_eq!(first.pos(), SectionPos::new(0, 0, 0));
        assert_eq!(first.render_list().len(), 2);
    }

    #[test]
    fn test_invisible_sections_only_feed_rebuilds() {
        let mut fixture = Fixture::new(RebuildQueueLimits::default());
        let hidden = fixture.add(0, 0, 0);
        let idle = fixture.add(1, 0, 0);
        fixture
            .graph
            .get_mut(hidden)
            .unwrap()
            .set_pending_update(Some(ChunkUpdateType::InitialBuild));
        fixture
            .graph
            .get_mut(hidden)
            .unwrap()
            .set_slice_mask(TerrainRenderPass::Solid, 1);

        fixture.visit_all(&[(hidden, false), (idle, false)], 0);

        assert_eq!(fixture.lists.len(), 1);
        let region = fixture.regions.get(fixture.lists.iter(false).next().unwrap()).unwrap();
        assert!(region.render_list().is_empty());
        assert_eq!(
            fixture.queues.get(ChunkUpdateType::InitialBuild).iter().copied().collect::<Vec<_>>(),
            vec![hidden]
        );
    }

    #[test]
    fn test_queue_limits_and_in_flight_builds() {
        let limits = RebuildQueueLimits {
            initial_build: 2,
            ..RebuildQueueLimits::default()
        };
        let mut fixture = Fixture::new(limits);

        let mut visits = Vec::new();
        for x in 0..4 {
            let id = fixture.add(x, 0, 0);
            let section = fixture.graph.get_mut(id).unwrap();
            section.set_pending_update(Some(ChunkUpdateType::InitialBuild));
            if x == 0 {
                section.set_build_token(Some(CancellationToken::new()));
            }
            visits.push((id, true));
        }

        fixture.visit_all(&visits, 0);

        let queued = fixture.queues.get(ChunkUpdateType::InitialBuild);
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[0], visits[1].0);
        assert_eq!(fixture.queues.len(), 2);
    }

    #[test]
    fn test_render_list_resets_each_frame() {
        let mut fixture = Fixture::new(RebuildQueueLimits::default());
        let id = fixture.add(0, 0, 0);
        fixture
            .graph
            .get_mut(id)
            .unwrap()
            .set_slice_mask(TerrainRenderPass::Cutout, 1);

        fixture.visit_all(&[(id, true)], 0);
        fixture.visit_all(&[(id, true)], 1);

        let region = fixture.regions.get(fixture.lists.iter(false).next().unwrap()).unwrap();
        assert_eq!(region.render_list().len(), 1);
        assert_eq!(region.render_list().last_visible_frame(), 1);
    }

    #[test]
    fn test_cancelled_build_does_not_block_requeue() {
        let mut fixture = Fixture::new(RebuildQueueLimits::default());
        let id = fixture.add(0, 0, 0);

        let token = CancellationToken::new();
        let section = fixture.graph.get_mut(id).unwrap();
        section.set_pending_update(Some(ChunkUpdateType::Rebuild));
        section.set_build_token(Some(token.clone()));
        token.cancel();

        fixture.visit_all(&[(id, true)], 0);

        assert_eq!(
            fixture.queues.get(ChunkUpdateType::Rebuild).iter().copied().collect::<Vec<_>>(),
            vec![id]
        );
    }
}
