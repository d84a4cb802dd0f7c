//! # Render Sections
//!
//! Nodes of the section graph and the arena that owns them.
//!
//! Adjacency is stored as pool handles resolved through [`SectionGraph`], so
//! a section never owns its neighbors. The graph keeps links symmetric: if
//! `a` points north to `b`, then `b` points south to `a`.

use std::collections::HashMap;

use strata_core::{PoolAllocator, PoolHandle, SectionPos, SECTION_SIZE};
use tracing::trace;

use super::direction::{GraphDirection, GraphDirectionSet};
use super::visibility::VisibilityEncoding;
use crate::chunk::{CancellationToken, ChunkUpdateType, TerrainRenderPass};
use crate::error::{RenderError, RenderResult};
use crate::region::{LocalSectionIndex, RegionId};

/// Handle of a section in the [`SectionGraph`].
pub type SectionId = PoolHandle;

/// Frame value that never matches a real frame counter.
const NEVER_VISIBLE: u32 = u32::MAX;

/// One 16³ block section of the world.
#[derive(Debug)]
pub struct RenderSection {
    pos: SectionPos,
    region: RegionId,
    section_index: LocalSectionIndex,

    adjacent: [Option<SectionId>; GraphDirection::COUNT],
    adjacent_mask: GraphDirectionSet,

    visibility_data: u64,
    slice_masks: [u8; TerrainRenderPass::COUNT],

    last_visible_frame: u32,
    incoming_directions: GraphDirectionSet,

    pending_update: Option<ChunkUpdateType>,
    build_token: Option<CancellationToken>,
}

impl RenderSection {
    /// Creates an unlinked section with no geometry.
    #[must_use]
    pub fn new(pos: SectionPos, region: RegionId) -> Self {
        Self {
            pos,
            region,
            section_index: LocalSectionIndex::from_section(pos),
            adjacent: [None; GraphDirection::COUNT],
            adjacent_mask: GraphDirectionSet::NONE,
            visibility_data: VisibilityEncoding::NULL,
            slice_masks: [0; TerrainRenderPass::COUNT],
            last_visible_frame: NEVER_VISIBLE,
            incoming_directions: GraphDirectionSet::NONE,
            pending_update: None,
            build_token: None,
        }
    }

    /// Grid position.
    #[inline]
    #[must_use]
    pub const fn pos(&self) -> SectionPos {
        self.pos
    }

    /// Region holding this section.
    #[inline]
    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    /// Slot of the section inside its region.
    #[inline]
    #[must_use]
    pub const fn section_index(&self) -> LocalSectionIndex {
        self.section_index
    }

    /// Block X of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_x(&self) -> i32 {
        self.pos.min_block_x()
    }

    /// Block Y of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_y(&self) -> i32 {
        self.pos.min_block_y()
    }

    /// Block Z of the minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin_z(&self) -> i32 {
        self.pos.min_block_z()
    }

    /// Center of the section in block coordinates.
    #[inline]
    #[must_use]
    pub fn center(&self) -> [f64; 3] {
        let half = f64::from(SECTION_SIZE / 2);
        [
            f64::from(self.origin_x()) + half,
            f64::from(self.origin_y()) + half,
            f64::from(self.origin_z()) + half,
        ]
    }

    /// Neighbor in the given direction, if loaded.
    #[inline]
    #[must_use]
    pub const fn adjacent(&self, direction: GraphDirection) -> Option<SectionId> {
        self.adjacent[direction.ordinal()]
    }

    /// Directions with a loaded neighbor.
    #[inline]
    #[must_use]
    pub const fn adjacent_mask(&self) -> GraphDirectionSet {
        self.adjacent_mask
    }

    fn set_adjacent(&mut self, direction: GraphDirection, neighbor: Option<SectionId>) {
        self.adjacent[direction.ordinal()] = neighbor;
        self.adjacent_mask = if neighbor.is_some() {
            self.adjacent_mask.with(direction)
        } else {
            self.adjacent_mask.without(direction)
        };
    }

    /// Face-to-face visibility of the section.
    #[inline]
    #[must_use]
    pub const fn visibility_data(&self) -> u64 {
        self.visibility_data
    }

    /// Replaces the visibility encoding after a rebuild.
    pub fn set_visibility_data(&mut self, data: u64) {
        self.visibility_data = data;
    }

    /// Facing buckets with geometry for a pass.
    #[inline]
    #[must_use]
    pub const fn slice_mask(&self, pass: TerrainRenderPass) -> u8 {
        self.slice_masks[pass.ordinal()]
    }

    /// Records which facing buckets have geometry for a pass.
    pub fn set_slice_mask(&mut self, pass: TerrainRenderPass, mask: u8) {
        self.slice_masks[pass.ordinal()] = mask;
    }

    /// Returns true if any pass has geometry.
    #[inline]
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.slice_masks.iter().any(|mask| *mask != 0)
    }

    /// Frame in which the section was last reached.
    #[inline]
    #[must_use]
    pub const fn last_visible_frame(&self) -> u32 {
        self.last_visible_frame
    }

    /// Marks the section as reached in a frame.
    #[inline]
    pub fn set_last_visible_frame(&mut self, frame: u32) {
        self.last_visible_frame = frame;
    }

    /// Faces the traversal entered through this frame.
    #[inline]
    #[must_use]
    pub const fn incoming_directions(&self) -> GraphDirectionSet {
        self.incoming_directions
    }

    /// Overwrites the incoming accumulator.
    #[inline]
    pub fn set_incoming_directions(&mut self, directions: GraphDirectionSet) {
        self.incoming_directions = directions;
    }

    /// Adds to the incoming accumulator.
    #[inline]
    pub fn add_incoming_directions(&mut self, directions: GraphDirectionSet) {
        self.incoming_directions |= directions;
    }

    /// Kind of rebuild the section is waiting for.
    #[inline]
    #[must_use]
    pub const fn pending_update(&self) -> Option<ChunkUpdateType> {
        self.pending_update
    }

    /// Sets or clears the pending rebuild.
    pub fn set_pending_update(&mut self, update: Option<ChunkUpdateType>) {
        self.pending_update = update;
    }

    /// Token of the in-flight build, if one was started.
    #[inline]
    #[must_use]
    pub const fn build_token(&self) -> Option<&CancellationToken> {
        self.build_token.as_ref()
    }

    /// Returns true if a build has been started and not yet cancelled or finished.
    #[must_use]
    pub fn has_build_in_flight(&self) -> bool {
        self.build_token
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Replaces the in-flight build token, cancelling the previous one.
    pub fn set_build_token(&mut self, token: Option<CancellationToken>) {
        if let Some(previous) = self.build_token.take() {
            previous.cancel();
        }
        self.build_token = token;
    }

    /// Drops the token of a build that has delivered its results.
    pub fn finish_build(&mut self, token: &CancellationToken) {
        if self
            .build_token
            .as_ref()
            .is_some_and(|current| current.same_build(token))
        {
            self.build_token = None;
        }
    }
}

/// Arena of sections keyed by grid position.
#[derive(Debug, Default)]
pub struct SectionGraph {
    sections: PoolAllocator<RenderSection>,
    by_position: HashMap<u64, SectionId>,
}

impl SectionGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of loaded sections.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.sections.allocated_count()
    }

    /// Returns true if no section is loaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Looks up the section at a grid position.
    #[inline]
    #[must_use]
    pub fn find(&self, pos: SectionPos) -> Option<SectionId> {
        self.by_position.get(&pos.as_long()).copied()
    }

    /// Looks up a section by grid coordinates.
    #[inline]
    #[must_use]
    pub fn find_at(&self, x: i32, y: i32, z: i32) -> Option<SectionId> {
        self.find(SectionPos::new(x, y, z))
    }

    /// Resolves a handle.
    #[inline]
    #[must_use]
    pub fn get(&self, id: SectionId) -> Option<&RenderSection> {
        self.sections.get(id)
    }

    /// Resolves a handle mutably.
    #[inline]
    pub fn get_mut(&mut self, id: SectionId) -> Option<&mut RenderSection> {
        self.sections.get_mut(id)
    }

    /// Iterates every loaded section.
    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &RenderSection)> {
        self.sections.iter()
    }

    /// Iterates every loaded section mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SectionId, &mut RenderSection)> {
        self.sections.iter_mut()
    }

    /// Adds a section and links it to its loaded neighbors.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::DuplicateSection`] if the position is taken.
    pub fn insert(&mut self, mut section: RenderSection) -> RenderResult<SectionId> {
        let pos = section.pos();
        if self.by_position.contains_key(&pos.as_long()) {
            return Err(RenderError::DuplicateSection(pos));
        }

        let mut neighbors = [None; GraphDirection::COUNT];
        for direction in GraphDirection::ALL {
            let (dx, dy, dz) = direction.offset();
            let neighbor = self.find(pos.offset(dx, dy, dz));
            section.set_adjacent(direction, neighbor);
            neighbors[direction.ordinal()] = neighbor;
        }

        let id = self.sections.allocate(section);
        self.by_position.insert(pos.as_long(), id);

        for direction in GraphDirection::ALL {
            if let Some(neighbor) = neighbors[direction.ordinal()].and_then(|n| self.sections.get_mut(n)) {
                neighbor.set_adjacent(direction.opposite(), Some(id));
            }
        }

        trace!(?pos, "Linked section");
        Ok(id)
    }

    /// Removes the section at a position and clears its neighbors' links.
    pub fn remove(&mut self, pos: SectionPos) -> Option<(SectionId, RenderSection)> {
        let id = self.by_position.remove(&pos.as_long())?;
        let section = self.sections.free(id)?;

        for direction in GraphDirection::ALL {
            if let Some(neighbor) = section.adjacent(direction).and_then(|n| self.sections.get_mut(n)) {
                neighbor.set_adjacent(direction.opposite(), None);
            }
        }

        trace!(?pos, "Unlinked section");
        Some((id, section))
    }

    /// Removes every section.
    pub fn clear(&mut self) {
        self.sections.clear();
        self.by_position.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(x: i32, y: i32, z: i32) -> RenderSection {
        RenderSection::new(SectionPos::new(x, y, z), RegionId::DANGLING)
    }

    #[test]
    fn test_links_are_symmetric() {
        let mut graph = SectionGraph::new();
        let center = graph.insert(section(0, 0, 0)).unwrap();
        let north = graph.insert(section(0, 0, -1)).unwrap();
        let east = graph.insert(section(1, 0, 0)).unwrap();

        let node = graph.get(center).unwrap();
        assert_eq!(node.adjacent(GraphDirection::North), Some(north));
        assert_eq!(node.adjacent(GraphDirection::East), Some(east));
        assert_eq!(node.adjacent(GraphDirection::Up), None);
        assert_eq!(node.adjacent_mask().len(), 2);

        assert_eq!(graph.get(north).unwrap().adjacent(GraphDirection::South), Some(center));
        assert_eq!(graph.get(east).unwrap().adjacent(GraphDirection::West), Some(center));
    }

    #[test]
    fn test_remove_clears_neighbor_links() {
        let mut graph = SectionGraph::new();
        let center = graph.insert(section(0, 0, 0)).unwrap();
        graph.insert(section(0, 1, 0)).unwrap();

        let (_, removed) = graph.remove(SectionPos::new(0, 1, 0)).unwrap();
        assert_eq!(removed.pos(), SectionPos::new(0, 1, 0));

        let node = graph.get(center).unwrap();
        assert_eq!(node.adjacent(GraphDirection::Up), None);
        assert!(node.adjacent_mask().is_empty());
        assert!(graph.find_at(0, 1, 0).is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut graph = SectionGraph::new();
        graph.insert(section(2, 3, 4)).unwrap();
        assert!(matches!(
            graph.insert(section(2, 3, 4)),
            Err(RenderError::DuplicateSection(_))
        ));
    }

    #[test]
    fn test_new_section_is_never_visible() {
        let node = section(0, 0, 0);
        assert_eq!(node.last_visible_frame(), u32::MAX);
        assert!(!node.has_geometry());
        assert_eq!(node.center(), [8.0, 8.0, 8.0]);
    }

    #[test]
    fn test_build_token_replacement_cancels() {
        let mut node = section(0, 0, 0);
        let first = CancellationToken::new();
        node.set_build_token(Some(first.clone()));
        assert!(node.has_build_in_flight());

        let second = CancellationToken::new();
        node.set_build_token(Some(second.clone()));
        assert!(first.is_cancelled());
        assert!(node.has_build_in_flight());

        node.finish_build(&first);
        assert!(node.build_token().is_some());
        node.finish_build(&second);
        assert!(node.build_token().is_none());
    }
}
