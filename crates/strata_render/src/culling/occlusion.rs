//! # Occlusion Culler
//!
//! Breadth-first search over the section graph, outward from the camera.
//!
//! ```text
//!   Idle ──► Initializing ──► Expanding ──► Done
//!              (seed)        (one flip of the
//!                             frontier per round)
//! ```
//!
//! A section is expanded only if it passes the render-distance and frustum
//! tests. Its outgoing directions are the faces reachable from the faces it
//! was entered through, restricted to directions that lead away from the
//! camera and to neighbors that are loaded. Each section enters the frontier
//! at most once per frame: `last_visible_frame` marks membership, later
//! arrivals only add to the incoming-face accumulator.

use strata_core::{DoubleBufferedQueue, SectionPos, SECTION_SIZE};
use tracing::trace;

use super::viewport::{CameraTransform, Viewport};
use crate::graph::{
    GraphDirection, GraphDirectionSet, RenderSection, SectionGraph, SectionId, VisibilityEncoding,
};

/// Half extent of the box tested against the frustum: half a section, plus
/// one block of model overhang, plus an epsilon for float error.
pub const SECTION_FRUSTUM_HALF_EXTENT: f32 = 8.0 + 1.0 + 0.125;

/// Receives every section the culler reaches.
pub trait Visitor {
    /// Called once per section reached this frame.
    fn visit(&mut self, id: SectionId, section: &RenderSection, visible: bool);
}

impl<F: FnMut(SectionId, &RenderSection, bool)> Visitor for F {
    fn visit(&mut self, id: SectionId, section: &RenderSection, visible: bool) {
        self(id, section, visible);
    }
}

/// Per-frame traversal inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraversalParams {
    /// Render distance in blocks.
    pub search_distance: f32,
    /// Prune with per-section visibility data.
    pub use_occlusion_culling: bool,
    /// Lowest section Y of the world (inclusive).
    pub bottom_section_y: i32,
    /// Highest section Y of the world (exclusive).
    pub top_section_y: i32,
}

/// Where the culler is in its per-frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullerState {
    /// No traversal has run yet.
    Idle,
    /// Seeding the frontier.
    Initializing,
    /// Draining frontier rounds.
    Expanding,
    /// The last traversal ran to completion.
    Done,
}

/// Frontier-based visibility search.
#[derive(Debug)]
pub struct OcclusionCuller {
    queue: DoubleBufferedQueue<SectionId>,
    state: CullerState,
    rounds: u32,
}

impl OcclusionCuller {
    /// Creates a culler with an empty frontier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: DoubleBufferedQueue::with_capacity(4096),
            state: CullerState::Idle,
            rounds: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CullerState {
        self.state
    }

    /// Number of frontier rounds in the last traversal.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Runs one full traversal for `frame`, reporting every reached section.
    ///
    /// `frame` must differ from the previous call's value.
    pub fn find_visible<V: Visitor>(
        &mut self,
        graph: &mut SectionGraph,
        visitor: &mut V,
        viewport: &Viewport,
        params: &TraversalParams,
        frame: u32,
    ) {
        self.queue.reset();
        self.rounds = 0;

        self.state = CullerState::Initializing;
        self.init(graph, visitor, viewport, params, frame);

        self.state = CullerState::Expanding;
        while self.queue.flip() {
            self.rounds += 1;
            self.process_queue(graph, visitor, viewport, params, frame);
        }

        self.state = CullerState::Done;
        trace!(frame, rounds = self.rounds, "Occlusion traversal finished");
    }

    fn process_queue<V: Visitor>(
        &mut self,
        graph: &mut SectionGraph,
        visitor: &mut V,
        viewport: &Viewport,
        params: &TraversalParams,
        frame: u32,
    ) {
        let origin = viewport.chunk_coord();

        while let Some(id) = self.queue.dequeue() {
            let Some(section) = graph.get(id) else {
                continue;
            };

            let visible = is_section_visible(section, viewport, params.search_distance);
            visitor.visit(id, section, visible);

            if !visible {
                continue;
            }

            let mut connections = if params.use_occlusion_culling {
                VisibilityEncoding::get_connections(
                    section.visibility_data(),
                    section.incoming_directions(),
                )
            } else {
                GraphDirectionSet::ALL
            };
            connections &= outward_directions(origin, section.pos());

            let neighbors = neighbors_of(section, connections);
            self.visit_neighbors(graph, neighbors, frame);
        }
    }

    fn visit_neighbors(
        &mut self,
        graph: &mut SectionGraph,
        neighbors: [Option<SectionId>; GraphDirection::COUNT],
        frame: u32,
    ) {
        for direction in GraphDirection::ALL {
            if let Some(neighbor) = neighbors[direction.ordinal()] {
                self.visit_node(graph, neighbor, GraphDirectionSet::of(direction.opposite()), frame);
            }
        }
    }

    fn visit_node(
        &mut self,
        graph: &mut SectionGraph,
        id: SectionId,
        incoming: GraphDirectionSet,
        frame: u32,
    ) {
        let Some(section) = graph.get_mut(id) else {
            return;
        };

        if section.last_visible_frame() != frame {
            section.set_last_visible_frame(frame);
            section.set_incoming_directions(GraphDirectionSet::NONE);
            self.queue.enqueue(id);
        }

        section.add_incoming_directions(incoming);
    }

    fn init<V: Visitor>(
        &mut self,
        graph: &mut SectionGraph,
        visitor: &mut V,
        viewport: &Viewport,
        params: &TraversalParams,
        frame: u32,
    ) {
        let origin = viewport.chunk_coord();

        if origin.y < params.bottom_section_y {
            self.init_outside_world_height(
                graph,
                viewport,
                params.search_distance,
                frame,
                params.bottom_section_y,
                GraphDirection::Down,
            );
        } else if origin.y >= params.top_section_y {
            self.init_outside_world_height(
                graph,
                viewport,
                params.search_distance,
                frame,
                params.top_section_y - 1,
                GraphDirection::Up,
            );
        } else {
            self.init_within_world(graph, visitor, viewport, params.use_occlusion_culling, frame);
        }
    }

    fn init_within_world<V: Visitor>(
        &mut self,
        graph: &mut SectionGraph,
        visitor: &mut V,
        viewport: &Viewport,
        use_occlusion_culling: bool,
        frame: u32,
    ) {
        let Some(id) = graph.find(viewport.chunk_coord()) else {
            return;
        };
        let Some(section) = graph.get_mut(id) else {
            return;
        };

        section.set_last_visible_frame(frame);
        section.set_incoming_directions(GraphDirectionSet::NONE);

        visitor.visit(id, section, true);

        let outgoing = if use_occlusion_culling {
            VisibilityEncoding::get_all_connections(section.visibility_data())
        } else {
            GraphDirectionSet::ALL
        };

        let neighbors = neighbors_of(section, outgoing);
        self.visit_neighbors(graph, neighbors, frame);
    }

    /// Seeds every column within the search radius at `height`, innermost
    /// diamond ring first. Each ring starts at its northernmost cell and
    /// walks north, west, south, east.
    fn init_outside_world_height(
        &mut self,
        graph: &mut SectionGraph,
        viewport: &Viewport,
        search_distance: f32,
        frame: u32,
        height: i32,
        direction: GraphDirection,
    ) {
        let origin = viewport.chunk_coord();
        #[allow(clippy::cast_possible_truncation)]
        let radius = (search_distance / SECTION_SIZE as f32).floor() as i32;

        let mut try_visit = |culler: &mut Self, x: i32, z: i32| {
            let Some(id) = graph.find_at(origin.x + x, height, origin.z + z) else {
                return;
            };
            let in_frustum = graph
                .get(id)
                .is_some_and(|section| is_within_frustum(viewport, section));
            if in_frustum {
                culler.visit_node(graph, id, GraphDirectionSet::of(direction), frame);
            }
        };

        try_visit(self, 0, 0);

        // Complete rings.
        for layer in 1..=radius {
            for z in -layer..layer {
                try_visit(self, z.abs() - layer, z);
            }
            for z in ((-layer + 1)..=layer).rev() {
                try_visit(self, layer - z.abs(), z);
            }
        }

        // Rings clipped by the square of loaded columns.
        for layer in (radius + 1)..=(2 * radius) {
            let l = layer - radius;

            for z in -radius..=-l {
                try_visit(self, -z - layer, z);
            }
            for z in l..=radius {
                try_visit(self, z - layer, z);
            }
            for z in (l..=radius).rev() {
                try_visit(self, layer - z, z);
            }
            for z in (-radius..=-l).rev() {
                try_visit(self, layer + z, z);
            }
        }
    }
}

impl Default for OcclusionCuller {
    fn default() -> Self {
        Self::new()
    }
}

fn neighbors_of(
    section: &RenderSection,
    outgoing: GraphDirectionSet,
) -> [Option<SectionId>; GraphDirection::COUNT] {
    let outgoing = outgoing & section.adjacent_mask();
    let mut neighbors = [None; GraphDirection::COUNT];

    for direction in outgoing.iter() {
        neighbors[direction.ordinal()] = section.adjacent(direction);
    }

    neighbors
}

/// Directions that do not point back toward the camera's section.
///
/// Both comparisons include the origin's own coordinate, so sections on the
/// camera's axis planes keep both directions along that axis.
#[must_use]
pub fn outward_directions(origin: SectionPos, pos: SectionPos) -> GraphDirectionSet {
    let mut planes = GraphDirectionSet::NONE;

    if pos.x <= origin.x {
        planes |= GraphDirection::West.into();
    }
    if pos.x >= origin.x {
        planes |= GraphDirection::East.into();
    }

    if pos.y <= origin.y {
        planes |= GraphDirection::Down.into();
    }
    if pos.y >= origin.y {
        planes |= GraphDirection::Up.into();
    }

    if pos.z <= origin.z {
        planes |= GraphDirection::North.into();
    }
    if pos.z >= origin.z {
        planes |= GraphDirection::South.into();
    }

    planes
}

/// Distance and frustum test combined.
#[must_use]
pub fn is_section_visible(section: &RenderSection, viewport: &Viewport, max_distance: f32) -> bool {
    is_within_render_distance(viewport.transform(), section, max_distance)
        && is_within_frustum(viewport, section)
}

/// Cylindrical distance test: the horizontal distance and the vertical
/// distance to the nearest point of the section are bounded independently.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn is_within_render_distance(
    camera: &CameraTransform,
    section: &RenderSection,
    max_distance: f32,
) -> bool {
    let ox = section.origin_x() - camera.int_x;
    let oy = section.origin_y() - camera.int_y;
    let oz = section.origin_z() - camera.int_z;

    let dx = nearest_to_zero(ox, ox + SECTION_SIZE) as f32 - camera.frac_x;
    let dy = nearest_to_zero(oy, oy + SECTION_SIZE) as f32 - camera.frac_y;
    let dz = nearest_to_zero(oz, oz + SECTION_SIZE) as f32 - camera.frac_z;

    (dx * dx + dz * dz) < max_distance * max_distance && dy.abs() < max_distance
}

/// Tests the section's padded bounding box against the frustum.
#[must_use]
pub fn is_within_frustum(viewport: &Viewport, section: &RenderSection) -> bool {
    viewport.is_box_visible(
        section.center(),
        SECTION_FRUSTUM_HALF_EXTENT,
        SECTION_FRUSTUM_HALF_EXTENT,
        SECTION_FRUSTUM_HALF_EXTENT,
    )
}

/// Value in `min..=max` closest to zero.
#[inline]
const fn nearest_to_zero(min: i32, max: i32) -> i32 {
    if min > 0 {
        min
    } else if max < 0 {
        max
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::Frustum;
    use crate::region::RegionId;

    fn viewport_at(x: f64, y: f64, z: f64) -> Viewport {
        Viewport::new(Frustum::infinite(), CameraTransform::new(x, y, z))
    }

    fn params(distance: f32) -> TraversalParams {
        TraversalParams {
            search_distance: distance,
            use_occlusion_culling: true,
            bottom_section_y: -4,
            top_section_y: 20,
        }
    }

    fn line_graph(length: i32, visibility: u64) -> SectionGraph {
        let mut graph = SectionGraph::new();
        for x in 0..length {
            let mut section = RenderSection::new(SectionPos::new(x, 0, 0), RegionId::DANGLING);
            section.set_visibility_data(visibility);
            graph.insert(section).unwrap();
        }
        graph
    }

    fn collect(
        culler: &mut OcclusionCuller,
        graph: &mut SectionGraph,
        viewport: &Viewport,
        params: &TraversalParams,
        frame: u32,
    ) -> Vec<(SectionPos, bool)> {
        let mut visited = Vec::new();
        let mut visitor = |_: SectionId, section: &RenderSection, visible: bool| {
            visited.push((section.pos(), visible));
        };
        culler.find_visible(graph, &mut visitor, viewport, params, frame);
        visited
    }

    #[test]
    fn test_nearest_to_zero() {
        assert_eq!(nearest_to_zero(3, 19), 3);
        assert_eq!(nearest_to_zero(-19, -3), -3);
        assert_eq!(nearest_to_zero(-4, 12), 0);
    }

    #[test]
    fn test_outward_directions_keep_ties() {
        let origin = SectionPos::new(0, 0, 0);
        assert_eq!(outward_directions(origin, origin), GraphDirectionSet::ALL);

        let east = outward_directions(origin, SectionPos::new(2, 0, 0));
        assert!(east.contains(GraphDirection::East));
        assert!(!east.contains(GraphDirection::West));
        assert!(east.contains(GraphDirection::North));
        assert!(east.contains(GraphDirection::South));
    }

    #[test]
    fn test_render_distance_is_cylindrical() {
        let camera = CameraTransform::new(8.0, 8.0, 8.0);
        let far_up = RenderSection::new(SectionPos::new(0, 6, 0), RegionId::DANGLING);
        let far_diagonal = RenderSection::new(SectionPos::new(5, 0, 5), RegionId::DANGLING);

        // 88 blocks straight up passes a 100 block cylinder...
        assert!(is_within_render_distance(&camera, &far_up, 100.0));
        // ...while 72 blocks on both horizontal axes does not.
        assert!(!is_within_render_distance(&camera, &far_diagonal, 100.0));
        assert!(is_within_render_distance(&camera, &far_diagonal, 110.0));
    }

    #[test]
    fn test_transparent_line_is_fully_traversed() {
        let mut graph = line_graph(6, VisibilityEncoding::ALL_CONNECTED);
        let mut culler = OcclusionCuller::new();

        let visited = collect(&mut culler, &mut graph, &viewport_at(8.0, 8.0, 8.0), &params(256.0), 0);

        assert_eq!(visited.len(), 6);
        assert!(visited.iter().all(|(_, visible)| *visible));
        assert_eq!(visited[0].0, SectionPos::new(0, 0, 0));
        assert_eq!(culler.state(), CullerState::Done);
        assert_eq!(culler.rounds(), 5);
    }

    #[test]
    fn test_opaque_section_blocks_traversal() {
        let mut graph = line_graph(4, VisibilityEncoding::ALL_CONNECTED);
        let wall = graph.find_at(1, 0, 0).unwrap();
        graph.get_mut(wall).unwrap().set_visibility_data(VisibilityEncoding::NULL);

        let mut culler = OcclusionCuller::new();
        let viewport = viewport_at(8.0, 8.0, 8.0);

        let visited = collect(&mut culler, &mut graph, &viewport, &params(256.0), 0);
        let positions: Vec<_> = visited.iter().map(|(pos, _)| pos.x).collect();
        assert_eq!(positions, vec![0, 1]);

        let mut no_occlusion = params(256.0);
        no_occlusion.use_occlusion_culling = false;
        let visited = collect(&mut culler, &mut graph, &viewport, &no_occlusion, 1);
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn test_out_of_range_sections_are_reported_but_not_expanded() {
        let mut graph = line_graph(10, VisibilityEncoding::ALL_CONNECTED);
        let mut culler = OcclusionCuller::new();

        // Sections 0..=2 are within 40 blocks of x = 8; section 3 starts at 48.
        let visited = collect(&mut culler, &mut graph, &viewport_at(8.0, 8.0, 8.0), &params(40.0), 0);

        assert_eq!(visited.len(), 4);
        assert_eq!(visited[3], (SectionPos::new(3, 0, 0), false));
    }

    #[test]
    fn test_camera_section_missing_yields_nothing() {
        let mut graph = line_graph(3, VisibilityEncoding::ALL_CONNECTED);
        let mut culler = OcclusionCuller::new();

        let visited = collect(&mut culler, &mut graph, &viewport_at(-100.0, 8.0, 8.0), &params(256.0), 0);
        assert!(visited.is_empty());
    }

    #[test]
    fn test_above_world_seeds_top_layer() {
        let mut graph = SectionGraph::new();
        for x in -2..=2 {
            for z in -2..=2 {
                let mut section = RenderSection::new(SectionPos::new(x, 19, z), RegionId::DANGLING);
                section.set_visibility_data(VisibilityEncoding::ALL_CONNECTED);
                graph.insert(section).unwrap();
            }
        }

        let mut culler = OcclusionCuller::new();
        let viewport = viewport_at(8.0, 20.0 * 16.0 + 40.0, 8.0);

        let visited = collect(&mut culler, &mut graph, &viewport, &params(48.0), 0);

        // First seeded section is the column under the camera.
        assert_eq!(visited[0].0, SectionPos::new(0, 19, 0));
        assert_eq!(visited.len(), 25);

        let mut positions: Vec<_> = visited.iter().map(|(pos, _)| *pos).collect();
        positions.sort();
        positions.dedup();
        assert_eq!(positions.len(), 25);
    }
}
