//! # Traversal Property Tests
//!
//! Runs the occlusion culler over seeded random section graphs and checks
//! the guarantees the renderer relies on:
//!
//! 1. **Predicates**: every section reported visible is in range and in the frustum
//! 2. **Adjacency**: the search never jumps a missing neighbor
//! 3. **Uniqueness**: each section is reported at most once per frame
//! 4. **Monotonicity**: turning occlusion culling off only adds sections

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_core::{PoolHandle, SectionPos};
use strata_render::culling::{
    is_within_frustum, is_within_render_distance, CameraTransform, Frustum, OcclusionCuller, Plane,
    TraversalParams, Viewport,
};
use strata_render::graph::{RenderSection, SectionGraph, SectionId, VisibilityEncoding};

const BOTTOM_SECTION_Y: i32 = -4;
const TOP_SECTION_Y: i32 = 20;

fn params(search_distance: f32, use_occlusion_culling: bool) -> TraversalParams {
    TraversalParams {
        search_distance,
        use_occlusion_culling,
        bottom_section_y: BOTTOM_SECTION_Y,
        top_section_y: TOP_SECTION_Y,
    }
}

/// Loads roughly `density` of a cube of sections around the origin, each
/// with random face-to-face visibility.
fn random_graph(seed: u64, radius: i32, density: f64) -> SectionGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = SectionGraph::new();

    for x in -radius..=radius {
        for y in -2..=2 {
            for z in -radius..=radius {
                let is_origin = x == 0 && y == 0 && z == 0;
                if !is_origin && !rng.gen_bool(density) {
                    continue;
                }

                let mut section = RenderSection::new(SectionPos::new(x, y, z), PoolHandle::DANGLING);
                let visibility = VisibilityEncoding::encode(|_, _| rng.gen_bool(0.6));
                section.set_visibility_data(visibility);
                graph.insert(section).unwrap();
            }
        }
    }

    graph
}

fn traverse(
    graph: &mut SectionGraph,
    viewport: &Viewport,
    params: &TraversalParams,
    frame: u32,
) -> Vec<(SectionId, SectionPos, bool)> {
    let mut culler = OcclusionCuller::new();
    let mut visits = Vec::new();
    let mut visitor = |id: SectionId, section: &RenderSection, visible: bool| {
        visits.push((id, section.pos(), visible));
    };
    culler.find_visible(graph, &mut visitor, viewport, params, frame);
    visits
}

fn looking_north() -> Frustum {
    // Half-space z <= 0 relative to the camera.
    let mut frustum = Frustum::infinite();
    frustum.planes[Frustum::NEAR] = Plane::new(0.0, 0.0, -1.0, 0.0);
    frustum
}

#[test]
fn test_visible_sections_satisfy_predicates() {
    for seed in 0..8 {
        let mut graph = random_graph(seed, 6, 0.8);
        let viewport = Viewport::new(looking_north(), CameraTransform::new(7.5, 9.0, 3.25));
        let params = params(72.0, true);

        for (id, pos, visible) in traverse(&mut graph, &viewport, &params, 1) {
            if !visible || pos == viewport.chunk_coord() {
                continue;
            }
            let section = graph.get(id).unwrap();
            assert!(
                is_within_render_distance(viewport.transform(), section, params.search_distance),
                "seed {seed}: {pos:?} reported visible beyond render distance"
            );
            assert!(
                is_within_frustum(&viewport, section),
                "seed {seed}: {pos:?} reported visible outside the frustum"
            );
        }
    }
}

#[test]
fn test_traversal_follows_adjacency_only() {
    for seed in 0..8 {
        let mut graph = random_graph(seed, 5, 0.55);
        let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(8.0, 8.0, 8.0));
        let visits = traverse(&mut graph, &viewport, &params(256.0, false), 1);

        // Everything reported after the origin must touch an earlier,
        // visible section through a loaded neighbor link.
        let mut expanded: HashSet<SectionId> = HashSet::new();
        for (index, (id, pos, visible)) in visits.iter().enumerate() {
            if index > 0 {
                let section = graph.get(*id).unwrap();
                let reachable = strata_render::graph::GraphDirection::ALL
                    .iter()
                    .filter_map(|direction| section.adjacent(*direction))
                    .any(|neighbor| expanded.contains(&neighbor));
                assert!(reachable, "seed {seed}: {pos:?} reached without a loaded neighbor");
            }
            if *visible {
                expanded.insert(*id);
            }
        }
    }
}

#[test]
fn test_disconnected_cluster_is_never_reached() {
    let mut graph = SectionGraph::new();
    for x in [0, 1, 3, 4] {
        let mut section = RenderSection::new(SectionPos::new(x, 0, 0), PoolHandle::DANGLING);
        section.set_visibility_data(VisibilityEncoding::ALL_CONNECTED);
        graph.insert(section).unwrap();
    }

    let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(8.0, 8.0, 8.0));
    let visits = traverse(&mut graph, &viewport, &params(256.0, false), 1);

    let reached: Vec<i32> = visits.iter().map(|(_, pos, _)| pos.x).collect();
    assert_eq!(reached, vec![0, 1]);
}

#[test]
fn test_sections_reported_once_per_frame() {
    for seed in 0..8 {
        let mut graph = random_graph(seed, 6, 0.9);
        let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(-3.0, 12.0, 20.0));

        for frame in 1..4 {
            let visits = traverse(&mut graph, &viewport, &params(128.0, seed % 2 == 0), frame);
            let unique: HashSet<SectionId> = visits.iter().map(|(id, _, _)| *id).collect();
            assert_eq!(unique.len(), visits.len(), "seed {seed}, frame {frame}");
        }
    }
}

#[test]
fn test_disabling_occlusion_visits_superset() {
    for seed in 0..8 {
        let mut graph = random_graph(seed, 6, 0.85);
        let viewport = Viewport::new(looking_north(), CameraTransform::new(8.0, 8.0, 8.0));

        let culled: HashSet<SectionPos> = traverse(&mut graph, &viewport, &params(96.0, true), 1)
            .into_iter()
            .map(|(_, pos, _)| pos)
            .collect();
        let unculled: HashSet<SectionPos> = traverse(&mut graph, &viewport, &params(96.0, false), 2)
            .into_iter()
            .map(|(_, pos, _)| pos)
            .collect();

        assert!(culled.is_subset(&unculled), "seed {seed}");
    }
}

#[test]
fn test_traversal_is_deterministic() {
    let viewport = Viewport::new(looking_north(), CameraTransform::new(30.0, 5.0, -12.0));
    let params = params(96.0, true);

    let mut first = random_graph(42, 6, 0.8);
    let mut second = random_graph(42, 6, 0.8);

    let a: Vec<_> = traverse(&mut first, &viewport, &params, 1)
        .into_iter()
        .map(|(_, pos, visible)| (pos, visible))
        .collect();
    let b: Vec<_> = traverse(&mut second, &viewport, &params, 1)
        .into_iter()
        .map(|(_, pos, visible)| (pos, visible))
        .collect();

    assert_eq!(a, b);
}

#[test]
fn test_transparent_region_is_fully_traversed() {
    let mut graph = SectionGraph::new();
    for x in 0..8 {
        for y in 0..4 {
            for z in 0..8 {
                let mut section = RenderSection::new(SectionPos::new(x, y, z), PoolHandle::DANGLING);
                section.set_visibility_data(VisibilityEncoding::ALL_CONNECTED);
                graph.insert(section).unwrap();
            }
        }
    }

    let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(0.0, 0.0, 0.0));
    let params = params(128.0, true);
    let visits = traverse(&mut graph, &viewport, &params, 1);

    let visible: HashSet<SectionPos> = visits
        .iter()
        .filter(|(_, _, visible)| *visible)
        .map(|(_, pos, _)| *pos)
        .collect();

    let mut in_range = 0;
    for (_, section) in graph.iter() {
        if is_within_render_distance(viewport.transform(), section, params.search_distance) {
            in_range += 1;
            assert!(visible.contains(&section.pos()), "{:?} not reached", section.pos());
        }
    }
    assert_eq!(visible.len(), in_range);
    assert!(in_range > 128);
}

#[test]
fn test_isolated_section_is_visited_without_expansion() {
    let mut graph = SectionGraph::new();
    let mut section = RenderSection::new(SectionPos::new(5, 0, 5), PoolHandle::DANGLING);
    section.set_visibility_data(VisibilityEncoding::ALL_CONNECTED);
    graph.insert(section).unwrap();

    let mut culler = OcclusionCuller::new();
    let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(88.0, 8.0, 88.0));
    let mut visits = Vec::new();
    let mut visitor = |_: SectionId, section: &RenderSection, visible: bool| {
        visits.push((section.pos(), visible));
    };
    culler.find_visible(&mut graph, &mut visitor, &viewport, &params(128.0, true), 1);

    assert_eq!(visits, vec![(SectionPos::new(5, 0, 5), true)]);
    assert_eq!(culler.rounds(), 0);
}

#[test]
fn test_below_world_seeds_bottom_layer() {
    let mut graph = SectionGraph::new();
    for x in -3..=3 {
        for z in -3..=3 {
            let mut section =
                RenderSection::new(SectionPos::new(x, BOTTOM_SECTION_Y, z), PoolHandle::DANGLING);
            section.set_visibility_data(VisibilityEncoding::ALL_CONNECTED);
            graph.insert(section).unwrap();
        }
    }

    // Ten blocks under the bottom of the world.
    let viewport = Viewport::new(Frustum::infinite(), CameraTransform::new(8.0, -74.0, 8.0));
    let visits = traverse(&mut graph, &viewport, &params(48.0, true), 1);

    assert_eq!(visits[0].1, SectionPos::new(0, BOTTOM_SECTION_Y, 0));
    assert!(visits[0].2);
    let unique: HashSet<SectionPos> = visits.iter().map(|(_, pos, _)| *pos).collect();
    assert_eq!(unique.len(), visits.len());
    // Every column of the 7×7 square within the search radius is seeded.
    assert_eq!(unique.len(), 49);
}
