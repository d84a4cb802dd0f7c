//! Visibility determination: frustum math, the camera snapshot and the
//! graph traversal that decides which sections are drawn.

mod frustum;
mod occlusion;
mod viewport;

pub use frustum::{Frustum, Plane};
pub use occlusion::{
    is_section_visible, is_within_frustum, is_within_render_distance, outward_directions,
    CullerState, OcclusionCuller, TraversalParams, Visitor, SECTION_FRUSTUM_HALF_EXTENT,
};
pub use viewport::{CameraTransform, Viewport};
