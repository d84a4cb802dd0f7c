//! Section graph: directions, per-section visibility and the node arena.

mod direction;
mod section;
mod visibility;

pub use direction::{GraphDirection, GraphDirectionSet};
pub use section::{RenderSection, SectionGraph, SectionId};
pub use visibility::{OcclusionGraphBuilder, VisibilityEncoding};
