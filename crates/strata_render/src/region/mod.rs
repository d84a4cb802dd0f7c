//! Regions: groups of sections that share one vertex arena and draw together.

mod arena;
mod local_index;
mod manager;
#[allow(clippy::module_inception)]
mod region;
mod storage;

pub use arena::{ArenaAllocation, ArenaUpload, GeometryArena};
pub use local_index::LocalSectionIndex;
pub use manager::RenderRegionManager;
pub use region::{
    DeviceResources, RegionId, RenderRegion, REGION_ARENA_INITIAL_VERTICES, REGION_HEIGHT,
    REGION_HEIGHT_M, REGION_HEIGHT_SH, REGION_LENGTH, REGION_LENGTH_M, REGION_LENGTH_SH,
    REGION_SIZE, REGION_WIDTH, REGION_WIDTH_M, REGION_WIDTH_SH,
};
pub use storage::{SectionRenderData, SectionRenderDataStorage};
