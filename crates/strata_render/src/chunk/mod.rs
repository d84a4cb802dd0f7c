//! Chunk geometry: passes, facing buckets, vertex layout, build results and
//! the batched renderer that draws them.

mod batch;
mod build;
mod facing;
pub mod index_buffer;
mod pass;
mod renderer;
pub mod vertex;

pub use batch::MultiDrawBatch;
pub use build::{
    BuiltSectionMesh, CancellationToken, ChunkBuildOutput, ChunkBuildTask, ChunkUpdateType, VertexRange,
};
pub use facing::ModelQuadFacing;
pub use index_buffer::{IndexType, SharedQuadIndexBuffer};
pub use pass::TerrainRenderPass;
pub use renderer::{region_offset, visible_faces, DefaultChunkRenderer};
