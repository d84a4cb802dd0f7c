//! # STRATA Terrain Renderer
//!
//! Decides every frame which sections of a voxel world the camera can see,
//! and draws them with as few GPU calls as possible:
//! - One breadth-first search over the section graph per frame, pruned by
//!   per-section face-to-face visibility
//! - One multi-draw call per visible region per pass
//! - One shared index buffer for every chunk draw
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RenderSectionManager                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SectionGraph ──► OcclusionCuller ──► VisibleChunkCollector  │
//! │                                          │          │        │
//! │                              SortedRenderLists  RebuildQueues│
//! │                                          │                   │
//! │  RenderRegionManager ──► DefaultChunkRenderer ──► RenderDevice│
//! │   (arenas, tessellations)   (batches, shared index buffer)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Everything runs on the render thread; mesh builds come back over a channel
//! - GPU objects are only touched through [`device::RenderDevice`]
//! - No allocations per frame once buffers have warmed up

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod config;
pub mod culling;
pub mod device;
pub mod error;
pub mod graph;
pub mod lists;
pub mod manager;
pub mod region;
pub mod stats;

pub use chunk::{
    BuiltSectionMesh, CancellationToken, ChunkBuildOutput, ChunkBuildTask, ChunkUpdateType,
    DefaultChunkRenderer, IndexType, ModelQuadFacing, MultiDrawBatch, SharedQuadIndexBuffer,
    TerrainRenderPass, VertexRange,
};
pub use config::{RebuildQueueLimits, RendererConfig};
pub use culling::{CameraTransform, Frustum, OcclusionCuller, Viewport, Visitor};
pub use device::{ChunkRenderMatrices, DrawCommand, HeadlessDevice, RenderDevice};
pub use error::{RenderError, RenderResult};
pub use graph::{GraphDirection, GraphDirectionSet, RenderSection, SectionGraph, SectionId, VisibilityEncoding};
pub use lists::{ChunkRenderList, RebuildQueues, SortedRenderLists, VisibleChunkCollector};
pub use manager::RenderSectionManager;
pub use region::{LocalSectionIndex, RegionId, RenderRegion, RenderRegionManager};
pub use stats::RenderStats;
