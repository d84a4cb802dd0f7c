//! # Render Device
//!
//! The small set of GPU operations the terrain renderer needs, expressed as a
//! trait over opaque handles. Every call happens on the render thread.
//!
//! ```text
//! ┌──────────────┐  buffers, tessellations, draws  ┌─────────────────┐
//! │ strata_render│ ──────────────────────────────► │ RenderDevice    │
//! └──────────────┘                                 │  HeadlessDevice │
//!                                                  │  WgpuDevice     │
//!                                                  └─────────────────┘
//! ```

mod headless;
#[cfg(feature = "wgpu-backend")]
mod wgpu_backend;

pub use headless::{DeviceCommand, HeadlessDevice};
#[cfg(feature = "wgpu-backend")]
pub use wgpu_backend::WgpuDevice;

use bytemuck::{Pod, Zeroable};

use crate::chunk::index_buffer::IndexType;
use crate::chunk::vertex::VertexFormat;
use crate::chunk::TerrainRenderPass;

/// Opaque handle to a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) u32);

/// Opaque handle to a tessellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TessellationHandle(pub(crate) u32);

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Vertex data.
    Vertex,
    /// Index data.
    Index,
}

/// Optional features of a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// One call can issue many indexed draws.
    pub multi_draw: bool,
}

/// Vertex buffer plus index buffer, bound together for drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessellationDescriptor {
    /// Vertex buffer.
    pub vertex_buffer: BufferHandle,
    /// Index buffer.
    pub index_buffer: BufferHandle,
    /// Width of the indices.
    pub index_type: IndexType,
    /// Layout of the vertex buffer.
    pub vertex_format: VertexFormat,
}

/// One indexed draw of the shared quad pattern.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawCommand {
    /// Added to every index before fetching a vertex.
    pub base_vertex: i32,
    /// Number of indices, starting at index zero.
    pub element_count: u32,
}

/// Arguments of an indexed indirect draw, as read by the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    /// Indices to draw.
    pub index_count: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Base vertex.
    pub base_vertex: i32,
    /// First instance.
    pub first_instance: u32,
}

impl From<DrawCommand> for DrawIndexedIndirectArgs {
    fn from(command: DrawCommand) -> Self {
        Self {
            index_count: command.element_count,
            instance_count: 1,
            first_index: 0,
            base_vertex: command.base_vertex,
            first_instance: 0,
        }
    }
}

/// Projection and model-view matrices for a pass (column-major).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ChunkRenderMatrices {
    /// Projection matrix.
    pub projection: [[f32; 4]; 4],
    /// Camera-relative model-view matrix.
    pub model_view: [[f32; 4]; 4],
}

impl ChunkRenderMatrices {
    /// Identity matrices.
    pub const IDENTITY: Self = Self {
        projection: IDENTITY,
        model_view: IDENTITY,
    };
}

impl Default for ChunkRenderMatrices {
    fn default() -> Self {
        Self::IDENTITY
    }
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// GPU operations used by the terrain renderer.
pub trait RenderDevice {
    /// Supported optional features.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Creates a buffer with no storage.
    fn create_buffer(&mut self, label: &str, usage: BufferUsage) -> BufferHandle;

    /// Replaces the buffer's storage with `size` zeroed bytes. The handle stays valid.
    fn allocate_storage(&mut self, buffer: BufferHandle, size: u64);

    /// Writes bytes at an offset.
    fn upload_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    /// Copies a byte range between buffers.
    fn copy_buffer(
        &mut self,
        src: BufferHandle,
        dst: BufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    );

    /// Destroys a buffer.
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Binds a vertex buffer and an index buffer for drawing.
    fn create_tessellation(&mut self, descriptor: &TessellationDescriptor) -> TessellationHandle;

    /// Destroys a tessellation. The buffers it references are untouched.
    fn delete_tessellation(&mut self, tessellation: TessellationHandle);

    /// Binds the pipeline of a pass and sets its matrices.
    fn begin_pass(&mut self, pass: TerrainRenderPass, matrices: &ChunkRenderMatrices);

    /// Sets the per-region translation uniform.
    fn set_region_offset(&mut self, offset: [f32; 3]);

    /// Issues every command in one call. Only valid when
    /// [`DeviceCapabilities::multi_draw`] is set.
    fn multi_draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        index_type: IndexType,
        commands: &[DrawCommand],
    );

    /// Issues a single indexed draw.
    fn draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        index_type: IndexType,
        command: DrawCommand,
    );

    /// Ends the current pass.
    fn end_pass(&mut self);
}
