//! # WGPU Device
//!
//! [`RenderDevice`] on top of wgpu. Buffer handles map to `wgpu::Buffer`s
//! that are recreated when storage is reallocated. Draws are recorded per
//! pass and replayed into a caller-owned `wgpu::RenderPass`, which also owns
//! pipeline and bind group selection.
//!
//! Region offsets are passed as a 16-byte vertex push constant, so the
//! device must be created with `Features::PUSH_CONSTANTS`. Multi-draws use
//! `multi_draw_indexed_indirect` when `Features::MULTI_DRAW_INDIRECT` is
//! available.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    BufferHandle, BufferUsage, ChunkRenderMatrices, DeviceCapabilities, DrawCommand,
    DrawIndexedIndirectArgs, RenderDevice, TessellationDescriptor, TessellationHandle,
};
use crate::chunk::index_buffer::IndexType;
use crate::chunk::vertex::{AttributeFormat, COMPACT_FORMAT};
use crate::chunk::TerrainRenderPass;

/// wgpu rejects copies and writes that are not 4-byte aligned.
const COPY_ALIGNMENT: u64 = wgpu::COPY_BUFFER_ALIGNMENT;

const fn attribute_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Uint16x4 => wgpu::VertexFormat::Uint16x4,
        AttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        AttributeFormat::Unorm16x2 => wgpu::VertexFormat::Unorm16x2,
        AttributeFormat::Uint16x2 => wgpu::VertexFormat::Uint16x2,
    }
}

const fn wgpu_attribute(index: usize) -> wgpu::VertexAttribute {
    let binding = COMPACT_FORMAT.attributes[index];
    wgpu::VertexAttribute {
        format: attribute_format(binding.format),
        offset: binding.offset as wgpu::BufferAddress,
        shader_location: binding.location,
    }
}

const TERRAIN_ATTRIBUTES: [wgpu::VertexAttribute; 4] = [
    wgpu_attribute(0),
    wgpu_attribute(1),
    wgpu_attribute(2),
    wgpu_attribute(3),
];

const fn index_format(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::U16 => wgpu::IndexFormat::Uint16,
        IndexType::U32 => wgpu::IndexFormat::Uint32,
    }
}

const fn align_up(value: u64) -> u64 {
    (value + COPY_ALIGNMENT - 1) & !(COPY_ALIGNMENT - 1)
}

struct DeviceBuffer {
    label: String,
    usage: BufferUsage,
    buffer: Option<wgpu::Buffer>,
}

#[derive(Debug, Clone, Copy)]
enum RecordedDraw {
    Multi {
        tessellation: TessellationHandle,
        offset: [f32; 3],
        first: u32,
        count: u32,
    },
    Single {
        tessellation: TessellationHandle,
        offset: [f32; 3],
        command: DrawCommand,
    },
}

/// wgpu-backed device.
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    capabilities: DeviceCapabilities,

    buffers: HashMap<BufferHandle, DeviceBuffer>,
    tessellations: HashMap<TessellationHandle, TessellationDescriptor>,
    next_buffer: u32,
    next_tessellation: u32,

    matrices: wgpu::Buffer,
    indirect: Option<wgpu::Buffer>,
    indirect_args: Vec<DrawIndexedIndirectArgs>,

    active_pass: Option<TerrainRenderPass>,
    region_offset: [f32; 3],
    passes: HashMap<TerrainRenderPass, Vec<RecordedDraw>>,
}

impl WgpuDevice {
    /// Wraps a wgpu device and queue.
    #[must_use]
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let multi_draw = device.features().contains(wgpu::Features::MULTI_DRAW_INDIRECT);

        let matrices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("chunk_render_matrices"),
            size: std::mem::size_of::<ChunkRenderMatrices>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        debug!(multi_draw, "Created wgpu terrain device");

        Self {
            device,
            queue,
            capabilities: DeviceCapabilities { multi_draw },
            buffers: HashMap::new(),
            tessellations: HashMap::new(),
            next_buffer: 0,
            next_tessellation: 0,
            matrices,
            indirect: None,
            indirect_args: Vec::new(),
            active_pass: None,
            region_offset: [0.0; 3],
            passes: HashMap::new(),
        }
    }

    /// Vertex buffer layout of terrain geometry, for pipeline creation.
    #[must_use]
    pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: wgpu::BufferAddress::from(COMPACT_FORMAT.stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &TERRAIN_ATTRIBUTES,
        }
    }

    /// Push constant range the terrain pipelines must declare.
    #[must_use]
    pub const fn push_constant_range() -> wgpu::PushConstantRange {
        wgpu::PushConstantRange {
            stages: wgpu::ShaderStages::VERTEX,
            range: 0..16,
        }
    }

    /// Uniform buffer holding the matrices of the last begun pass.
    #[must_use]
    pub const fn matrices_buffer(&self) -> &wgpu::Buffer {
        &self.matrices
    }

    /// Drops the draws recorded for the previous frame.
    pub fn begin_frame(&mut self) {
        self.passes.clear();
        self.indirect_args.clear();
    }

    /// Uploads the indirect arguments of every recorded multi-draw.
    ///
    /// Call once after all passes were recorded and before [`encode`](Self::encode).
    pub fn prepare(&mut self) {
        if self.indirect_args.is_empty() {
            return;
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.indirect_args);
        let size = bytes.len() as u64;

        if self.indirect.as_ref().map_or(true, |buffer| buffer.size() < size) {
            self.indirect = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("chunk_indirect_draws"),
                size: align_up(size.next_power_of_two()),
                usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        if let Some(indirect) = &self.indirect {
            self.queue.write_buffer(indirect, 0, bytes);
        }
    }

    /// Replays the draws recorded for `pass`.
    ///
    /// The caller has already set the pipeline and bind groups.
    pub fn encode<'a>(&'a self, pass: TerrainRenderPass, render_pass: &mut wgpu::RenderPass<'a>) {
        let Some(draws) = self.passes.get(&pass) else {
            return;
        };

        for draw in draws {
            let (tessellation, offset) = match *draw {
                RecordedDraw::Multi {
                    tessellation,
                    offset,
                    ..
                }
                | RecordedDraw::Single {
                    tessellation,
                    offset,
                    ..
                } => (tessellation, offset),
            };

            let Some(descriptor) = self.tessellations.get(&tessellation) else {
                warn!(?tessellation, "Recorded draw references a deleted tessellation");
                continue;
            };
            let (Some(vertex), Some(index)) = (
                self.wgpu_buffer(descriptor.vertex_buffer),
                self.wgpu_buffer(descriptor.index_buffer),
            ) else {
                continue;
            };

            render_pass.set_vertex_buffer(0, vertex.slice(..));
            render_pass.set_index_buffer(index.slice(..), index_format(descriptor.index_type));

            let push = [offset[0], offset[1], offset[2], 0.0];
            render_pass.set_push_constants(wgpu::ShaderStages::VERTEX, 0, bytemuck::cast_slice(&push));

            match *draw {
                RecordedDraw::Multi { first, count, .. } => {
                    if let Some(indirect) = &self.indirect {
                        let stride = std::mem::size_of::<DrawIndexedIndirectArgs>() as u64;
                        render_pass.multi_draw_indexed_indirect(indirect, u64::from(first) * stride, count);
                    }
                }
                RecordedDraw::Single { command, .. } => {
                    render_pass.draw_indexed(0..command.element_count, command.base_vertex, 0..1);
                }
            }
        }
    }

    fn wgpu_buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle).and_then(|b| b.buffer.as_ref())
    }

    fn record(&mut self, draw: RecordedDraw) {
        match self.active_pass {
            Some(pass) => self.passes.entry(pass).or_default().push(draw),
            None => warn!("Draw recorded outside of a pass"),
        }
    }
}

impl RenderDevice for WgpuDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, label: &str, usage: BufferUsage) -> BufferHandle {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;

        self.buffers.insert(
            handle,
            DeviceBuffer {
                label: label.to_owned(),
                usage,
                buffer: None,
            },
        );
        handle
    }

    fn allocate_storage(&mut self, buffer: BufferHandle, size: u64) {
        let Some(entry) = self.buffers.get_mut(&buffer) else {
            warn!(?buffer, "Allocating storage for a deleted buffer");
            return;
        };

        if let Some(old) = entry.buffer.take() {
            old.destroy();
        }

        if size == 0 {
            return;
        }

        let usage = match entry.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        entry.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(entry.label.as_str()),
            size: align_up(size),
            usage,
            mapped_at_creation: false,
        }));
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        let Some(target) = self.wgpu_buffer(buffer) else {
            warn!(?buffer, "Upload to a buffer without storage");
            return;
        };

        if data.len() as u64 % COPY_ALIGNMENT == 0 {
            self.queue.write_buffer(target, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(align_up(data.len() as u64) as usize, 0);
            self.queue.write_buffer(target, offset, &padded);
        }
    }

    fn copy_buffer(
        &mut self,
        src: BufferHandle,
        dst: BufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    ) {
        let (Some(source), Some(destination)) = (self.wgpu_buffer(src), self.wgpu_buffer(dst)) else {
            warn!(?src, ?dst, "Copy between buffers without storage");
            return;
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("chunk_arena_copy"),
        });
        encoder.copy_buffer_to_buffer(source, src_offset, destination, dst_offset, align_up(size));
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.remove(&buffer) {
            if let Some(old) = entry.buffer {
                old.destroy();
            }
        }
    }

    fn create_tessellation(&mut self, descriptor: &TessellationDescriptor) -> TessellationHandle {
        let handle = TessellationHandle(self.next_tessellation);
        self.next_tessellation += 1;
        self.tessellations.insert(handle, *descriptor);
        handle
    }

    fn delete_tessellation(&mut self, tessellation: TessellationHandle) {
        self.tessellations.remove(&tessellation);
    }

    fn begin_pass(&mut self, pass: TerrainRenderPass, matrices: &ChunkRenderMatrices) {
        self.active_pass = Some(pass);
        self.passes.entry(pass).or_default().clear();
        self.queue
            .write_buffer(&self.matrices, 0, bytemuck::bytes_of(matrices));
    }

    fn set_region_offset(&mut self, offset: [f32; 3]) {
        self.region_offset = offset;
    }

    #[allow(clippy::cast_possible_truncation)]
    fn multi_draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        _index_type: IndexType,
        commands: &[DrawCommand],
    ) {
        let first = self.indirect_args.len() as u32;
        self.indirect_args
            .extend(commands.iter().copied().map(DrawIndexedIndirectArgs::from));

        self.record(RecordedDraw::Multi {
            tessellation,
            offset: self.region_offset,
            first,
            count: commands.len() as u32,
        });
    }

    fn draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        _index_type: IndexType,
        command: DrawCommand,
    ) {
        self.record(RecordedDraw::Single {
            tessellation,
            offset: self.region_offset,
            command,
        });
    }

    fn end_pass(&mut self) {
        self.active_pass = None;
    }
}
