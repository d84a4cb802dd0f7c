//! CPU-only [`RenderDevice`] that keeps buffer contents in memory and
//! records every command. Used by tests, benchmarks and headless tools.

use std::collections::HashMap;

use tracing::warn;

use super::{
    BufferHandle, BufferUsage, ChunkRenderMatrices, DeviceCapabilities, DrawCommand,
    RenderDevice, TessellationDescriptor, TessellationHandle,
};
use crate::chunk::index_buffer::IndexType;
use crate::chunk::TerrainRenderPass;

/// A recorded device call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// A buffer was created.
    CreateBuffer {
        /// New buffer.
        buffer: BufferHandle,
        /// Bind usage.
        usage: BufferUsage,
    },
    /// A buffer's storage was replaced.
    AllocateStorage {
        /// Target buffer.
        buffer: BufferHandle,
        /// New size in bytes.
        size: u64,
    },
    /// Bytes were written.
    Upload {
        /// Target buffer.
        buffer: BufferHandle,
        /// Byte offset.
        offset: u64,
        /// Bytes written.
        len: u64,
    },
    /// Bytes were copied between buffers.
    Copy {
        /// Source buffer.
        src: BufferHandle,
        /// Destination buffer.
        dst: BufferHandle,
        /// Bytes copied.
        size: u64,
    },
    /// A buffer was destroyed.
    DeleteBuffer(BufferHandle),
    /// A tessellation was created.
    CreateTessellation(TessellationHandle),
    /// A tessellation was destroyed.
    DeleteTessellation(TessellationHandle),
    /// A pass began.
    BeginPass(TerrainRenderPass),
    /// The region offset uniform changed.
    SetRegionOffset([f32; 3]),
    /// A multi-draw was issued.
    MultiDraw {
        /// Bound tessellation.
        tessellation: TessellationHandle,
        /// Draws in the call.
        commands: Vec<DrawCommand>,
    },
    /// A single draw was issued.
    Draw {
        /// Bound tessellation.
        tessellation: TessellationHandle,
        /// The draw.
        command: DrawCommand,
    },
    /// The pass ended.
    EndPass,
}

#[derive(Debug)]
struct HeadlessBuffer {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// In-memory device.
#[derive(Debug)]
pub struct HeadlessDevice {
    capabilities: DeviceCapabilities,
    buffers: HashMap<BufferHandle, HeadlessBuffer>,
    tessellations: HashMap<TessellationHandle, TessellationDescriptor>,
    next_buffer: u32,
    next_tessellation: u32,
    active_pass: Option<TerrainRenderPass>,
    commands: Vec<DeviceCommand>,
    invalid_operations: u32,
}

impl HeadlessDevice {
    /// Creates a device that supports multi-draw.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(DeviceCapabilities { multi_draw: true })
    }

    /// Creates a device with the given capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: DeviceCapabilities) -> Self {
        Self {
            capabilities,
            buffers: HashMap::new(),
            tessellations: HashMap::new(),
            next_buffer: 0,
            next_tessellation: 0,
            active_pass: None,
            commands: Vec::new(),
            invalid_operations: 0,
        }
    }

    /// Contents of a buffer.
    #[must_use]
    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// Size of a buffer in bytes.
    #[must_use]
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<u64> {
        self.buffers.get(&buffer).map(|b| b.data.len() as u64)
    }

    /// Usage a buffer was created with.
    #[must_use]
    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(&buffer).map(|b| b.usage)
    }

    /// Number of live buffers.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live tessellations.
    #[must_use]
    pub fn tessellation_count(&self) -> usize {
        self.tessellations.len()
    }

    /// Descriptor of a live tessellation.
    #[must_use]
    pub fn tessellation(&self, tessellation: TessellationHandle) -> Option<&TessellationDescriptor> {
        self.tessellations.get(&tessellation)
    }

    /// Every recorded command since the last [`clear_commands`](Self::clear_commands).
    #[must_use]
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Forgets the recorded commands.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of draw calls recorded (a multi-draw counts once).
    #[must_use]
    pub fn draw_call_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::MultiDraw { .. } | DeviceCommand::Draw { .. }))
            .count()
    }

    /// Every draw command recorded, flattened.
    #[must_use]
    pub fn draw_commands(&self) -> Vec<DrawCommand> {
        let mut draws = Vec::new();
        for command in &self.commands {
            match command {
                DeviceCommand::MultiDraw { commands, .. } => draws.extend_from_slice(commands),
                DeviceCommand::Draw { command, .. } => draws.push(*command),
                _ => {}
            }
        }
        draws
    }

    /// Calls that referenced dead handles or drew outside a pass.
    #[must_use]
    pub const fn invalid_operations(&self) -> u32 {
        self.invalid_operations
    }

    fn invalid(&mut self, what: &str) {
        warn!(what, "Invalid headless device operation");
        self.invalid_operations += 1;
    }

    fn validate_draw(
        &mut self,
        tessellation: TessellationHandle,
        index_type: IndexType,
        command: DrawCommand,
    ) {
        if self.active_pass.is_none() {
            self.invalid("draw outside of a pass");
        }

        let Some(descriptor) = self.tessellations.get(&tessellation).copied() else {
            self.invalid("draw with a deleted tessellation");
            return;
        };

        if descriptor.index_type != index_type {
            self.invalid("draw with a mismatched index type");
        }

        let index_bytes = u64::from(command.element_count) * u64::from(index_type.bytes_per_element());
        match self.buffer_size(descriptor.index_buffer) {
            Some(size) if size >= index_bytes => {}
            Some(_) => self.invalid("draw reads past the end of the index buffer"),
            None => self.invalid("draw with a deleted index buffer"),
        }

        if self.buffer_size(descriptor.vertex_buffer).is_none() {
            self.invalid("draw with a deleted vertex buffer");
        }
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for HeadlessDevice {
    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_buffer(&mut self, _label: &str, usage: BufferUsage) -> BufferHandle {
        let buffer = BufferHandle(self.next_buffer);
        self.next_buffer += 1;

        self.buffers.insert(
            buffer,
            HeadlessBuffer {
                usage,
                data: Vec::new(),
            },
        );
        self.commands.push(DeviceCommand::CreateBuffer { buffer, usage });
        buffer
    }

    #[allow(clippy::cast_possible_truncation)]
    fn allocate_storage(&mut self, buffer: BufferHandle, size: u64) {
        self.commands.push(DeviceCommand::AllocateStorage { buffer, size });

        match self.buffers.get_mut(&buffer) {
            Some(target) => {
                target.data.clear();
                target.data.resize(size as usize, 0);
            }
            None => self.invalid("allocate storage for a deleted buffer"),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn upload_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.commands.push(DeviceCommand::Upload {
            buffer,
            offset,
            len: data.len() as u64,
        });

        let Some(target) = self.buffers.get_mut(&buffer) else {
            self.invalid("upload to a deleted buffer");
            return;
        };

        let start = offset as usize;
        let Some(slot) = target.data.get_mut(start..start + data.len()) else {
            self.invalid("upload past the end of a buffer");
            return;
        };
        slot.copy_from_slice(data);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn copy_buffer(
        &mut self,
        src: BufferHandle,
        dst: BufferHandle,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    ) {
        self.commands.push(DeviceCommand::Copy { src, dst, size });

        let (src_start, dst_start, len) = (src_offset as usize, dst_offset as usize, size as usize);
        let Some(bytes) = self
            .buffers
            .get(&src)
            .and_then(|b| b.data.get(src_start..src_start + len))
            .map(<[u8]>::to_vec)
        else {
            self.invalid("copy from outside a source buffer");
            return;
        };

        let Some(slot) = self
            .buffers
            .get_mut(&dst)
            .and_then(|b| b.data.get_mut(dst_start..dst_start + len))
        else {
            self.invalid("copy to outside a destination buffer");
            return;
        };
        slot.copy_from_slice(&bytes);
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(DeviceCommand::DeleteBuffer(buffer));
        if self.buffers.remove(&buffer).is_none() {
            self.invalid("delete of a deleted buffer");
        }
    }

    fn create_tessellation(&mut self, descriptor: &TessellationDescriptor) -> TessellationHandle {
        let tessellation = TessellationHandle(self.next_tessellation);
        self.next_tessellation += 1;

        if !self.buffers.contains_key(&descriptor.vertex_buffer)
            || !self.buffers.contains_key(&descriptor.index_buffer)
        {
            self.invalid("tessellation over a deleted buffer");
        }

        self.tessellations.insert(tessellation, *descriptor);
        self.commands.push(DeviceCommand::CreateTessellation(tessellation));
        tessellation
    }

    fn delete_tessellation(&mut self, tessellation: TessellationHandle) {
        self.commands.push(DeviceCommand::DeleteTessellation(tessellation));
        if self.tessellations.remove(&tessellation).is_none() {
            self.invalid("delete of a deleted tessellation");
        }
    }

    fn begin_pass(&mut self, pass: TerrainRenderPass, _matrices: &ChunkRenderMatrices) {
        if self.active_pass.is_some() {
            self.invalid("pass begun inside another pass");
        }
        self.active_pass = Some(pass);
        self.commands.push(DeviceCommand::BeginPass(pass));
    }

    fn set_region_offset(&mut self, offset: [f32; 3]) {
        self.commands.push(DeviceCommand::SetRegionOffset(offset));
    }

    fn multi_draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        index_type: IndexType,
        commands: &[DrawCommand],
    ) {
        if !self.capabilities.multi_draw {
            self.invalid("multi-draw without device support");
        }
        for command in commands {
            self.validate_draw(tessellation, index_type, *command);
        }

        self.commands.push(DeviceCommand::MultiDraw {
            tessellation,
            commands: commands.to_vec(),
        });
    }

    fn draw_elements_base_vertex(
        &mut self,
        tessellation: TessellationHandle,
        index_type: IndexType,
        command: DrawCommand,
    ) {
        self.validate_draw(tessellation, index_type, command);
        self.commands.push(DeviceCommand::Draw {
            tessellation,
            command,
        });
    }

    fn end_pass(&mut self) {
        if self.active_pass.take().is_none() {
            self.invalid("end of a pass that was never begun");
        }
        self.commands.push(DeviceCommand::EndPass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_and_copy() {
        let mut device = HeadlessDevice::new();
        let a = device.create_buffer("a", BufferUsage::Vertex);
        let b = device.create_buffer("b", BufferUsage::Vertex);

        device.allocate_storage(a, 8);
        device.allocate_storage(b, 8);
        device.upload_buffer(a, 2, &[1, 2, 3]);
        device.copy_buffer(a, b, 0, 4, 4);

        assert_eq!(device.buffer_data(a).unwrap(), &[0, 0, 1, 2, 3, 0, 0, 0]);
        assert_eq!(device.buffer_data(b).unwrap(), &[0, 0, 0, 0, 0, 0, 1, 2]);
        assert_eq!(device.invalid_operations(), 0);
    }

    #[test]
    fn test_out_of_bounds_upload_is_flagged() {
        let mut device = HeadlessDevice::new();
        let a = device.create_buffer("a", BufferUsage::Vertex);
        device.allocate_storage(a, 2);
        device.upload_buffer(a, 1, &[1, 2]);

        assert_eq!(device.invalid_operations(), 1);
    }

    #[test]
    fn test_deleted_handles_are_flagged() {
        let mut device = HeadlessDevice::new();
        let a = device.create_buffer("a", BufferUsage::Index);
        device.delete_buffer(a);
        device.delete_buffer(a);
        device.end_pass();

        assert_eq!(device.invalid_operations(), 2);
        assert_eq!(device.buffer_count(), 0);
    }
}
