//! # Geometry Arena
//!
//! Sub-allocator over one device vertex buffer, in units of vertices.
//!
//! Allocation is first fit over a sorted free list. When nothing fits, the
//! arena moves to a larger buffer: the old contents are copied to the same
//! offsets, so existing allocations stay valid, but the buffer handle changes
//! and anything bound to the old handle must be rebuilt.

use tracing::debug;

use crate::device::{BufferHandle, BufferUsage, RenderDevice};
use crate::error::{RenderError, RenderResult};

/// A run of vertices owned by one section mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArenaAllocation {
    /// First vertex.
    pub offset: u32,
    /// Number of vertices.
    pub count: u32,
}

impl ArenaAllocation {
    /// One past the last vertex.
    #[inline]
    #[must_use]
    pub const fn end(self) -> u32 {
        self.offset + self.count
    }
}

/// Result of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaUpload {
    /// Where the data landed.
    pub allocation: ArenaAllocation,
    /// True if the arena moved to a new buffer to make room.
    pub resized: bool,
}

/// Growable vertex buffer with sub-allocations.
#[derive(Debug)]
pub struct GeometryArena {
    buffer: BufferHandle,
    label: &'static str,
    stride: u32,
    capacity: u32,
    used: u32,
    free: Vec<ArenaAllocation>,
}

impl GeometryArena {
    /// Creates an arena with room for `capacity` vertices of `stride` bytes.
    pub fn new<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &'static str,
        capacity: u32,
        stride: u32,
    ) -> Self {
        let buffer = device.create_buffer(label, BufferUsage::Vertex);
        device.allocate_storage(buffer, u64::from(capacity) * u64::from(stride));

        Self {
            buffer,
            label,
            stride,
            capacity,
            used: 0,
            free: vec![ArenaAllocation {
                offset: 0,
                count: capacity,
            }],
        }
    }

    /// Current device buffer.
    #[inline]
    #[must_use]
    pub const fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Bytes per vertex.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// Capacity in vertices.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Vertices in live allocations.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.used
    }

    /// Returns true if no allocation is live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Copies vertex bytes into the arena, growing it if needed.
    ///
    /// # Errors
    ///
    /// Fails if the data is not a whole number of vertices or the arena
    /// cannot address the required size.
    pub fn upload<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        data: &[u8],
    ) -> RenderResult<ArenaUpload> {
        let stride = self.stride as usize;
        if data.is_empty() || data.len() % stride != 0 {
            return Err(RenderError::MisalignedVertexData {
                len: data.len(),
                stride: self.stride,
            });
        }

        let count = u32::try_from(data.len() / stride).map_err(|_| RenderError::ArenaExhausted {
            requested: (data.len() / stride) as u64,
            capacity: self.capacity,
        })?;

        let mut resized = false;
        let allocation = match self.try_allocate(count) {
            Some(allocation) => allocation,
            None => {
                self.grow(device, count)?;
                resized = true;
                self.try_allocate(count).ok_or(RenderError::ArenaExhausted {
                    requested: u64::from(count),
                    capacity: self.capacity,
                })?
            }
        };

        device.upload_buffer(self.buffer, self.byte_offset(allocation.offset), data);

        Ok(ArenaUpload {
            allocation,
            resized,
        })
    }

    /// Returns an allocation to the free list.
    pub fn free(&mut self, allocation: ArenaAllocation) {
        self.used -= allocation.count;

        let position = self
            .free
            .partition_point(|range| range.offset < allocation.offset);
        self.free.insert(position, allocation);

        // Merge with the following range, then the preceding one.
        if position + 1 < self.free.len() && self.free[position].end() == self.free[position + 1].offset {
            self.free[position].count += self.free[position + 1].count;
            self.free.remove(position + 1);
        }
        if position > 0 && self.free[position - 1].end() == self.free[position].offset {
            self.free[position - 1].count += self.free[position].count;
            self.free.remove(position);
        }
    }

    /// Releases the device buffer.
    pub fn delete<D: RenderDevice + ?Sized>(self, device: &mut D) {
        device.delete_buffer(self.buffer);
    }

    fn byte_offset(&self, vertex: u32) -> u64 {
        u64::from(vertex) * u64::from(self.stride)
    }

    fn try_allocate(&mut self, count: u32) -> Option<ArenaAllocation> {
        let position = self.free.iter().position(|range| range.count >= count)?;
        let range = &mut self.free[position];

        let allocation = ArenaAllocation {
            offset: range.offset,
            count,
        };

        range.offset += count;
        range.count -= count;
        if range.count == 0 {
            self.free.remove(position);
        }

        self.used += count;
        Some(allocation)
    }

    fn grow<D: RenderDevice + ?Sized>(&mut self, device: &mut D, count: u32) -> RenderResult<()> {
        let exhausted = RenderError::ArenaExhausted {
            requested: u64::from(count),
            capacity: self.capacity,
        };

        let required = self.capacity.checked_add(count).ok_or(exhausted)?;
        let new_capacity = self.capacity.saturating_mul(2).max(required);

        let new_buffer = device.create_buffer(self.label, BufferUsage::Vertex);
        device.allocate_storage(new_buffer, u64::from(new_capacity) * u64::from(self.stride));
        if self.capacity > 0 {
            device.copy_buffer(self.buffer, new_buffer, 0, 0, self.byte_offset(self.capacity));
        }
        device.delete_buffer(self.buffer);

        debug!(
            label = self.label,
            from = self.capacity,
            to = new_capacity,
            "Grew geometry arena"
        );

        let added = ArenaAllocation {
            offset: self.capacity,
            count: new_capacity - self.capacity,
        };
        match self.free.last_mut() {
            Some(last) if last.end() == added.offset => last.count += added.count,
            _ => self.free.push(added),
        }

        self.buffer = new_buffer;
        self.capacity = new_capacity;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    fn vertices(count: usize, fill: u8) -> Vec<u8> {
        vec![fill; count * 4]
    }

    #[test]
    fn test_first_fit_and_reuse() {
        let mut device = HeadlessDevice::new();
        let mut arena = GeometryArena::new(&mut device, "test", 16, 4);

        let a = arena.upload(&mut device, &vertices(4, 1)).unwrap().allocation;
        let b = arena.upload(&mut device, &vertices(4, 2)).unwrap().allocation;
        assert_eq!((a.offset, b.offset), (0, 4));
        assert_eq!(arena.used(), 8);

        arena.free(a);
        let c = arena.upload(&mut device, &vertices(2, 3)).unwrap().allocation;
        assert_eq!(c.offset, 0);

        arena.free(b);
        arena.free(c);
        assert!(arena.is_empty());

        // Everything merged back into one range.
        let d = arena.upload(&mut device, &vertices(16, 4)).unwrap();
        assert_eq!(d.allocation.offset, 0);
        assert!(!d.resized);
    }

    #[test]
    fn test_growth_preserves_contents() {
        let mut device = HeadlessDevice::new();
        let mut arena = GeometryArena::new(&mut device, "test", 4, 4);
        let old_buffer = arena.buffer();

        let a = arena.upload(&mut device, &vertices(3, 7)).unwrap();
        assert!(!a.resized);

        let b = arena.upload(&mut device, &vertices(3, 9)).unwrap();
        assert!(b.resized);
        assert_eq!(b.allocation.offset, 3);
        assert_eq!(arena.capacity(), 8);
        assert_ne!(arena.buffer(), old_buffer);
        assert!(device.buffer_data(old_buffer).is_none());

        let data = device.buffer_data(arena.buffer()).unwrap();
        assert_eq!(&data[..12], &[7; 12]);
        assert_eq!(&data[12..24], &[9; 12]);
        assert_eq!(device.invalid_operations(), 0);
    }

    #[test]
    fn test_rejects_partial_vertices() {
        let mut device = HeadlessDevice::new();
        let mut arena = GeometryArena::new(&mut device, "test", 4, 20);

        assert!(matches!(
            arena.upload(&mut device, &[0; 30]),
            Err(RenderError::MisalignedVertexData { len: 30, stride: 20 })
        ));
        assert!(arena.upload(&mut device, &[]).is_err());
    }
}
