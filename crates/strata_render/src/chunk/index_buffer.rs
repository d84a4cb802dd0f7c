//! # Shared Quad Index Buffer
//!
//! One index buffer shared by every chunk draw. It holds the pattern
//! `0 1 2 2 3 0` for each quad, offset by 4 vertices per quad:
//!
//! ```text
//!   quad q:  4q  4q+1  4q+2  4q+2  4q+3  4q
//! ```
//!
//! Draws address their vertices with a base vertex, so the same indices serve
//! every section. The buffer grows on demand and never shrinks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::{BufferHandle, BufferUsage, RenderDevice};
use crate::error::{RenderError, RenderResult};

/// Indices per quad.
pub const ELEMENTS_PER_PRIMITIVE: u32 = 6;

/// Vertices per quad.
pub const VERTICES_PER_PRIMITIVE: u32 = 4;

/// Extra quads allocated past the requested count when growing.
const GROWTH_SLACK: u32 = 16_384;

/// Width of the indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// 16-bit indices; addresses at most 65536 vertices per draw.
    U16,
    /// 32-bit indices.
    U32,
}

impl IndexType {
    /// Bytes per index.
    #[inline]
    #[must_use]
    pub const fn bytes_per_element(self) -> u32 {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    /// Largest vertex count a draw can address.
    #[inline]
    #[must_use]
    pub const fn max_vertex_count(self) -> u32 {
        match self {
            Self::U16 => 64 * 1024,
            Self::U32 => i32::MAX as u32,
        }
    }

    /// Largest number of quads the buffer may hold.
    #[inline]
    #[must_use]
    pub const fn max_primitive_count(self) -> u32 {
        self.max_vertex_count() / VERTICES_PER_PRIMITIVE
    }

    /// Largest number of indices a single draw may request.
    #[inline]
    #[must_use]
    pub const fn max_element_count(self) -> u32 {
        self.max_primitive_count() * ELEMENTS_PER_PRIMITIVE
    }

    /// Generates the index bytes for `primitive_count` quads.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn create_index_data(self, primitive_count: u32) -> Vec<u8> {
        let element_count = primitive_count as usize * ELEMENTS_PER_PRIMITIVE as usize;
        let mut data = Vec::with_capacity(element_count * self.bytes_per_element() as usize);

        for quad in 0..primitive_count {
            let base = quad * VERTICES_PER_PRIMITIVE;
            for offset in [0, 1, 2, 2, 3, 0] {
                let index = base + offset;
                match self {
                    Self::U16 => data.extend_from_slice(&(index as u16).to_le_bytes()),
                    Self::U32 => data.extend_from_slice(&index.to_le_bytes()),
                }
            }
        }

        data
    }
}

/// Lazily grown index buffer holding the quad pattern.
#[derive(Debug)]
pub struct SharedQuadIndexBuffer {
    buffer: BufferHandle,
    index_type: IndexType,
    primitive_count: u32,
}

impl SharedQuadIndexBuffer {
    /// Creates an empty buffer. Storage is allocated on the first
    /// [`ensure_capacity`](Self::ensure_capacity).
    pub fn new<D: RenderDevice + ?Sized>(device: &mut D, index_type: IndexType) -> Self {
        Self {
            buffer: device.create_buffer("shared_quad_index_buffer", BufferUsage::Index),
            index_type,
            primitive_count: 0,
        }
    }

    /// Grows the buffer so a draw of `element_count` indices is addressable.
    ///
    /// Returns true if the buffer was reallocated.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::IndexBufferCapacity`] if the count exceeds what
    /// the index width can address.
    pub fn ensure_capacity<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        element_count: u32,
    ) -> RenderResult<bool> {
        let max_primitives = self.index_type.max_primitive_count();
        if element_count > self.index_type.max_element_count() {
            return Err(RenderError::IndexBufferCapacity {
                requested: element_count.div_ceil(ELEMENTS_PER_PRIMITIVE),
                limit: max_primitives,
            });
        }

        let primitive_count = element_count.div_ceil(ELEMENTS_PER_PRIMITIVE);
        if primitive_count <= self.primitive_count {
            return Ok(false);
        }

        let new_count = self
            .primitive_count
            .saturating_mul(2)
            .max(primitive_count.saturating_add(GROWTH_SLACK))
            .min(max_primitives);

        self.grow(device, new_count);
        Ok(true)
    }

    fn grow<D: RenderDevice + ?Sized>(&mut self, device: &mut D, primitive_count: u32) {
        let data = self.index_type.create_index_data(primitive_count);

        // Storage is replaced behind the same handle, so tessellations that
        // reference this buffer stay valid.
        device.allocate_storage(self.buffer, data.len() as u64);
        device.upload_buffer(self.buffer, 0, &data);

        debug!(
            from = self.primitive_count,
            to = primitive_count,
            index_type = ?self.index_type,
            "Grew shared quad index buffer"
        );
        self.primitive_count = primitive_count;
    }

    /// Device buffer holding the indices.
    #[must_use]
    pub const fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Index width.
    #[must_use]
    pub const fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Quads currently addressable.
    #[must_use]
    pub const fn primitive_count(&self) -> u32 {
        self.primitive_count
    }

    /// Releases the device buffer.
    pub fn delete<D: RenderDevice + ?Sized>(self, device: &mut D) {
        device.delete_buffer(self.buffer);
    }
}
