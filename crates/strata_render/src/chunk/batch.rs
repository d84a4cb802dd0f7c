//! Reusable multi-draw command batch.

use crate::device::DrawCommand;

/// Flat list of `(base vertex, element count)` pairs for one draw call.
///
/// Capacity is fixed at construction; the batch is cleared and refilled for
/// every region and never reallocates.
#[derive(Debug)]
pub struct MultiDrawBatch {
    commands: Vec<DrawCommand>,
    capacity: usize,
    index_buffer_size: u32,
}

impl MultiDrawBatch {
    /// Creates an empty batch that can hold `capacity` commands.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
            capacity,
            index_buffer_size: 0,
        }
    }

    /// Removes every command.
    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
        self.index_buffer_size = 0;
    }

    /// Appends a command.
    ///
    /// # Panics
    ///
    /// Panics if the batch is full. Callers size the batch for the worst case.
    #[inline]
    pub fn push(&mut self, base_vertex: i32, element_count: u32) {
        assert!(
            self.commands.len() < self.capacity,
            "multi-draw batch overflow (capacity {})",
            self.capacity
        );

        self.commands.push(DrawCommand {
            base_vertex,
            element_count,
        });
        self.index_buffer_size = self.index_buffer_size.max(element_count);
    }

    /// Commands in insertion order.
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if the batch holds no commands.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Maximum number of commands.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest element count in the batch; the shared index buffer must hold
    /// at least this many indices.
    #[inline]
    #[must_use]
    pub const fn index_buffer_size(&self) -> u32 {
        self.index_buffer_size
    }
}
