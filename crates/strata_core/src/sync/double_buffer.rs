//! # Double-Buffered Queue
//!
//! Two reusable buffers swapped once per round. One round's writes become
//! the next round's reads.
//!
//! ```text
//!   round N:    read ──► [a b c]      write ──► [d e]
//!   flip()
//!   round N+1:  read ──► [d e]        write ──► []
//! ```
//!
//! Neither buffer is ever shrunk, so after warm-up a breadth-first search
//! over a stable graph performs no allocations.

/// A FIFO split into a read half and a write half.
///
/// Items enqueued during a round are only visible after the next [`flip`].
///
/// [`flip`]: DoubleBufferedQueue::flip
#[derive(Debug)]
pub struct DoubleBufferedQueue<T> {
    read: Vec<T>,
    write: Vec<T>,
    /// Position of the next item to dequeue from `read`.
    cursor: usize,
}

impl<T: Copy> DoubleBufferedQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty queue with room for `capacity` items per half.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            read: Vec::with_capacity(capacity),
            write: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Drops all queued items in both halves, keeping their storage.
    pub fn reset(&mut self) {
        self.read.clear();
        self.write.clear();
        self.cursor = 0;
    }

    /// Appends an item to the write half.
    #[inline]
    pub fn enqueue(&mut self, item: T) {
        self.write.push(item);
    }

    /// Takes the next item from the read half.
    #[inline]
    pub fn dequeue(&mut self) -> Option<T> {
        let item = self.read.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(item)
    }

    /// Makes the write half readable and starts an empty write half.
    ///
    /// Returns false when there is nothing to read, which ends the search.
    pub fn flip(&mut self) -> bool {
        std::mem::swap(&mut self.read, &mut self.write);
        self.write.clear();
        self.cursor = 0;

        !self.read.is_empty()
    }

    /// Number of items left to dequeue in the current round.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.read.len() - self.cursor
    }

    /// Number of items written for the next round.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.write.len()
    }
}

impl<T: Copy> Default for DoubleBufferedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_visible_after_flip() {
        let mut queue = DoubleBufferedQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);

        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.pending(), 2);

        assert!(queue.flip());
        assert_eq!(queue.remaining(), 2);
        assert_eq!(queue.dequeue(), Some(1));

        queue.enqueue(3);
        assert_eq!(queue.dequeue(), Some(2));
        assert_eq!(queue.dequeue(), None);

        assert!(queue.flip());
        assert_eq!(queue.dequeue(), Some(3));
        assert!(!queue.flip());
    }

    #[test]
    fn test_reset_discards_everything() {
        let mut queue = DoubleBufferedQueue::with_capacity(8);
        queue.enqueue(7u32);
        queue.flip();
        queue.enqueue(8u32);

        queue.reset();

        assert_eq!(queue.dequeue(), None);
        assert!(!queue.flip());
    }
}
