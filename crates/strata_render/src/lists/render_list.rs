//! Per-frame render lists.
//!
//! ```text
//! SortedRenderLists:  [region 7] [region 2] [region 9] ...   (BFS order)
//!                          │
//!                          ▼
//! ChunkRenderList:    [slot 35] [slot 36] [slot 3] ...        (BFS order)
//! ```
//!
//! Translucent passes walk both levels back to front.

use std::iter::FusedIterator;
use std::slice;

use crate::region::{LocalSectionIndex, RegionId, REGION_SIZE};

/// Slice iterator that can run in either direction.
#[derive(Debug, Clone)]
pub struct ReversibleIter<'a, T> {
    inner: slice::Iter<'a, T>,
    reverse: bool,
}

impl<'a, T> ReversibleIter<'a, T> {
    fn new(items: &'a [T], reverse: bool) -> Self {
        Self {
            inner: items.iter(),
            reverse,
        }
    }
}

impl<T: Copy> Iterator for ReversibleIter<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        if self.reverse {
            self.inner.next_back().copied()
        } else {
            self.inner.next().copied()
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Copy> ExactSizeIterator for ReversibleIter<'_, T> {}
impl<T: Copy> FusedIterator for ReversibleIter<'_, T> {}

/// Slots of one region that have geometry and were reached this frame.
#[derive(Debug, Clone)]
pub struct ChunkRenderList {
    sections: [u8; REGION_SIZE],
    count: usize,
    last_visible_frame: u32,
}

impl ChunkRenderList {
    /// Empty list that has never been used.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: [0; REGION_SIZE],
            count: 0,
            last_visible_frame: u32::MAX,
        }
    }

    /// Empties the list and stamps it with the current frame.
    #[inline]
    pub fn reset(&mut self, frame: u32) {
        self.count = 0;
        self.last_visible_frame = frame;
    }

    /// Frame of the last reset.
    #[inline]
    #[must_use]
    pub const fn last_visible_frame(&self) -> u32 {
        self.last_visible_frame
    }

    /// Appends a slot.
    ///
    /// # Panics
    ///
    /// Panics if more slots are added than a region has.
    #[inline]
    pub fn add(&mut self, index: LocalSectionIndex) {
        self.sections[self.count] = index.raw();
        self.count += 1;
    }

    /// Slots in insertion order, or reversed.
    pub fn sections_with_geometry(
        &self,
        reverse: bool,
    ) -> impl ExactSizeIterator<Item = LocalSectionIndex> + '_ {
        ReversibleIter::new(&self.sections[..self.count], reverse).map(LocalSectionIndex::from_raw)
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no slot was added since the last reset.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for ChunkRenderList {
    fn default() -> Self {
        Self::new()
    }
}

/// Regions with a render list this frame, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct SortedRenderLists {
    regions: Vec<RegionId>,
}

impl SortedRenderLists {
    /// Empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Appends a region.
    pub fn push(&mut self, region: RegionId) {
        self.regions.push(region);
    }

    /// Regions front to back, or back to front.
    #[must_use]
    pub fn iter(&self, reverse: bool) -> ReversibleIter<'_, RegionId> {
        ReversibleIter::new(&self.regions, reverse)
    }

    /// Number of regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns true if no region was reached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
