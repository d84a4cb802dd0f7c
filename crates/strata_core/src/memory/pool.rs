//! # Pool Allocator
//!
//! Generational slot pool for long-lived objects that reference each other by handle.

/// A pool allocator handing out generational handles.
///
/// Slots are reused after being freed, but every reuse bumps the slot's
/// generation, so a handle that outlived its object resolves to `None`
/// instead of aliasing whatever now lives in the slot. This is what makes it
/// safe to store handles as non-owning links between objects (e.g. the
/// adjacency links of the section graph).
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is owned by the render thread.
///
/// # Example
///
/// ```rust
/// use strata_core::PoolAllocator;
///
/// let mut pool: PoolAllocator<&str> = PoolAllocator::new(16);
///
/// let handle = pool.allocate("section");
/// assert_eq!(pool.get(handle), Some(&"section"));
///
/// pool.free(handle);
/// assert!(pool.get(handle).is_none());
/// ```
#[derive(Debug)]
pub struct PoolAllocator<T> {
    /// The storage array.
    slots: Vec<Slot<T>>,
    /// Free list - indices of available slots.
    free_list: Vec<u32>,
    /// Number of allocated objects.
    allocated_count: usize,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Handle to an allocated object in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle {
    /// Index into the pool.
    index: u32,
    /// Generation of the slot when the handle was issued.
    generation: u32,
}

impl PoolHandle {
    /// A handle that never resolves in any pool.
    pub const DANGLING: Self = Self {
        index: u32::MAX,
        generation: u32::MAX,
    };

    /// Returns the slot index of this handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Returns the generation of this handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> PoolAllocator<T> {
    /// Creates a new pool with room for `capacity` objects before it has to grow.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity),
            allocated_count: 0,
        }
    }

    /// Returns the number of slots the pool has ever created.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of currently allocated objects.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns true if no object is allocated.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Stores the object and returns its handle.
    ///
    /// Reuses a freed slot when one is available, otherwise grows the pool.
    ///
    /// # Panics
    ///
    /// Panics if the pool would exceed `u32::MAX` slots.
    pub fn allocate(&mut self, value: T) -> PoolHandle {
        self.allocated_count += 1;

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);

            return PoolHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = u32::try_from(self.slots.len()).expect("pool exceeded u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });

        PoolHandle {
            index,
            generation: 0,
        }
    }

    /// Frees an allocated object.
    ///
    /// Returns the freed object, or `None` if the handle is stale.
    pub fn free(&mut self, handle: PoolHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;

        if slot.generation != handle.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.allocated_count -= 1;

        Some(value)
    }

    /// Returns true if the handle refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Gets a reference to an allocated object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;

        if slot.generation != handle.generation {
            return None;
        }

        slot.value.as_ref()
    }

    /// Gets a mutable reference to an allocated object.
    #[inline]
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;

        if slot.generation != handle.generation {
            return None;
        }

        slot.value.as_mut()
    }

    /// Frees every object, invalidating all outstanding handles.
    pub fn clear(&mut self) {
        self.free_list.clear();

        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            // Slot count is bounded by `allocate`.
            #[allow(clippy::cast_possible_truncation)]
            self.free_list.push(index as u32);
        }

        self.allocated_count = 0;
    }

    /// Iterates over all allocated objects.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                #[allow(clippy::cast_possible_truncation)]
                let handle = PoolHandle {
                    index: index as u32,
                    generation: slot.generation,
                };
                (handle, value)
            })
        })
    }

    /// Iterates mutably over all allocated objects.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                #[allow(clippy::cast_possible_truncation)]
                let handle = PoolHandle {
                    index: index as u32,
                    generation,
                };
                (handle, value)
            })
        })
    }
}

impl<T> Default for PoolAllocator<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_allocate_free() {
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(10);

        let h1 = pool.allocate(42);
        assert_eq!(*pool.get(h1).unwrap(), 42);
        assert_eq!(pool.allocated_count(), 1);

        let freed = pool.free(h1).unwrap();
        assert_eq!(freed, 42);
        assert_eq!(pool.allocated_count(), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_pool_grows_past_initial_capacity() {
        let mut pool: PoolAllocator<u8> = PoolAllocator::new(2);

        let handles: Vec<_> = (0..5).map(|i| pool.allocate(i)).collect();
        assert_eq!(pool.allocated_count(), 5);
        assert_eq!(pool.get(handles[4]), Some(&4));
    }

    #[test]
    fn test_pool_reuse_bumps_generation() {
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(1);

        let h1 = pool.allocate(1);
        pool.free(h1);

        let h2 = pool.allocate(2);
        assert_eq!(h1.index(), h2.index()); // Same slot reused
        assert_ne!(h1.generation(), h2.generation());

        // The stale handle must not see the new object.
        assert!(pool.get(h1).is_none());
        assert!(pool.free(h1).is_none());
        assert_eq!(*pool.get(h2).unwrap(), 2);
    }

    #[test]
    fn test_pool_clear_invalidates_handles() {
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(4);
        let a = pool.allocate(1);
        let b = pool.allocate(2);

        pool.clear();

        assert!(pool.is_empty());
        assert!(!pool.contains(a));
        assert!(!pool.contains(b));
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn test_pool_iteration_skips_freed() {
        let mut pool: PoolAllocator<u32> = PoolAllocator::new(4);
        let a = pool.allocate(10);
        let _b = pool.allocate(20);
        pool.free(a);

        let values: Vec<u32> = pool.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![20]);

        for (_, value) in pool.iter_mut() {
            *value += 1;
        }
        assert_eq!(pool.iter().map(|(_, v)| *v).sum::<u32>(), 21);
    }
}
