//! # STRATA Core
//!
//! Engine-agnostic building blocks for the terrain renderer:
//! - Generational slot pools for graph-shaped data
//! - Double-buffered frontier queues for per-frame graph searches
//! - Packed section coordinates
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations in hot path** - buffers are reused across frames
//! 2. **Handles, not pointers** - cyclic structures are expressed with pool handles
//! 3. **Single owner** - everything here is owned by the render thread

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod coords;
pub mod memory;
pub mod sync;

pub use coords::{SectionPos, SECTION_SHIFT, SECTION_SIZE};
pub use memory::{PoolAllocator, PoolHandle};
pub use sync::DoubleBufferedQueue;
