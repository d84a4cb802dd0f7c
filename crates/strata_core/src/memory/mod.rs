//! # Memory Management
//!
//! Handle-based storage for the render thread's long-lived objects.
//!
//! ## Design Philosophy
//!
//! Objects that form graphs (sections, regions) live in pools and refer to
//! each other through generational handles, never through owning pointers.
//! Removing a node is one pool free plus clearing the links that point at it.

mod pool;

pub use pool::{PoolAllocator, PoolHandle};
