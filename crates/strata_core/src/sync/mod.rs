//! # Frame-Round Buffering
//!
//! ## The Problem
//!
//! ```text
//! Breadth-first search over a graph, once per frame:
//!   - nodes of round N are expanded
//!   - their neighbors must wait for round N+1
//! ```
//!
//! A single ring buffer works but blurs round boundaries, and allocating a
//! fresh frontier per round puts the allocator on the hot path.
//!
//! ## The Solution: Double Buffering
//!
//! Two vectors, swapped between rounds. Storage is kept across frames.

mod double_buffer;

pub use double_buffer::DoubleBufferedQueue;
