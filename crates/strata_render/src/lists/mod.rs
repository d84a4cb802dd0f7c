//! Per-frame outputs of the traversal: render lists and rebuild queues.

mod collector;
mod render_list;

pub use collector::{RebuildQueues, VisibleChunkCollector};
pub use render_list::{ChunkRenderList, ReversibleIter, SortedRenderLists};
