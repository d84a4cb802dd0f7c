//! # Render Error Types
//!
//! Errors the terrain renderer can report.
//!
//! Everything in here is a caller bug or a bad configuration: expected
//! absence (unloaded neighbors, regions without geometry for a pass, empty
//! batches) is handled as ordinary control flow and never reaches this type.

use std::path::PathBuf;

use strata_core::SectionPos;
use thiserror::Error;

/// Errors that can occur in the terrain renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A region slot was already occupied when adding a section.
    #[error("section slot {index} of region {region:?} is already occupied")]
    SlotOccupied {
        /// Region coordinates.
        region: SectionPos,
        /// Local section index.
        index: u8,
    },

    /// A region slot was empty when removing a section.
    #[error("section slot {index} of region {region:?} is not loaded")]
    SlotEmpty {
        /// Region coordinates.
        region: SectionPos,
        /// Local section index.
        index: u8,
    },

    /// A region slot holds a different section than the one being removed.
    #[error("tried to remove the wrong section from slot {index} of region {region:?}")]
    SlotMismatch {
        /// Region coordinates.
        region: SectionPos,
        /// Local section index.
        index: u8,
    },

    /// A section was added twice to the graph.
    #[error("section {0:?} is already present in the graph")]
    DuplicateSection(SectionPos),

    /// A section handle did not resolve to a region.
    #[error("section {0:?} refers to an unknown region")]
    UnknownRegion(SectionPos),

    /// The shared index buffer cannot address the requested number of elements.
    #[error("index buffer cannot hold {requested} primitives (limit {limit})")]
    IndexBufferCapacity {
        /// Primitives requested.
        requested: u32,
        /// Maximum primitives for the configured index type.
        limit: u32,
    },

    /// The geometry arena cannot grow any further.
    #[error("geometry arena exhausted: needed {requested} vertices, capacity {capacity}")]
    ArenaExhausted {
        /// Vertices requested.
        requested: u64,
        /// Current capacity in vertices.
        capacity: u32,
    },

    /// Uploaded vertex bytes are not a whole number of vertices.
    #[error("vertex data of {len} bytes is not a multiple of the {stride}-byte stride")]
    MisalignedVertexData {
        /// Length of the data.
        len: usize,
        /// Vertex stride.
        stride: u32,
    },

    /// A facing range reaches past the end of its mesh's vertex data.
    #[error("vertex range {start}+{count} exceeds the mesh's {vertices} vertices")]
    VertexRangeOutOfBounds {
        /// First vertex of the range.
        start: u32,
        /// Vertices in the range.
        count: u32,
        /// Vertices in the mesh.
        vertices: u64,
    },

    /// The configuration file could not be read.
    #[error("failed to read renderer config {path:?}: {source}")]
    ConfigIo {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration could not be parsed.
    #[error("failed to parse renderer config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration could not be serialized.
    #[error("failed to serialize renderer config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// The configuration parsed but holds unusable values.
    #[error("invalid renderer configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
