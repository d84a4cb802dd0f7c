//! Mesh build results handed back by the build workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strata_core::SectionPos;

use super::facing::ModelQuadFacing;
use super::pass::TerrainRenderPass;
use crate::error::{RenderError, RenderResult};

/// Why a section is waiting for a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkUpdateType {
    /// The section has never been meshed.
    InitialBuild,
    /// The mesh is stale.
    Rebuild,
    /// The mesh is stale and the player is close enough to notice.
    ImportantRebuild,
}

impl ChunkUpdateType {
    /// Number of kinds.
    pub const COUNT: usize = 3;

    /// Kinds in queue order.
    pub const ALL: [Self; Self::COUNT] = [Self::InitialBuild, Self::Rebuild, Self::ImportantRebuild];

    /// Index of the kind.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Default cap on how many sections of this kind are queued per frame.
    #[must_use]
    pub const fn default_queue_limit(self) -> u32 {
        match self {
            Self::InitialBuild => 128,
            Self::Rebuild | Self::ImportantRebuild => u32::MAX,
        }
    }

    /// Returns true for rebuilds that should not wait behind others.
    #[must_use]
    pub const fn is_important(self) -> bool {
        matches!(self, Self::ImportantRebuild)
    }

    /// Combines a pending update with a new request, keeping the more urgent.
    #[must_use]
    pub const fn promote(current: Option<Self>, requested: Self) -> Self {
        match (current, requested) {
            (Some(Self::ImportantRebuild), _) | (_, Self::ImportantRebuild) => Self::ImportantRebuild,
            (Some(Self::InitialBuild), _) => Self::InitialBuild,
            _ => requested,
        }
    }
}

/// Shared flag that tells a build worker its result is no longer wanted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a live token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the build as cancelled.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns true if both tokens belong to the same build.
    #[must_use]
    pub fn same_build(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A section handed to a build worker.
#[derive(Debug, Clone)]
pub struct ChunkBuildTask {
    /// Section to mesh.
    pub section: SectionPos,
    /// Why it is being built.
    pub update: ChunkUpdateType,
    /// Token the worker checks before delivering its result, and returns
    /// with it in [`ChunkBuildOutput::token`].
    pub token: CancellationToken,
}

/// Vertices of one facing bucket inside a mesh's vertex data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexRange {
    /// First vertex, relative to the start of the mesh.
    pub vertex_start: u32,
    /// Number of vertices; always a multiple of four.
    pub vertex_count: u32,
}

impl VertexRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(vertex_start: u32, vertex_count: u32) -> Self {
        Self {
            vertex_start,
            vertex_count,
        }
    }
}

/// Geometry of one section for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltSectionMesh {
    /// Raw vertex bytes in the terrain vertex format.
    pub vertex_data: Vec<u8>,
    /// Vertex range per facing bucket.
    pub ranges: [Option<VertexRange>; ModelQuadFacing::COUNT],
}

impl BuiltSectionMesh {
    /// Buckets with at least one vertex.
    #[must_use]
    pub fn slice_mask(&self) -> u8 {
        self.ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| range.is_some_and(|r| r.vertex_count > 0))
            .fold(0, |mask, (facing, _)| mask | (1 << facing))
    }

    /// Checks that the vertex bytes hold whole vertices of `stride` bytes
    /// and that every facing range lies inside them.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::MisalignedVertexData`] or
    /// [`RenderError::VertexRangeOutOfBounds`].
    pub fn validate(&self, stride: u32) -> RenderResult<()> {
        let len = self.vertex_data.len();
        if stride == 0 || len % stride as usize != 0 {
            return Err(RenderError::MisalignedVertexData { len, stride });
        }

        let vertices = (len / stride as usize) as u64;
        for range in self.ranges.iter().flatten() {
            if u64::from(range.vertex_start) + u64::from(range.vertex_count) > vertices {
                return Err(RenderError::VertexRangeOutOfBounds {
                    start: range.vertex_start,
                    count: range.vertex_count,
                    vertices,
                });
            }
        }

        Ok(())
    }
}

/// Everything a worker produces for one section.
#[derive(Debug, Clone)]
pub struct ChunkBuildOutput {
    /// Section the meshes belong to.
    pub section: SectionPos,
    /// Face-to-face visibility computed from the blocks.
    pub visibility_data: u64,
    /// Mesh per pass; `None` for passes without geometry.
    pub meshes: [Option<BuiltSectionMesh>; TerrainRenderPass::COUNT],
    /// Token the build was started with.
    pub token: CancellationToken,
}

impl ChunkBuildOutput {
    /// Output with no geometry.
    #[must_use]
    pub fn empty(section: SectionPos, visibility_data: u64, token: CancellationToken) -> Self {
        Self {
            section,
            visibility_data,
            meshes: Default::default(),
            token,
        }
    }

    /// Sets the mesh of a pass.
    #[must_use]
    pub fn with_mesh(mut self, pass: TerrainRenderPass, mesh: BuiltSectionMesh) -> Self {
        self.meshes[pass.ordinal()] = Some(mesh);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promote_keeps_urgency() {
        use ChunkUpdateType::*;

        assert_eq!(ChunkUpdateType::promote(None, Rebuild), Rebuild);
        assert_eq!(ChunkUpdateType::promote(Some(Rebuild), ImportantRebuild), ImportantRebuild);
        assert_eq!(ChunkUpdateType::promote(Some(ImportantRebuild), Rebuild), ImportantRebuild);
        assert_eq!(ChunkUpdateType::promote(Some(InitialBuild), Rebuild), InitialBuild);
        assert!(ImportantRebuild.is_important());
        assert_eq!(InitialBuild.default_queue_limit(), 128);
    }

    #[test]
    fn test_token_clones_share_state() {
        let token = CancellationToken::new();
        let worker_copy = token.clone();
        assert!(!worker_copy.is_cancelled());

        token.cancel();
        assert!(worker_copy.is_cancelled());
        assert!(token.same_build(&worker_copy));
        assert!(!token.same_build(&CancellationToken::new()));
    }

    #[test]
    fn test_slice_mask() {
        let mut mesh = BuiltSectionMesh::default();
        mesh.ranges[ModelQuadFacing::PosY.ordinal()] = Some(VertexRange::new(0, 4));
        mesh.ranges[ModelQuadFacing::NegX.ordinal()] = Some(VertexRange::new(4, 0));
        mesh.ranges[ModelQuadFacing::Unassigned.ordinal()] = Some(VertexRange::new(4, 8));

        assert_eq!(
            mesh.slice_mask(),
            ModelQuadFacing::PosY.bit() | ModelQuadFacing::Unassigned.bit()
        );
    }

    #[test]
    fn test_validate_checks_stride_and_ranges() {
        let mut mesh = BuiltSectionMesh {
            vertex_data: vec![0; 8 * 20],
            ..BuiltSectionMesh::default()
        };
        mesh.ranges[ModelQuadFacing::PosX.ordinal()] = Some(VertexRange::new(0, 4));
        mesh.ranges[ModelQuadFacing::NegX.ordinal()] = Some(VertexRange::new(4, 4));
        assert!(mesh.validate(20).is_ok());

        mesh.ranges[ModelQuadFacing::NegX.ordinal()] = Some(VertexRange::new(8, 4));
        assert!(matches!(
            mesh.validate(20),
            Err(RenderError::VertexRangeOutOfBounds { start: 8, count: 4, vertices: 8 })
        ));

        mesh.vertex_data.truncate(3);
        assert!(matches!(
            mesh.validate(20),
            Err(RenderError::MisalignedVertexData { len: 3, stride: 20 })
        ));
    }
}
