//! # Renderer Configuration
//!
//! Options recognized by the terrain renderer, loaded once at startup from
//! TOML. Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! use_occlusion_culling = true
//! use_block_face_culling = true
//! render_distance = 256.0
//! world_min_section_y = -4
//! world_max_section_y = 20
//! index_type = "u32"
//!
//! [rebuild_limits]
//! initial_build = 128
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chunk::index_buffer::IndexType;
use crate::chunk::ChunkUpdateType;
use crate::error::{RenderError, RenderResult};

/// Maximum number of sections waiting in each rebuild queue per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildQueueLimits {
    /// Sections that have never been meshed.
    pub initial_build: u32,
    /// Sections whose mesh is stale.
    pub rebuild: u32,
    /// Stale sections near the player that should not wait.
    pub important_rebuild: u32,
}

impl RebuildQueueLimits {
    /// Limit for the given update kind.
    #[inline]
    #[must_use]
    pub const fn limit(&self, kind: ChunkUpdateType) -> u32 {
        match kind {
            ChunkUpdateType::InitialBuild => self.initial_build,
            ChunkUpdateType::Rebuild => self.rebuild,
            ChunkUpdateType::ImportantRebuild => self.important_rebuild,
        }
    }
}

impl Default for RebuildQueueLimits {
    fn default() -> Self {
        Self {
            initial_build: ChunkUpdateType::InitialBuild.default_queue_limit(),
            rebuild: ChunkUpdateType::Rebuild.default_queue_limit(),
            important_rebuild: ChunkUpdateType::ImportantRebuild.default_queue_limit(),
        }
    }
}

/// Renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Prune traversal using per-section visibility graphs.
    pub use_occlusion_culling: bool,
    /// Skip facing buckets that point away from the camera.
    pub use_block_face_culling: bool,
    /// Render distance in blocks.
    pub render_distance: f32,
    /// Lowest section Y of the world (inclusive).
    pub world_min_section_y: i32,
    /// Highest section Y of the world (exclusive).
    pub world_max_section_y: i32,
    /// Width of the shared index buffer.
    pub index_type: IndexType,
    /// Per-kind rebuild queue limits.
    pub rebuild_limits: RebuildQueueLimits,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            use_occlusion_culling: true,
            use_block_face_culling: true,
            render_distance: 256.0,
            world_min_section_y: -4,
            world_max_section_y: 20,
            index_type: IndexType::U32,
            rebuild_limits: RebuildQueueLimits::default(),
        }
    }
}

impl RendererConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or a value is unusable.
    pub fn from_toml_str(text: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RenderError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&text)?;
        info!(
            path = %path.display(),
            render_distance = config.render_distance,
            occlusion_culling = config.use_occlusion_culling,
            "Loaded renderer config"
        );
        Ok(config)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> RenderResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> RenderResult<()> {
        if !self.render_distance.is_finite() || self.render_distance <= 0.0 {
            return Err(RenderError::InvalidConfig(format!(
                "render_distance must be a positive number, got {}",
                self.render_distance
            )));
        }

        if self.world_min_section_y >= self.world_max_section_y {
            return Err(RenderError::InvalidConfig(format!(
                "world height range is empty: {}..{}",
                self.world_min_section_y, self.world_max_section_y
            )));
        }

        Ok(())
    }
}
