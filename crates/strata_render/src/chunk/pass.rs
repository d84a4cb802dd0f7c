//! Terrain render passes.

use serde::{Deserialize, Serialize};

/// A group of terrain geometry drawn with the same pipeline state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainRenderPass {
    /// Opaque blocks.
    Solid = 0,
    /// Alpha-tested blocks (leaves, grass).
    Cutout = 1,
    /// Blended blocks, drawn back to front.
    Translucent = 2,
}

impl TerrainRenderPass {
    /// Number of passes.
    pub const COUNT: usize = 3;

    /// Passes in draw order.
    pub const ALL: [Self; Self::COUNT] = [Self::Solid, Self::Cutout, Self::Translucent];

    /// Index of the pass.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Returns true if regions and sections are drawn far to near.
    #[inline]
    #[must_use]
    pub const fn is_reverse_order(self) -> bool {
        matches!(self, Self::Translucent)
    }

    /// Returns true if the pass blends with what is behind it.
    #[inline]
    #[must_use]
    pub const fn is_translucent(self) -> bool {
        matches!(self, Self::Translucent)
    }

    /// Debug label for GPU objects.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solid => "terrain_solid",
            Self::Cutout => "terrain_cutout",
            Self::Translucent => "terrain_translucent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_translucent_reverses() {
        assert!(!TerrainRenderPass::Solid.is_reverse_order());
        assert!(!TerrainRenderPass::Cutout.is_reverse_order());
        assert!(TerrainRenderPass::Translucent.is_reverse_order());
        for (i, pass) in TerrainRenderPass::ALL.iter().enumerate() {
            assert_eq!(pass.ordinal(), i);
        }
    }
}
