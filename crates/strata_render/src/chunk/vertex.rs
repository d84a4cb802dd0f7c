//! # Chunk Vertex Format
//!
//! Fixed 20-byte vertex used by every terrain pass.
//!
//! ```text
//! ┌────────────────────────┬─────────┬───────────┬───────────┐
//! │ position + material    │ color   │ block uv  │ light uv  │
//! │ u16 x 4 (8 bytes)      │ u8 x 4  │ u16 x 2   │ u16 x 2   │
//! └────────────────────────┴─────────┴───────────┴───────────┘
//! ```

use bytemuck::{Pod, Zeroable};

/// Semantic of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkMeshAttribute {
    /// Quantized position plus material and mesh id.
    PositionMaterialMesh,
    /// Vertex color with baked shade.
    ColorShade,
    /// Block atlas coordinates.
    BlockTexture,
    /// Light map coordinates.
    LightTexture,
}

/// Component layout of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    /// Four unsigned 16-bit integers.
    Uint16x4,
    /// Four normalized unsigned bytes.
    Unorm8x4,
    /// Two normalized unsigned 16-bit integers.
    Unorm16x2,
    /// Two unsigned 16-bit integers.
    Uint16x2,
}

impl AttributeFormat {
    /// Size in bytes.
    #[must_use]
    pub const fn size(self) -> u32 {
        match self {
            Self::Uint16x4 => 8,
            Self::Unorm8x4 | Self::Unorm16x2 | Self::Uint16x2 => 4,
        }
    }
}

/// An attribute bound to a shader location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeBinding {
    /// Attribute semantic.
    pub attribute: ChunkMeshAttribute,
    /// Shader location.
    pub location: u32,
    /// Component layout.
    pub format: AttributeFormat,
    /// Byte offset inside the vertex.
    pub offset: u32,
}

/// Stride plus attribute list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexFormat {
    /// Bytes per vertex.
    pub stride: u32,
    /// Attributes in location order.
    pub attributes: &'static [VertexAttributeBinding],
}

impl VertexFormat {
    /// Looks up an attribute by semantic.
    #[must_use]
    pub fn attribute(&self, attribute: ChunkMeshAttribute) -> Option<&VertexAttributeBinding> {
        self.attributes.iter().find(|binding| binding.attribute == attribute)
    }
}

/// Shader location of the position attribute.
pub const ATTRIBUTE_POSITION_ID: u32 = 1;
/// Shader location of the color attribute.
pub const ATTRIBUTE_COLOR: u32 = 2;
/// Shader location of the block texture attribute.
pub const ATTRIBUTE_BLOCK_TEXTURE: u32 = 3;
/// Shader location of the light texture attribute.
pub const ATTRIBUTE_LIGHT_TEXTURE: u32 = 4;

const COMPACT_ATTRIBUTES: [VertexAttributeBinding; 4] = [
    VertexAttributeBinding {
        attribute: ChunkMeshAttribute::PositionMaterialMesh,
        location: ATTRIBUTE_POSITION_ID,
        format: AttributeFormat::Uint16x4,
        offset: 0,
    },
    VertexAttributeBinding {
        attribute: ChunkMeshAttribute::ColorShade,
        location: ATTRIBUTE_COLOR,
        format: AttributeFormat::Unorm8x4,
        offset: 8,
    },
    VertexAttributeBinding {
        attribute: ChunkMeshAttribute::BlockTexture,
        location: ATTRIBUTE_BLOCK_TEXTURE,
        format: AttributeFormat::Unorm16x2,
        offset: 12,
    },
    VertexAttributeBinding {
        attribute: ChunkMeshAttribute::LightTexture,
        location: ATTRIBUTE_LIGHT_TEXTURE,
        format: AttributeFormat::Uint16x2,
        offset: 16,
    },
];

/// The terrain vertex format.
pub const COMPACT_FORMAT: VertexFormat = VertexFormat {
    stride: std::mem::size_of::<CompactChunkVertex>() as u32,
    attributes: &COMPACT_ATTRIBUTES,
};

/// CPU-side layout of one terrain vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CompactChunkVertex {
    /// Quantized x, y, z and packed material/mesh id.
    pub position_material_mesh: [u16; 4],
    /// RGBA color.
    pub color: [u8; 4],
    /// Atlas u, v.
    pub block_texture: [u16; 2],
    /// Block light, sky light.
    pub light_texture: [u16; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_layout_is_packed() {
        assert_eq!(COMPACT_FORMAT.stride, 20);

        let mut expected_offset = 0;
        for binding in COMPACT_FORMAT.attributes {
            assert_eq!(binding.offset, expected_offset);
            expected_offset += binding.format.size();
        }
        assert_eq!(expected_offset, COMPACT_FORMAT.stride);
    }

    #[test]
    fn test_attribute_lookup() {
        let light = COMPACT_FORMAT.attribute(ChunkMeshAttribute::LightTexture).unwrap();
        assert_eq!(light.location, ATTRIBUTE_LIGHT_TEXTURE);
        assert_eq!(light.offset, 16);
    }
}
