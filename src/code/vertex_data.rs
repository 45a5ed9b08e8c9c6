//! Semantic vertex data that blocks can request from the geometry stages.

use serde::{Deserialize, Serialize};

use super::chunk::{CodeChunk, CodeChunkType};

/// A semantic value produced by the vertex stage (or by the vertex stream
/// directly) and consumed by material blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaterialVertexDataType {
    ObjectIndex,
    SubObjectIndex,
    VertexPosition,
    VertexNormal,
    VertexTangent,
    VertexBitangent,
    VertexColor0,
    VertexColor1,
    VertexColor2,
    VertexColor3,
    VertexUV0,
    VertexUV1,
    VertexUV2,
    VertexUV3,
    SkinningIndices,
    SkinningWeights,
    WorldPosition,
    WorldNormal,
    WorldTangent,
    WorldBitangent,
}

/// Static description of a [`MaterialVertexDataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialVertexDataInfo {
    pub ty: CodeChunkType,
    /// Declaration type in generated code.
    pub shader_type: &'static str,
    /// Identifier used in generated code.
    pub name: &'static str,
    /// Read from the mesh vertex stream (as opposed to computed in the VS).
    pub vertex_stream: bool,
    /// Interpolated direction vectors must be re-normalized in the PS.
    pub renormalize: bool,
    /// Integer data, passed without interpolation.
    pub flat: bool,
}

const fn info(
    ty: CodeChunkType,
    shader_type: &'static str,
    name: &'static str,
    vertex_stream: bool,
    renormalize: bool,
) -> MaterialVertexDataInfo {
    MaterialVertexDataInfo {
        ty,
        shader_type,
        name,
        vertex_stream,
        renormalize,
        flat: matches!(shader_type.as_bytes()[0], b'u' | b'i'),
    }
}

impl MaterialVertexDataType {
    pub const ALL: [Self; 20] = [
        Self::ObjectIndex,
        Self::SubObjectIndex,
        Self::VertexPosition,
        Self::VertexNormal,
        Self::VertexTangent,
        Self::VertexBitangent,
        Self::VertexColor0,
        Self::VertexColor1,
        Self::VertexColor2,
        Self::VertexColor3,
        Self::VertexUV0,
        Self::VertexUV1,
        Self::VertexUV2,
        Self::VertexUV3,
        Self::SkinningIndices,
        Self::SkinningWeights,
        Self::WorldPosition,
        Self::WorldNormal,
        Self::WorldTangent,
        Self::WorldBitangent,
    ];

    #[must_use]
    pub const fn info(self) -> MaterialVertexDataInfo {
        use CodeChunkType::{Numerical1, Numerical2, Numerical3, Numerical4};
        match self {
            Self::ObjectIndex => info(Numerical1, "uint", "ObjectIndex", false, false),
            Self::SubObjectIndex => info(Numerical1, "uint", "SubObjectIndex", false, false),
            Self::VertexPosition => info(Numerical3, "vec3", "VertexPosition", true, false),
            Self::VertexNormal => info(Numerical3, "vec3", "VertexNormal", true, true),
            Self::VertexTangent => info(Numerical3, "vec3", "VertexTangent", true, true),
            Self::VertexBitangent => info(Numerical3, "vec3", "VertexBitangent", true, true),
            Self::VertexColor0 => info(Numerical4, "vec4", "VertexColor0", true, false),
            Self::VertexColor1 => info(Numerical4, "vec4", "VertexColor1", true, false),
            Self::VertexColor2 => info(Numerical4, "vec4", "VertexColor2", true, false),
            Self::VertexColor3 => info(Numerical4, "vec4", "VertexColor3", true, false),
            Self::VertexUV0 => info(Numerical2, "vec2", "VertexUV0", true, false),
            Self::VertexUV1 => info(Numerical2, "vec2", "VertexUV1", true, false),
            Self::VertexUV2 => info(Numerical2, "vec2", "VertexUV2", true, false),
            Self::VertexUV3 => info(Numerical2, "vec2", "VertexUV3", true, false),
            Self::SkinningIndices => info(Numerical4, "uvec4", "SkinningIndices", true, false),
            Self::SkinningWeights => info(Numerical4, "vec4", "SkinningWeights", true, false),
            Self::WorldPosition => info(Numerical3, "vec3", "WorldPosition", false, false),
            Self::WorldNormal => info(Numerical3, "vec3", "WorldNormal", false, true),
            Self::WorldTangent => info(Numerical3, "vec3", "WorldTangent", false, true),
            Self::WorldBitangent => info(Numerical3, "vec3", "WorldBitangent", false, true),
        }
    }

    /// UV channel `index` (0..=3), clamped.
    #[must_use]
    pub const fn uv(index: u8) -> Self {
        match index {
            0 => Self::VertexUV0,
            1 => Self::VertexUV1,
            2 => Self::VertexUV2,
            _ => Self::VertexUV3,
        }
    }

    /// Zero of the right arity, used when the data is unavailable.
    #[must_use]
    pub fn default_value(self) -> CodeChunk {
        CodeChunk::zero(self.info().ty.components())
    }

    /// Mesh-space stream a world-space value is derived from.
    #[must_use]
    pub const fn local_source(self) -> Option<Self> {
        match self {
            Self::WorldPosition => Some(Self::VertexPosition),
            Self::WorldNormal => Some(Self::VertexNormal),
            Self::WorldTangent => Some(Self::VertexTangent),
            Self::WorldBitangent => Some(Self::VertexBitangent),
            _ => None,
        }
    }
}
