//! Physical vertex stream layouts.
//!
//! Describes, per [`MeshVertexFormat`], which semantic attributes the mesh
//! provides, how each is packed and where it sits in the vertex. The vertex
//! stage unpacks only the streams a technique actually requests; the pixel
//! stage uses [`MeshVertexFormatInfo::provides`] to decide between a real
//! interpolant and a zero fallback.

use std::sync::OnceLock;

use crate::code::MaterialVertexDataType;

use super::setup::MeshVertexFormat;

/// Storage format of one raw stream element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStreamFormat {
    R32Uint,
    Rg32Uint,
    Rg32Float,
    Rgb32Float,
    Rgba32Float,
}

impl VertexStreamFormat {
    #[must_use]
    pub const fn byte_size(self) -> u32 {
        match self {
            Self::R32Uint => 4,
            Self::Rg32Uint | Self::Rg32Float => 8,
            Self::Rgb32Float => 12,
            Self::Rgba32Float => 16,
        }
    }

    #[must_use]
    pub const fn components(self) -> u32 {
        self.byte_size() / 4
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::R32Uint | Self::Rg32Uint)
    }

    /// Declaration type of the raw field.
    #[must_use]
    pub const fn shader_type(self) -> &'static str {
        match self {
            Self::R32Uint => "uint",
            Self::Rg32Uint => "uvec2",
            Self::Rg32Float => "vec2",
            Self::Rgb32Float => "vec3",
            Self::Rgba32Float => "vec4",
        }
    }
}

/// One attribute stored in the vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    pub data: MaterialVertexDataType,
    pub format: VertexStreamFormat,
    /// Byte offset inside the vertex.
    pub offset: u32,
    /// Function turning the raw value into the semantic value, if packed.
    pub unpack: Option<&'static str>,
}

impl VertexStream {
    /// Name of the raw field in the packing struct (`RawVertexNormal`).
    #[must_use]
    pub fn raw_name(&self) -> String {
        format!("Raw{}", self.data.info().name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshVertexFormatInfo {
    pub format: MeshVertexFormat,
    /// Name of the generated packing struct.
    pub struct_name: &'static str,
    pub streams: Vec<VertexStream>,
    /// Vertex size in bytes.
    pub stride: u32,
}

impl MeshVertexFormatInfo {
    fn build(
        format: MeshVertexFormat,
        struct_name: &'static str,
        layout: &[(MaterialVertexDataType, VertexStreamFormat, Option<&'static str>)],
    ) -> Self {
        let mut offset = 0;
        let streams = layout
            .iter()
            .map(|&(data, stream_format, unpack)| {
                let stream = VertexStream {
                    data,
                    format: stream_format,
                    offset,
                    unpack,
                };
                offset = (offset + stream_format.byte_size()).next_multiple_of(4);
                stream
            })
            .collect();

        Self {
            format,
            struct_name,
            streams,
            stride: offset,
        }
    }

    #[must_use]
    pub fn stream(&self, data: MaterialVertexDataType) -> Option<&VertexStream> {
        self.streams.iter().find(|s| s.data == data)
    }

    #[must_use]
    pub fn provides(&self, data: MaterialVertexDataType) -> bool {
        self.stream(data).is_some()
    }
}

impl MeshVertexFormat {
    /// Stream layout of this format.
    #[must_use]
    pub fn info(self) -> &'static MeshVertexFormatInfo {
        static TABLE: OnceLock<[MeshVertexFormatInfo; 5]> = OnceLock::new();
        let table = TABLE.get_or_init(|| MeshVertexFormat::ALL.map(build_format_info));
        &table[self as usize]
    }
}

fn build_format_info(format: MeshVertexFormat) -> MeshVertexFormatInfo {
    use MaterialVertexDataType as D;
    use VertexStreamFormat as F;

    const NORMAL: Option<&str> = Some("UnpackNormalVector");
    const HALF2: Option<&str> = Some("UnpackHalf2");

    match format {
        MeshVertexFormat::PositionOnly => {
            MeshVertexFormatInfo::build(format, "VertexPositionOnly", &[(D::VertexPosition, F::Rgb32Float, None)])
        }
        MeshVertexFormat::Static => MeshVertexFormatInfo::build(
            format,
            "VertexStatic",
            &[
                (D::VertexPosition, F::Rg32Uint, Some("UnpackPosition_22_22_20")),
                (D::VertexNormal, F::R32Uint, NORMAL),
                (D::VertexTangent, F::R32Uint, NORMAL),
                (D::VertexBitangent, F::R32Uint, NORMAL),
                (D::VertexUV0, F::R32Uint, HALF2),
            ],
        ),
        MeshVertexFormat::StaticEx => MeshVertexFormatInfo::build(
            format,
            "VertexStaticEx",
            &[
                (D::VertexPosition, F::Rgb32Float, None),
                (D::VertexNormal, F::R32Uint, NORMAL),
                (D::VertexTangent, F::R32Uint, NORMAL),
                (D::VertexBitangent, F::R32Uint, NORMAL),
                (D::VertexUV0, F::Rg32Float, None),
                (D::VertexUV1, F::R32Uint, HALF2),
                (D::VertexColor0, F::R32Uint, Some("UnpackUByte4Norm")),
            ],
        ),
        MeshVertexFormat::Skinned4 => MeshVertexFormatInfo::build(
            format,
            "VertexSkinned4",
            &[
                (D::VertexPosition, F::Rgb32Float, None),
                (D::VertexNormal, F::R32Uint, NORMAL),
                (D::VertexTangent, F::R32Uint, NORMAL),
                (D::VertexBitangent, F::R32Uint, NORMAL),
                (D::VertexUV0, F::Rg32Float, None),
                (D::SkinningIndices, F::R32Uint, Some("UnpackSkinIndices")),
                (D::SkinningWeights, F::R32Uint, Some("UnpackSkinWeights")),
            ],
        ),
        MeshVertexFormat::Skinned4Ex => MeshVertexFormatInfo::build(
            format,
            "VertexSkinned4Ex",
            &[
                (D::VertexPosition, F::Rgb32Float, None),
                (D::VertexNormal, F::R32Uint, NORMAL),
                (D::VertexTangent, F::R32Uint, NORMAL),
                (D::VertexBitangent, F::R32Uint, NORMAL),
                (D::VertexUV0, F::Rg32Float, None),
                (D::VertexUV1, F::R32Uint, HALF2),
                (D::VertexColor0, F::R32Uint, Some("UnpackUByte4Norm")),
                (D::SkinningIndices, F::R32Uint, Some("UnpackSkinIndices")),
                (D::SkinningWeights, F::R32Uint, Some("UnpackSkinWeights")),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_layout_offsets() {
        let info = MeshVertexFormat::Static.info();
        let offsets: Vec<u32> = info.streams.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 8, 12, 16, 20]);
        assert_eq!(info.stride, 24);
        assert!(!info.provides(MaterialVertexDataType::VertexColor0));
    }

    #[test]
    fn extended_formats_provide_second_uv() {
        assert!(MeshVertexFormat::StaticEx.info().provides(MaterialVertexDataType::VertexUV1));
        assert!(!MeshVertexFormat::Skinned4.info().provides(MaterialVertexDataType::VertexUV1));
        assert!(MeshVertexFormat::Skinned4Ex.info().provides(MaterialVertexDataType::SkinningWeights));
    }
}
