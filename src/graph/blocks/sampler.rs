//! Texture sampling.

use glam::{Vec2, Vec4};

use crate::code::{CodeChunk, CodeChunkType, MaterialVertexDataType, ops};
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

const SAMPLE_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("Texture"),
    SocketInfo::input("UV").tagged("uv"),
    SocketInfo::input("Bias").hidden(),
    SocketInfo::output("RGBA").tagged("color"),
    SocketInfo::swizzled("RGB", "xyz"),
    SocketInfo::swizzled("R", "x"),
    SocketInfo::swizzled("G", "y"),
    SocketInfo::swizzled("B", "z"),
    SocketInfo::swizzled("A", "w"),
];

/// Samples a 2D texture parameter.
///
/// Without a texture the block yields opaque white. Without a UV input it
/// reads the mesh UV channel `uv_channel`. A non-zero `uv_rotation`
/// (radians) rotates the coordinates around `(0.5, 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureSampleBlock {
    pub uv_channel: u8,
    pub uv_rotation: f32,
}

impl TextureSampleBlock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.uv_rotation = radians;
        self
    }

    fn rotate(&self, compiler: &mut StageCompiler<'_>, uv: &CodeChunk) -> CodeChunk {
        let (sin, cos) = self.uv_rotation.sin_cos();
        let centered = compiler.var(&(uv - 0.5));
        let u = ops::dot(&centered, &CodeChunk::from(Vec2::new(cos, -sin)));
        let v = ops::dot(&centered, &CodeChunk::from(Vec2::new(sin, cos)));
        ops::float2(&u, &v) + 0.5
    }
}

impl MaterialBlock for TextureSampleBlock {
    fn type_name(&self) -> &'static str {
        "TextureSample"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        SAMPLE_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let texture = compiler.eval_input(node, "Texture", CodeChunk::void());
        if texture.ty() != CodeChunkType::TextureResource {
            log::warn!(
                "TextureSample in '{}' has no texture input, using white",
                compiler.context_name()
            );
            return CodeChunk::from(Vec4::ONE);
        }

        let mut uv = if compiler.has_connection(node, "UV") {
            compiler.eval_input(node, "UV", Vec2::ZERO).conform(2)
        } else {
            compiler.vertex_data(MaterialVertexDataType::uv(self.uv_channel))
        };
        if self.uv_rotation != 0.0 {
            uv = self.rotate(compiler, &uv);
        }

        let sample = if compiler.has_connection(node, "Bias") {
            let bias = compiler.eval_input(node, "Bias", 0.0);
            ops::tex2d_bias(&texture, &uv, &bias)
        } else {
            ops::tex2d(&texture, &uv)
        };
        compiler.var(&sample)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(u32::from(self.uv_channel));
        hasher.write_f32(self.uv_rotation);
    }
}
