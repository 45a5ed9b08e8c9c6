//! Vertex attributes and frame globals.

use crate::code::{CodeChunk, CodeChunkType, MaterialVertexDataType};
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

const OUT_SOCKETS: &[SocketInfo] = &[SocketInfo::output("Out")];

/// Any semantic vertex value, interpolated in the pixel stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexDataBlock {
    pub data: MaterialVertexDataType,
}

impl VertexDataBlock {
    #[must_use]
    pub fn new(data: MaterialVertexDataType) -> Self {
        Self { data }
    }
}

impl MaterialBlock for VertexDataBlock {
    fn type_name(&self) -> &'static str {
        "VertexData"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        OUT_SOCKETS
    }

    fn compile(&self, _node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        compiler.vertex_data(self.data)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(self.data.info().name);
    }
}

const TEXCOORD_SOCKETS: &[SocketInfo] = &[
    SocketInfo::output("UV").tagged("uv"),
    SocketInfo::swizzled("U", "x"),
    SocketInfo::swizzled("V", "y"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TexCoordBlock {
    pub channel: u8,
}

impl TexCoordBlock {
    #[must_use]
    pub fn new(channel: u8) -> Self {
        Self { channel }
    }
}

impl MaterialBlock for TexCoordBlock {
    fn type_name(&self) -> &'static str {
        "TexCoord"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        TEXCOORD_SOCKETS
    }

    fn compile(&self, _node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        compiler.vertex_data(MaterialVertexDataType::uv(self.channel))
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(u32::from(self.channel));
    }
}

/// Per-frame values provided by the engine's frame constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalValue {
    CameraPosition,
    CameraDirection,
    /// Seconds since startup.
    Time,
    /// Normalized direction from the surface towards the camera.
    ViewDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalBlock {
    pub value: GlobalValue,
}

impl GlobalBlock {
    #[must_use]
    pub fn new(value: GlobalValue) -> Self {
        Self { value }
    }
}

impl MaterialBlock for GlobalBlock {
    fn type_name(&self) -> &'static str {
        "Global"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        OUT_SOCKETS
    }

    fn compile(&self, _node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let camera_position = CodeChunk::reference(CodeChunkType::Numerical3, "FrameData.CameraPosition");
        match self.value {
            GlobalValue::CameraPosition => camera_position,
            GlobalValue::CameraDirection => {
                CodeChunk::reference(CodeChunkType::Numerical3, "FrameData.CameraDirection")
            }
            GlobalValue::Time => CodeChunk::reference(CodeChunkType::Numerical1, "FrameData.Time"),
            GlobalValue::ViewDirection => {
                let position = compiler.vertex_data(MaterialVertexDataType::WorldPosition);
                (&camera_position - &position).normalize()
            }
        }
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&format!("{:?}", self.value));
    }
}
