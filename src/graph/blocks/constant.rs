//! Inline constant blocks.

use glam::{Vec2, Vec3, Vec4};

use crate::code::CodeChunk;
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

const SCALAR_SOCKETS: &[SocketInfo] = &[SocketInfo::output("Out")];

pub(crate) const VEC2_SOCKETS: &[SocketInfo] = &[
    SocketInfo::output("Out"),
    SocketInfo::swizzled("X", "x"),
    SocketInfo::swizzled("Y", "y"),
];

pub(crate) const VEC3_SOCKETS: &[SocketInfo] = &[
    SocketInfo::output("Out"),
    SocketInfo::swizzled("X", "x"),
    SocketInfo::swizzled("Y", "y"),
    SocketInfo::swizzled("Z", "z"),
];

pub(crate) const VEC4_SOCKETS: &[SocketInfo] = &[
    SocketInfo::output("Out"),
    SocketInfo::swizzled("X", "x"),
    SocketInfo::swizzled("Y", "y"),
    SocketInfo::swizzled("Z", "z"),
    SocketInfo::swizzled("W", "w"),
];

pub(crate) const COLOR_SOCKETS: &[SocketInfo] = &[
    SocketInfo::output("RGBA").tagged("color"),
    SocketInfo::swizzled("RGB", "xyz"),
    SocketInfo::swizzled("R", "x"),
    SocketInfo::swizzled("G", "y"),
    SocketInfo::swizzled("B", "z"),
    SocketInfo::swizzled("A", "w"),
];

/// Output sockets of an `n`-component vector value.
pub(crate) fn vector_sockets(components: u8) -> &'static [SocketInfo] {
    match components {
        1 => SCALAR_SOCKETS,
        2 => VEC2_SOCKETS,
        3 => VEC3_SOCKETS,
        _ => VEC4_SOCKETS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstFloatBlock {
    pub value: f32,
}

impl ConstFloatBlock {
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self { value }
    }
}

impl MaterialBlock for ConstFloatBlock {
    fn type_name(&self) -> &'static str {
        "ConstFloat"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        SCALAR_SOCKETS
    }

    fn compile(&self, _node: NodeId, _compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        CodeChunk::from(self.value)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_f32(self.value);
    }
}

/// Constant vector of 2 to 4 components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstVectorBlock {
    value: Vec4,
    components: u8,
}

impl ConstVectorBlock {
    #[must_use]
    pub fn vec2(value: Vec2) -> Self {
        Self {
            value: value.extend(0.0).extend(0.0),
            components: 2,
        }
    }

    #[must_use]
    pub fn vec3(value: Vec3) -> Self {
        Self {
            value: value.extend(0.0),
            components: 3,
        }
    }

    #[must_use]
    pub fn vec4(value: Vec4) -> Self {
        Self { value, components: 4 }
    }

    fn values(&self) -> [f32; 4] {
        self.value.to_array()
    }
}

impl MaterialBlock for ConstVectorBlock {
    fn type_name(&self) -> &'static str {
        "ConstVector"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        vector_sockets(self.components)
    }

    fn compile(&self, _node: NodeId, _compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        CodeChunk::vector(&self.values()[..usize::from(self.components)])
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_f32s(&self.values()[..usize::from(self.components)]);
    }
}

/// Constant linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstColorBlock {
    pub color: Vec4,
}

impl ConstColorBlock {
    #[must_use]
    pub fn new(color: Vec4) -> Self {
        Self { color }
    }

    #[must_use]
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::new(Vec4::new(r, g, b, a))
    }
}

impl MaterialBlock for ConstColorBlock {
    fn type_name(&self) -> &'static str {
        "ConstColor"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        COLOR_SOCKETS
    }

    fn compile(&self, _node: NodeId, _compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        CodeChunk::from(self.color)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_f32s(&self.color.to_array());
    }
}
