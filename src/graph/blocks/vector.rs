//! Vector construction and decomposition.

use crate::code::{CodeChunk, ops};
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

const COMPONENT_INPUTS: [&str; 4] = ["X", "Y", "Z", "W"];

const MAKE_VEC2_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("X"),
    SocketInfo::input("Y"),
    SocketInfo::output("Out"),
];

const MAKE_VEC3_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("X"),
    SocketInfo::input("Y"),
    SocketInfo::input("Z"),
    SocketInfo::output("Out"),
];

const MAKE_VEC4_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("X"),
    SocketInfo::input("Y"),
    SocketInfo::input("Z"),
    SocketInfo::input("W"),
    SocketInfo::output("Out"),
];

/// `vecN(x, y, ...)` from scalar inputs; unconnected components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MakeVectorBlock {
    components: u8,
}

impl MakeVectorBlock {
    /// `components` is clamped to 2..=4.
    #[must_use]
    pub fn new(components: u8) -> Self {
        Self {
            components: components.clamp(2, 4),
        }
    }
}

impl MaterialBlock for MakeVectorBlock {
    fn type_name(&self) -> &'static str {
        "MakeVector"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        match self.components {
            2 => MAKE_VEC2_SOCKETS,
            3 => MAKE_VEC3_SOCKETS,
            _ => MAKE_VEC4_SOCKETS,
        }
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let parts: Vec<CodeChunk> = COMPONENT_INPUTS[..usize::from(self.components)]
            .iter()
            .map(|input| compiler.eval_input(node, input, 0.0).conform(1))
            .collect();
        let refs: Vec<&CodeChunk> = parts.iter().collect();
        ops::make_vector(&refs)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_u32(u32::from(self.components));
    }
}

const SPLIT_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("In"),
    SocketInfo::output("XYZW").hidden(),
    SocketInfo::swizzled("X", "x"),
    SocketInfo::swizzled("Y", "y"),
    SocketInfo::swizzled("Z", "z"),
    SocketInfo::swizzled("W", "w"),
];

/// Exposes the components of its input.
///
/// A scalar input is broadcast, so every output reads it. A two- or
/// three-component input reads its missing components as 0, except `W`,
/// which reads as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitVectorBlock;

impl MaterialBlock for SplitVectorBlock {
    fn type_name(&self) -> &'static str {
        "SplitVector"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        SPLIT_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        compiler.eval_input(node, "In", glam::Vec4::ZERO).conform(4)
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}
