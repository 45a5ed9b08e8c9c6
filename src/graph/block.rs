//! The block contract.
//!
//! Every node of a material graph implements [`MaterialBlock`]. Compilation
//! is lazy: the geometry compiler asks the root output block for its pixel
//! and vertex functions, and each block pulls its inputs through
//! [`StageCompiler::eval_input`], which memoizes per (block, output).
//!
//! A block's `compile` must be a pure function of its own configuration and
//! of the values `eval_input` returns, so that the memo table stays valid.

use std::fmt;

use xxhash_rust::xxh3::Xxh3;

use crate::code::CodeChunk;
use crate::compiler::layout::MaterialParameterType;
use crate::compiler::render_states::MaterialRenderStates;
use crate::compiler::stage::StageCompiler;

use super::container::NodeId;
use super::socket::{SocketDirection, SocketInfo};

/// Named, user-visible value exposed by a parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: MaterialParameterType,
}

/// A node of the material graph.
pub trait MaterialBlock: fmt::Debug + Send + Sync {
    /// Stable identifier of the block kind, part of the graph content hash.
    fn type_name(&self) -> &'static str;

    fn sockets(&self) -> &'static [SocketInfo];

    /// Produces the value of `output` for the stage being compiled.
    ///
    /// Returning a void chunk makes `eval_input` fall back to the consumer's
    /// default.
    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, output: &str) -> CodeChunk;

    /// Feeds the block's authored configuration into the graph content hash.
    fn hash_content(&self, hasher: &mut ContentHasher);

    fn parameter(&self) -> Option<ParameterInfo> {
        None
    }

    fn as_output(&self) -> Option<&dyn MaterialOutputBlock> {
        None
    }

    fn find_socket(&self, name: &str, direction: SocketDirection) -> Option<&'static SocketInfo> {
        self.sockets()
            .iter()
            .find(|s| s.direction == direction && s.name == name)
    }

    /// First non-swizzled output; swizzled outputs compile through it.
    fn primary_output(&self) -> Option<&'static str> {
        self.sockets()
            .iter()
            .find(|s| s.direction == SocketDirection::Output && s.swizzle.is_none())
            .map(|s| s.name)
    }
}

/// Root of a graph: drives code generation for both shader stages.
pub trait MaterialOutputBlock {
    /// Emits the pixel shader body for the active pass.
    fn compile_pixel_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates);

    /// Emits custom vertex logic (world-space offset).
    fn compile_vertex_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates);
}

// ─── Content hashing ─────────────────────────────────────────────────────────

/// Streaming xxh3 hasher over a canonical encoding of graph content.
///
/// Strings are length-prefixed so adjacent fields cannot alias.
pub struct ContentHasher {
    state: Xxh3,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.state.update(value.as_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.state.update(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.state.update(&value.to_le_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.state.update(&[u8::from(value)]);
    }

    /// Hashes the bit pattern; `-0.0` and `0.0` differ.
    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        self.write_u64(values.len() as u64);
        for v in values {
            self.write_f32(*v);
        }
    }

    #[must_use]
    pub fn finish(&self) -> u64 {
        self.state.digest()
    }

    #[must_use]
    pub fn finish_128(&self) -> u128 {
        self.state.digest128()
    }
}
