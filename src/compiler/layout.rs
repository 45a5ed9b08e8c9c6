//! Material Data Layout
//!
//! Assigns storage to the parameters of a graph. Parameters are sorted by
//! name; numeric values are packed into one constant buffer with std140-like
//! alignment and textures get sequential resource slots. Blocks look their
//! binding up through [`StageCompiler::find_param_entry`]; an unbound
//! parameter compiles to its authored default instead.
//!
//! [`StageCompiler::find_param_entry`]: super::stage::StageCompiler::find_param_entry

use serde::{Deserialize, Serialize};

use crate::code::CodeChunkType;
use crate::graph::MaterialGraph;

/// Name of the descriptor block holding the material data.
pub const MATERIAL_DESCRIPTOR_NAME: &str = "MaterialData";

/// Type of a user-visible material parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialParameterType {
    Float,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Texture2D,
}

impl MaterialParameterType {
    #[must_use]
    pub const fn is_texture(self) -> bool {
        matches!(self, Self::Texture2D)
    }

    #[must_use]
    pub const fn chunk_type(self) -> CodeChunkType {
        match self {
            Self::Float => CodeChunkType::Numerical1,
            Self::Vector2 => CodeChunkType::Numerical2,
            Self::Vector3 => CodeChunkType::Numerical3,
            Self::Vector4 | Self::Color => CodeChunkType::Numerical4,
            Self::Texture2D => CodeChunkType::TextureResource,
        }
    }

    #[must_use]
    pub const fn shader_type(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Vector2 => "vec2",
            Self::Vector3 => "vec3",
            Self::Vector4 | Self::Color => "vec4",
            Self::Texture2D => "Texture2D",
        }
    }

    /// (size, alignment) in the constant buffer.
    const fn constant_size_align(self) -> (u32, u32) {
        match self {
            Self::Float => (4, 4),
            Self::Vector2 => (8, 8),
            Self::Vector3 => (12, 16),
            Self::Vector4 | Self::Color => (16, 16),
            Self::Texture2D => (0, 1),
        }
    }
}

/// Where a parameter's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialDataBinding {
    Constant { offset: u32 },
    Texture { slot: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialDataLayoutEntry {
    pub name: String,
    pub ty: MaterialParameterType,
    pub binding: MaterialDataBinding,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialDataLayout {
    entries: Vec<MaterialDataLayoutEntry>,
    constant_buffer_size: u32,
}

impl MaterialDataLayout {
    /// Lays out every parameter block of `graph`.
    #[must_use]
    pub fn build(graph: &MaterialGraph) -> Self {
        let params = graph
            .parameters()
            .filter_map(|(_, id)| graph.block(id).and_then(|b| b.parameter()));

        let mut entries = Vec::new();
        let mut offset = 0;
        let mut slot = 0;
        for param in params {
            let binding = if param.ty.is_texture() {
                slot += 1;
                MaterialDataBinding::Texture { slot: slot - 1 }
            } else {
                let (size, align) = param.ty.constant_size_align();
                let start = u32::next_multiple_of(offset, align);
                offset = start + size;
                MaterialDataBinding::Constant { offset: start }
            };
            entries.push(MaterialDataLayoutEntry {
                name: param.name,
                ty: param.ty,
                binding,
            });
        }

        Self {
            entries,
            constant_buffer_size: offset.next_multiple_of(16),
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[MaterialDataLayoutEntry] {
        &self.entries
    }

    #[must_use]
    pub fn find_param_entry(&self, name: &str) -> Option<&MaterialDataLayoutEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Constant-buffer entries with their offsets, in layout order.
    pub fn constants(&self) -> impl Iterator<Item = (&MaterialDataLayoutEntry, u32)> {
        self.entries.iter().filter_map(|e| match e.binding {
            MaterialDataBinding::Constant { offset } => Some((e, offset)),
            MaterialDataBinding::Texture { .. } => None,
        })
    }

    pub fn textures(&self) -> impl Iterator<Item = &MaterialDataLayoutEntry> {
        self.entries.iter().filter(|e| e.ty.is_texture())
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn constant_buffer_size(&self) -> u32 {
        self.constant_buffer_size
    }
}
