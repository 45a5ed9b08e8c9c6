//! User-visible material parameters.

use glam::{Vec2, Vec3, Vec4};

use crate::code::CodeChunk;
use crate::compiler::layout::MaterialParameterType;
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock, ParameterInfo};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

use super::constant::{COLOR_SOCKETS, vector_sockets};

/// Authored default of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Vector2(Vec2),
    Vector3(Vec3),
    Vector4(Vec4),
    Color(Vec4),
    /// Asset path of the default texture, if any.
    Texture(Option<String>),
}

impl ParameterValue {
    #[must_use]
    pub fn ty(&self) -> MaterialParameterType {
        match self {
            Self::Float(_) => MaterialParameterType::Float,
            Self::Vector2(_) => MaterialParameterType::Vector2,
            Self::Vector3(_) => MaterialParameterType::Vector3,
            Self::Vector4(_) => MaterialParameterType::Vector4,
            Self::Color(_) => MaterialParameterType::Color,
            Self::Texture(_) => MaterialParameterType::Texture2D,
        }
    }

    /// Inline literal; textures have none.
    fn literal(&self) -> CodeChunk {
        match self {
            Self::Float(v) => CodeChunk::from(*v),
            Self::Vector2(v) => CodeChunk::from(*v),
            Self::Vector3(v) => CodeChunk::from(*v),
            Self::Vector4(v) | Self::Color(v) => CodeChunk::from(*v),
            Self::Texture(_) => CodeChunk::void(),
        }
    }

    fn hash_into(&self, hasher: &mut ContentHasher) {
        match self {
            Self::Float(v) => hasher.write_f32(*v),
            Self::Vector2(v) => hasher.write_f32s(&v.to_array()),
            Self::Vector3(v) => hasher.write_f32s(&v.to_array()),
            Self::Vector4(v) | Self::Color(v) => hasher.write_f32s(&v.to_array()),
            Self::Texture(path) => {
                hasher.write_bool(path.is_some());
                if let Some(path) = path {
                    hasher.write_str(path);
                }
            }
        }
    }
}

/// Named value the application can change without recompiling.
///
/// When the data layout binds the parameter, the block compiles to a
/// reference into the material descriptor; otherwise to its default.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    name: String,
    value: ParameterValue,
}

impl ParameterBlock {
    #[must_use]
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    #[must_use]
    pub fn float(name: impl Into<String>, value: f32) -> Self {
        Self::new(name, ParameterValue::Float(value))
    }

    #[must_use]
    pub fn vector3(name: impl Into<String>, value: Vec3) -> Self {
        Self::new(name, ParameterValue::Vector3(value))
    }

    #[must_use]
    pub fn color(name: impl Into<String>, value: Vec4) -> Self {
        Self::new(name, ParameterValue::Color(value))
    }

    #[must_use]
    pub fn texture(name: impl Into<String>) -> Self {
        Self::new(name, ParameterValue::Texture(None))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &ParameterValue {
        &self.value
    }
}

impl MaterialBlock for ParameterBlock {
    fn type_name(&self) -> &'static str {
        "Parameter"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        match self.value {
            ParameterValue::Color(_) => COLOR_SOCKETS,
            ref value => vector_sockets(value.ty().chunk_type().components().max(1)),
        }
    }

    fn compile(&self, _node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let ty = self.value.ty();
        match compiler.find_param_entry(&self.name) {
            Some(entry) if entry.ty == ty => CodeChunk::reference(ty.chunk_type(), self.name.as_str()),
            Some(entry) => {
                log::warn!(
                    "Parameter '{}' is laid out as {:?} but authored as {ty:?}, using its default",
                    self.name,
                    entry.ty
                );
                self.value.literal()
            }
            None => self.value.literal(),
        }
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&self.name);
        hasher.write_str(self.value.ty().shader_type());
        self.value.hash_into(hasher);
    }

    fn parameter(&self) -> Option<ParameterInfo> {
        Some(ParameterInfo {
            name: self.name.clone(),
            ty: self.value.ty(),
        })
    }
}
