//! Compilation setup: the permutation a technique is compiled for.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::block::ContentHasher;

use super::defines::ShaderDefines;

/// Render pass a technique is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaterialPass {
    DepthPrepass,
    ShadowDepth,
    Wireframe,
    ConstantColor,
    SelectionFragments,
    #[default]
    Forward,
}

impl MaterialPass {
    pub const ALL: [Self; 6] = [
        Self::DepthPrepass,
        Self::ShadowDepth,
        Self::Wireframe,
        Self::ConstantColor,
        Self::SelectionFragments,
        Self::Forward,
    ];

    #[must_use]
    pub const fn define(self) -> &'static str {
        match self {
            Self::DepthPrepass => "MAT_PASS_DEPTH_PREPASS",
            Self::ShadowDepth => "MAT_PASS_SHADOW_DEPTH",
            Self::Wireframe => "MAT_PASS_WIREFRAME",
            Self::ConstantColor => "MAT_PASS_CONST_COLOR",
            Self::SelectionFragments => "MAT_PASS_SELECTION",
            Self::Forward => "MAT_PASS_FORWARD",
        }
    }

    /// Passes that only produce depth.
    #[must_use]
    pub const fn is_depth_only(self) -> bool {
        matches!(self, Self::DepthPrepass | Self::ShadowDepth)
    }
}

/// Physical vertex layout of the mesh the technique is used with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MeshVertexFormat {
    PositionOnly,
    #[default]
    Static,
    /// Static with a second UV channel and vertex color.
    StaticEx,
    Skinned4,
    Skinned4Ex,
}

impl MeshVertexFormat {
    pub const ALL: [Self; 5] = [
        Self::PositionOnly,
        Self::Static,
        Self::StaticEx,
        Self::Skinned4,
        Self::Skinned4Ex,
    ];
}

/// Everything besides the graph that selects one compiled permutation.
///
/// The whole value is part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialCompilationSetup {
    pub pass: MaterialPass,
    pub vertex_format: MeshVertexFormat,
    pub msaa: bool,
    pub bindless_textures: bool,
    pub meshlets: bool,
}

impl MaterialCompilationSetup {
    #[must_use]
    pub fn new(pass: MaterialPass, vertex_format: MeshVertexFormat) -> Self {
        Self {
            pass,
            vertex_format,
            ..Default::default()
        }
    }

    /// Stable 64-bit key of this setup.
    #[must_use]
    pub fn key(&self) -> u64 {
        let mut hasher = ContentHasher::new();
        hasher.write_str(self.pass.define());
        hasher.write_u32(self.vertex_format as u32);
        hasher.write_bool(self.msaa);
        hasher.write_bool(self.bindless_textures);
        hasher.write_bool(self.meshlets);
        hasher.finish()
    }

    /// Preprocessor defines describing this permutation.
    #[must_use]
    pub fn defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::new();
        defines.set(self.pass.define(), "1");

        match self.vertex_format {
            MeshVertexFormat::PositionOnly => defines.set("MAT_VERTEX_POSITION_ONLY", "1"),
            MeshVertexFormat::Static => defines.set("MAT_VERTEX_STATIC", "1"),
            MeshVertexFormat::StaticEx => {
                defines.set("MAT_VERTEX_STATIC", "1");
                defines.set("MAT_VERTEX_SECOND_UV", "1");
            }
            MeshVertexFormat::Skinned4 => {
                defines.set("MAT_VERTEX_SKINNED", "1");
                defines.set("MAT_VERTEX_NUM_BONES", "4");
            }
            MeshVertexFormat::Skinned4Ex => {
                defines.set("MAT_VERTEX_SKINNED", "1");
                defines.set("MAT_VERTEX_NUM_BONES", "4");
                defines.set("MAT_VERTEX_SECOND_UV", "1");
            }
        }

        if self.bindless_textures {
            defines.set("MAT_BINDLESS", "1");
        }
        if self.meshlets {
            defines.set("MAT_MESHLET", "1");
        }
        if self.msaa {
            defines.set("MSAA", "1");
        }
        defines
    }
}

impl fmt::Display for MaterialCompilationSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.pass, self.vertex_format)?;
        for (enabled, flag) in [(self.msaa, "msaa"), (self.bindless_textures, "bindless"), (self.meshlets, "meshlets")] {
            if enabled {
                write!(f, "+{flag}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_their_own_defines() {
        let setup = MaterialCompilationSetup { meshlets: true, ..Default::default() };
        let defines = setup.defines();
        assert!(defines.contains("MAT_MESHLET"));
        assert!(!defines.contains("MAT_BINDLESS"));
        assert!(!defines.contains("MSAA"));
    }

    #[test]
    fn every_field_changes_the_key() {
        let base = MaterialCompilationSetup::default();
        let variants = [
            MaterialCompilationSetup { pass: MaterialPass::DepthPrepass, ..base },
            MaterialCompilationSetup { vertex_format: MeshVertexFormat::Skinned4, ..base },
            MaterialCompilationSetup { msaa: true, ..base },
            MaterialCompilationSetup { bindless_textures: true, ..base },
            MaterialCompilationSetup { meshlets: true, ..base },
        ];
        for v in variants {
            assert_ne!(v.key(), base.key(), "{v}");
        }
    }

    #[test]
    fn display_lists_flags() {
        let setup = MaterialCompilationSetup { msaa: true, ..Default::default() };
        assert_eq!(setup.to_string(), "Forward/Static+msaa");
    }
}
