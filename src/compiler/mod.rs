//! Shader generation.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`setup`] | The permutation being compiled (pass, vertex format, flags) |
//! | [`vertex_format`] | Per-format vertex stream tables |
//! | [`layout`] | Parameter storage assignment |
//! | [`stage`] | [`StageCompiler`], the per-stage evaluation context |
//! | [`geometry`] | [`MeshGeometryCompiler`], pixel then vertex phase and final text |
//! | [`technique`] | [`compile_technique`] entry point |

pub mod defines;
pub mod geometry;
pub mod layout;
pub mod render_states;
pub mod setup;
pub mod stage;
pub mod technique;
pub mod vertex_format;

pub use defines::ShaderDefines;
pub use geometry::MeshGeometryCompiler;
pub use layout::{MaterialDataBinding, MaterialDataLayout, MaterialDataLayoutEntry, MaterialParameterType};
pub use render_states::MaterialRenderStates;
pub use setup::{MaterialCompilationSetup, MaterialPass, MeshVertexFormat};
pub use stage::{ShaderStage, StageCompiler, VertexDataRequests};
pub use technique::{CompilationKey, GeneratedShader, compile_technique};
pub use vertex_format::{MeshVertexFormatInfo, VertexStream, VertexStreamFormat};
