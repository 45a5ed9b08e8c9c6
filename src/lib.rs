#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Material graph to shader source compiler.
//!
//! A [`MaterialGraph`] of blocks is compiled per [`MaterialCompilationSetup`]
//! (pass, vertex format, feature flags) into one shader text with a pixel
//! and a vertex stage. The [`MaterialTechniqueCache`] runs those compiles in
//! the background, shares identical results and recompiles techniques when
//! the files they include change.
//!
//! ```rust,ignore
//! use matgraph::graph::blocks::{ConstColorBlock, UnlitOutputBlock};
//! use matgraph::{MaterialCompilationSetup, MaterialGraph, MaterialPass, MeshVertexFormat};
//!
//! let mut graph = MaterialGraph::new();
//! let color = graph.add_block(ConstColorBlock::rgba(1.0, 0.5, 0.0, 1.0))?;
//! let output = graph.add_block(UnlitOutputBlock::default())?;
//! graph.connect(color, "RGB", output, "Color")?;
//!
//! let setup = MaterialCompilationSetup::new(MaterialPass::Forward, MeshVertexFormat::Static);
//! let shader = matgraph::compile_technique("demo", &graph, &setup, &Default::default())?;
//! ```

pub mod code;
pub mod compiler;
pub mod config;
pub mod errors;
pub mod graph;
pub mod service;

pub use code::{CodeChunk, CodeChunkType, MaterialVertexDataType};
pub use compiler::{
    CompilationKey, GeneratedShader, MaterialCompilationSetup, MaterialPass, MaterialRenderStates, MeshVertexFormat,
    compile_technique,
};
pub use config::{CacheConfig, CompilerConfig};
pub use errors::{MaterialError, Result};
pub use graph::{MaterialBlock, MaterialGraph, MaterialOutputBlock, NodeId};
pub use service::{CompilationState, IncludeResolvingBackend, MaterialTechniqueCache, ShaderBackend, TechniqueId};
