//! Technique compilation entry point.
//!
//! [`compile_technique`] is the pure front half of the pipeline: graph +
//! setup in, shader text + side channels out. The technique cache runs it
//! on a worker and hands the result to the shader backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::code::MaterialVertexDataType;
use crate::config::CompilerConfig;
use crate::errors::{MaterialError, Result};
use crate::graph::{ContentHasher, MaterialGraph};

use super::defines::ShaderDefines;
use super::geometry::MeshGeometryCompiler;
use super::layout::MaterialDataLayout;
use super::render_states::MaterialRenderStates;
use super::setup::MaterialCompilationSetup;

/// Identity of one compiled technique.
///
/// `shader_key` covers everything that affects the generated text, so two
/// requests with equal keys may share one compiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompilationKey {
    pub shader_key: u64,
    pub setup_key: u64,
}

impl CompilationKey {
    #[must_use]
    pub fn compute(context_name: &str, graph: &MaterialGraph, setup: &MaterialCompilationSetup) -> Self {
        let setup_key = setup.key();
        let mut hasher = ContentHasher::new();
        hasher.write_str(context_name);
        hasher.write_u64(graph.content_hash());
        hasher.write_u64(setup_key);
        Self {
            shader_key: hasher.finish(),
            setup_key,
        }
    }
}

impl fmt::Display for CompilationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{:016x}", self.shader_key, self.setup_key)
    }
}

/// Generated shader and everything the backend needs alongside it.
#[derive(Debug, Clone)]
pub struct GeneratedShader {
    pub key: CompilationKey,
    pub setup: MaterialCompilationSetup,
    pub source: String,
    pub defines: ShaderDefines,
    pub render_states: MaterialRenderStates,
    /// Interpolants the pixel stage reads, in declaration order.
    pub pixel_inputs: Vec<MaterialVertexDataType>,
    /// Everything the vertex stage computes.
    pub vertex_data: Vec<MaterialVertexDataType>,
    pub includes: Vec<String>,
    /// The graph had no output block and the error shader was generated.
    pub missing_output: bool,
}

/// Compiles `graph` for `setup`.
///
/// Authoring problems degrade to defaults with a warning; only template
/// rendering failures are reported as errors.
pub fn compile_technique(
    context_name: &str,
    graph: &MaterialGraph,
    setup: &MaterialCompilationSetup,
    config: &CompilerConfig,
) -> Result<GeneratedShader> {
    let start = Instant::now();
    let key = CompilationKey::compute(context_name, graph, setup);

    let layout = MaterialDataLayout::build(graph);
    let mut compiler = MeshGeometryCompiler::new(graph, &layout, setup, config, context_name);
    compiler.compile();
    let source = compiler.assemble()?;

    let shader = GeneratedShader {
        key,
        setup: *setup,
        defines: setup.defines(),
        render_states: compiler.render_states(),
        pixel_inputs: compiler.pixel().requests().sorted(),
        vertex_data: compiler.vertex_requests().sorted(),
        includes: compiler.includes().into_iter().map(str::to_owned).collect(),
        missing_output: compiler.missing_output(),
        source,
    };

    if let Some(dir) = &config.dump_directory {
        match dump_shader(dir, context_name, &shader) {
            Ok(path) => log::debug!("Dumped '{context_name}' to {}", path.display()),
            Err(e) => log::warn!("Failed to dump generated shader: {e}"),
        }
    }

    log::info!("Compiled '{setup}' for '{context_name}' in {:.2?}", start.elapsed());
    Ok(shader)
}

/// File name a dump of `context_name` is written to.
#[must_use]
pub fn dump_file_name(context_name: &str, key: &CompilationKey) -> String {
    let stem: String = context_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}_{:016x}.shader", key.setup_key)
}

fn dump_shader(dir: &Path, context_name: &str, shader: &GeneratedShader) -> Result<PathBuf> {
    let path = dir.join(dump_file_name(context_name, &shader.key));
    std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&path, &shader.source))
        .map_err(|source| MaterialError::DumpError {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_names_are_filesystem_safe() {
        let key = CompilationKey {
            shader_key: 1,
            setup_key: 0xab,
        };
        assert_eq!(dump_file_name("materials/rock 01", &key), "materials_rock_01_00000000000000ab.shader");
    }
}
