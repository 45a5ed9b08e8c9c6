//! Mesh Geometry Compiler
//!
//! Drives the root output block through the two stages of a mesh technique
//! and assembles the final shader text.
//!
//! # Phases
//!
//! 1. **Pixel**: the output block's pixel function runs on a pixel
//!    [`StageCompiler`]; the vertex data it touches becomes the set of
//!    interpolants the vertex stage must produce.
//! 2. **Vertex**: a vertex stage compiler that knows those requests runs the
//!    output block's vertex function (custom world offset). The vertex body
//!    is then emitted in a fixed order: raw attribute unpacking, object
//!    transform, world-space position/normal/tangent/bitangent (only the ones
//!    needed), custom offset code, and the clip-space position last.
//!
//! # Output layout
//!
//! Header comment, deduplicated includes, material descriptor, pixel shader,
//! vertex shader. The text is rendered from `templates/material.shader`.

use std::sync::OnceLock;

use minijinja::Environment;
use minijinja::syntax::SyntaxConfig;
use serde::Serialize;

use crate::code::{CodeChunk, MaterialVertexDataType};
use crate::config::CompilerConfig;
use crate::errors::Result;
use crate::graph::MaterialGraph;

use super::layout::{MATERIAL_DESCRIPTOR_NAME, MaterialDataLayout};
use super::render_states::MaterialRenderStates;
use super::setup::MaterialCompilationSetup;
use super::stage::{ShaderStage, StageCompiler, VertexDataRequests};
use super::vertex_format::{VertexStream, VertexStreamFormat};

const MATERIAL_TEMPLATE: &str = include_str!("templates/material.shader");

/// Pixel body used when the graph has no output block.
pub const ERROR_PIXEL_BODY: &str = "gl_Target0 = vec4(1,0,1,1); // missing output block\n";

// ─── Template environment ────────────────────────────────────────────────────

fn build_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("material", MATERIAL_TEMPLATE)?;
    Ok(env)
}

fn template_env() -> Result<&'static Environment<'static>> {
    static ENV: OnceLock<Environment<'static>> = OnceLock::new();
    if let Some(env) = ENV.get() {
        return Ok(env);
    }
    let env = build_env()?;
    Ok(ENV.get_or_init(|| env))
}

// ─── Template context ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ShaderTemplateContext<'a> {
    context_name: &'a str,
    includes: Vec<&'a str>,
    descriptor: Option<DescriptorContext<'a>>,
    states: StatesContext,
    pixel: StageContext<'a>,
    vertex: VertexContext<'a>,
}

#[derive(Serialize)]
struct FieldContext<'a> {
    offset: u32,
    ty: &'a str,
    name: String,
}

#[derive(Serialize)]
struct DescriptorContext<'a> {
    name: &'a str,
    constants: Vec<FieldContext<'a>>,
    textures: Vec<&'a str>,
}

#[derive(Serialize)]
struct StatesContext {
    depth_test: bool,
    depth_write: bool,
    depth_func: &'static str,
    cull: bool,
    cull_mode: &'static str,
    blend: bool,
    alpha_to_coverage: bool,
}

#[derive(Serialize)]
struct InterfaceContext {
    flat: bool,
    ty: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
struct StageContext<'a> {
    interface: Vec<InterfaceContext>,
    early_fragment_tests: bool,
    body: Vec<&'a str>,
}

#[derive(Serialize)]
struct PackingContext<'a> {
    name: &'a str,
    fields: Vec<FieldContext<'a>>,
}

#[derive(Serialize)]
struct VertexContext<'a> {
    packing: Option<PackingContext<'a>>,
    interface: Vec<InterfaceContext>,
    body: Vec<&'a str>,
}

fn interface(requests: &[MaterialVertexDataType]) -> Vec<InterfaceContext> {
    requests
        .iter()
        .map(|data| {
            let info = data.info();
            InterfaceContext {
                flat: info.flat,
                ty: info.shader_type,
                name: info.name,
            }
        })
        .collect()
}

// ─── Compiler ────────────────────────────────────────────────────────────────

pub struct MeshGeometryCompiler<'a> {
    layout: &'a MaterialDataLayout,
    setup: &'a MaterialCompilationSetup,
    context_name: &'a str,
    pixel: StageCompiler<'a>,
    vertex: StageCompiler<'a>,
    render_states: MaterialRenderStates,
    missing_output: bool,
}

impl<'a> MeshGeometryCompiler<'a> {
    #[must_use]
    pub fn new(
        graph: &'a MaterialGraph,
        layout: &'a MaterialDataLayout,
        setup: &'a MaterialCompilationSetup,
        config: &'a CompilerConfig,
        context_name: &'a str,
    ) -> Self {
        Self {
            layout,
            setup,
            context_name,
            pixel: StageCompiler::new(graph, layout, setup, config, context_name, ShaderStage::Pixel),
            vertex: StageCompiler::new_vertex(graph, layout, setup, config, context_name, VertexDataRequests::new()),
            render_states: MaterialRenderStates::opaque(),
            missing_output: false,
        }
    }

    /// Runs the pixel phase, then the vertex phase.
    pub fn compile(&mut self) {
        let graph = self.pixel.graph();
        let Some((node, output)) = graph.find_output_block() else {
            log::warn!("Material '{}' has no output block, using the error shader", self.context_name);
            self.missing_output = true;
            return;
        };

        output.compile_pixel_function(node, &mut self.pixel, &mut self.render_states);

        self.vertex = StageCompiler::new_vertex(
            graph,
            self.layout,
            self.setup,
            self.pixel.config(),
            self.context_name,
            self.pixel.requests().clone(),
        );
        output.compile_vertex_function(node, &mut self.vertex, &mut self.render_states);
    }

    #[must_use]
    pub fn render_states(&self) -> MaterialRenderStates {
        self.render_states
    }

    #[must_use]
    pub fn missing_output(&self) -> bool {
        self.missing_output
    }

    #[must_use]
    pub fn pixel(&self) -> &StageCompiler<'a> {
        &self.pixel
    }

    #[must_use]
    pub fn vertex(&self) -> &StageCompiler<'a> {
        &self.vertex
    }

    /// Every vertex value the vertex stage has to compute.
    #[must_use]
    pub fn vertex_requests(&self) -> VertexDataRequests {
        let mut requested = self.pixel.requests().clone();
        requested.extend(self.vertex.requests().iter());

        let derived: Vec<_> = requested.iter().filter_map(MaterialVertexDataType::local_source).collect();
        requested.extend(derived);
        requested.extend([
            MaterialVertexDataType::WorldPosition,
            MaterialVertexDataType::VertexPosition,
            MaterialVertexDataType::ObjectIndex,
        ]);
        requested
    }

    /// Includes of both stages, deduplicated, after the base headers.
    #[must_use]
    pub fn includes(&self) -> Vec<&str> {
        let vertex_header = if self.setup.meshlets {
            "material/vertex_bindless.h"
        } else {
            "material/vertex_standard.h"
        };

        let mut includes = vec!["material/material.h", vertex_header];
        for path in self.pixel.includes().iter().chain(self.vertex.includes()) {
            if !includes.contains(&path.as_str()) {
                includes.push(path);
            }
        }
        includes
    }

    // ─── Assembly ────────────────────────────────────────────────────────────

    /// Renders the complete shader text.
    pub fn assemble(&self) -> Result<String> {
        let pixel_requests = if self.missing_output { Vec::new() } else { self.pixel.requests().sorted() };
        let pixel_body: Vec<&str> = if self.missing_output {
            ERROR_PIXEL_BODY.lines().collect()
        } else {
            self.pixel.code().lines().collect()
        };

        let vertex_body = self.vertex_body();
        let context = ShaderTemplateContext {
            context_name: self.context_name,
            includes: self.includes(),
            descriptor: self.descriptor(),
            states: self.states(),
            pixel: StageContext {
                interface: interface(&pixel_requests),
                early_fragment_tests: self.render_states.contains(MaterialRenderStates::EARLY_PIXEL_TESTS),
                body: pixel_body,
            },
            vertex: VertexContext {
                packing: self.packing(),
                interface: interface(&pixel_requests),
                body: vertex_body.lines().collect(),
            },
        };

        let template = template_env()?.get_template("material")?;
        Ok(template.render(&context)?)
    }

    fn descriptor(&self) -> Option<DescriptorContext<'a>> {
        if self.setup.bindless_textures || self.layout.is_empty() {
            return None;
        }
        Some(DescriptorContext {
            name: MATERIAL_DESCRIPTOR_NAME,
            constants: self
                .layout
                .constants()
                .map(|(entry, offset)| FieldContext {
                    offset,
                    ty: entry.ty.shader_type(),
                    name: entry.name.clone(),
                })
                .collect(),
            textures: self.layout.textures().map(|e| e.name.as_str()).collect(),
        })
    }

    fn states(&self) -> StatesContext {
        let s = self.render_states;
        StatesContext {
            depth_test: s.contains(MaterialRenderStates::DEPTH_TEST),
            depth_write: s.contains(MaterialRenderStates::DEPTH_WRITE),
            depth_func: s.depth_function(),
            cull: !s.contains(MaterialRenderStates::TWO_SIDED),
            cull_mode: s.cull_mode(),
            blend: s.contains(MaterialRenderStates::ALPHA_BLEND),
            alpha_to_coverage: s.contains(MaterialRenderStates::ALPHA_TO_COVERAGE),
        }
    }

    fn packing(&self) -> Option<PackingContext<'a>> {
        if self.setup.meshlets {
            return None;
        }
        let info = self.setup.vertex_format.info();
        Some(PackingContext {
            name: info.struct_name,
            fields: info
                .streams
                .iter()
                .map(|s| FieldContext {
                    offset: s.offset,
                    ty: s.format.shader_type(),
                    name: s.raw_name(),
                })
                .collect(),
        })
    }

    /// Vertex `main` body in its fixed statement order.
    fn vertex_body(&self) -> String {
        use MaterialVertexDataType as D;

        let requested = self.vertex_requests();
        let outputs = self.pixel.requests();
        let format = self.setup.vertex_format.info();
        let mut body = String::new();

        // Locals for values that are not interface outputs
        for data in requested.sorted() {
            if !outputs.contains(data) {
                let info = data.info();
                body.push_str(&format!("{} {} = {};\n", info.shader_type, info.name, data.default_value()));
            }
        }

        // Raw attributes
        if self.setup.meshlets {
            body.push_str("ObjectIndex = FetchObjectIndex();\n");
            body.push_str(&format!("uint VertexWordOffset = FetchVertexWordOffset({});\n", format.stride / 4));
        } else {
            body.push_str("ObjectIndex = gl_InstanceID;\n");
        }
        if requested.contains(D::SubObjectIndex) {
            body.push_str("SubObjectIndex = ObjectData[ObjectIndex].SubObjectIndex;\n");
        }

        for stream in &format.streams {
            if requested.contains(stream.data) {
                let value = if self.setup.meshlets {
                    unpack_meshlet_stream(stream)
                } else {
                    unpack_vertex_stream(stream)
                };
                body.push_str(&format!("{} = {value};\n", stream.data.info().name));
            }
        }
        for data in requested.iter().filter(|d| d.info().vertex_stream && !format.provides(*d)) {
            log::debug!(
                "Vertex stream '{}' is not provided by {:?} in '{}', left at zero",
                data.info().name,
                format.format,
                self.context_name
            );
        }

        // Object transform
        body.push_str("mat4 LocalToScene = ObjectData[ObjectIndex].LocalToScene;\n");

        // World space
        body.push_str("WorldPosition = (LocalToScene * VertexPosition.xyz1).xyz;\n");
        for world in [D::WorldNormal, D::WorldTangent, D::WorldBitangent] {
            if let Some(local) = world.local_source().filter(|_| requested.contains(world)) {
                body.push_str(&format!(
                    "{} = normalize((LocalToScene * {}.xyz0).xyz);\n",
                    world.info().name,
                    local.info().name
                ));
            }
        }

        // Custom vertex code
        let custom = self.vertex.code();
        if !custom.is_empty() {
            body.push_str("{\n");
            body.push_str(&format!("    vec3 WorldVertexOffset = {};\n", CodeChunk::zero(3)));
            for line in custom.lines() {
                body.push_str("    ");
                body.push_str(line);
                body.push('\n');
            }
            body.push_str("    WorldPosition += WorldVertexOffset;\n");
            body.push_str("}\n");
        }

        body.push_str("gl_Position = WorldToScreen * WorldPosition.xyz1;\n");
        body
    }
}

fn unpack_vertex_stream(stream: &VertexStream) -> String {
    let raw = format!("v.{}", stream.raw_name());
    match (stream.unpack, stream.format) {
        (Some(function), VertexStreamFormat::Rg32Uint) => format!("{function}({raw}.x, {raw}.y)"),
        (Some(function), _) => format!("{function}({raw})"),
        (None, _) => raw,
    }
}

fn unpack_meshlet_stream(stream: &VertexStream) -> String {
    let first_word = stream.offset / 4;
    let words: Vec<String> = (0..stream.format.components())
        .map(|k| format!("MeshVertexData[VertexWordOffset + {}]", first_word + k))
        .collect();

    match stream.unpack {
        Some(function) => format!("{function}({})", words.join(", ")),
        None if words.len() == 1 => format!("uintBitsToFloat({})", words[0]),
        None => {
            let floats: Vec<String> = words.iter().map(|w| format!("uintBitsToFloat({w})")).collect();
            format!("vec{}({})", floats.len(), floats.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::setup::MeshVertexFormat;

    #[test]
    fn packed_position_unpacks_both_words() {
        let stream = MeshVertexFormat::Static.info().streams[0];
        assert_eq!(
            unpack_vertex_stream(&stream),
            "UnpackPosition_22_22_20(v.RawVertexPosition.x, v.RawVertexPosition.y)"
        );
    }

    #[test]
    fn meshlet_float_streams_reinterpret_words() {
        let stream = MeshVertexFormat::StaticEx.info().streams[0];
        assert_eq!(
            unpack_meshlet_stream(&stream),
            "vec3(uintBitsToFloat(MeshVertexData[VertexWordOffset + 0]), uintBitsToFloat(MeshVertexData[VertexWordOffset + 1]), uintBitsToFloat(MeshVertexData[VertexWordOffset + 2]))"
        );
    }
}
