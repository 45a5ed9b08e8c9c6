//! Stage Compiler
//!
//! One [`StageCompiler`] accumulates the statements of one shader stage
//! (pixel or vertex) for one compile request and serves the blocks being
//! compiled:
//!
//! | Service | Purpose |
//! |---------|---------|
//! | [`eval_input`](StageCompiler::eval_input) | Resolve an input socket, compiling the source block at most once |
//! | [`var`](StageCompiler::var) | Materialize a value into a fresh local |
//! | [`vertex_data`](StageCompiler::vertex_data) | Request a semantic vertex value |
//! | [`find_param_entry`](StageCompiler::find_param_entry) | Look up a parameter's storage |
//! | [`include_header`](StageCompiler::include_header) | Record a helper include |
//!
//! # Memoization
//!
//! The memo table maps `(source block, output socket)` to the compiled
//! value. Each pair is compiled once per stage compiler no matter how many
//! consumers read it, which keeps diamond-shaped graphs linear and emits
//! each materialized statement once. Statement order is the order of first
//! use, so generated code is deterministic for a given graph and setup.
//!
//! A stage compiler is owned by a single compile task and is never shared.

use std::fmt::{self, Write as _};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::code::{CodeChunk, MaterialVertexDataType};
use crate::config::CompilerConfig;
use crate::graph::{MaterialGraph, NodeId, SocketDirection};

use super::layout::{MaterialDataLayout, MaterialDataLayoutEntry};
use super::setup::MaterialCompilationSetup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
}

/// Insertion-ordered set of requested vertex data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexDataRequests {
    items: SmallVec<[MaterialVertexDataType; 8]>,
}

impl VertexDataRequests {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `data` was already present.
    pub fn insert(&mut self, data: MaterialVertexDataType) -> bool {
        if self.items.contains(&data) {
            return false;
        }
        self.items.push(data);
        true
    }

    #[must_use]
    pub fn contains(&self, data: MaterialVertexDataType) -> bool {
        self.items.contains(&data)
    }

    /// Requests in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = MaterialVertexDataType> + '_ {
        self.items.iter().copied()
    }

    /// Requests in declaration order, as emitted in interface blocks.
    #[must_use]
    pub fn sorted(&self) -> Vec<MaterialVertexDataType> {
        let mut sorted = self.items.to_vec();
        sorted.sort_unstable();
        sorted
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<MaterialVertexDataType> for VertexDataRequests {
    fn extend<T: IntoIterator<Item = MaterialVertexDataType>>(&mut self, iter: T) {
        for data in iter {
            self.insert(data);
        }
    }
}

pub struct StageCompiler<'a> {
    graph: &'a MaterialGraph,
    layout: &'a MaterialDataLayout,
    setup: &'a MaterialCompilationSetup,
    config: &'a CompilerConfig,
    context_name: &'a str,
    stage: ShaderStage,

    code: String,
    auto_name_counter: u32,
    compiled_outputs: FxHashMap<(NodeId, &'static str), CodeChunk>,
    vertex_data: FxHashMap<MaterialVertexDataType, CodeChunk>,
    requests: VertexDataRequests,
    /// Pixel stage requests, known to the vertex stage.
    pixel_requests: VertexDataRequests,
    includes: Vec<String>,
}

impl<'a> StageCompiler<'a> {
    #[must_use]
    pub fn new(
        graph: &'a MaterialGraph,
        layout: &'a MaterialDataLayout,
        setup: &'a MaterialCompilationSetup,
        config: &'a CompilerConfig,
        context_name: &'a str,
        stage: ShaderStage,
    ) -> Self {
        Self {
            graph,
            layout,
            setup,
            config,
            context_name,
            stage,
            code: String::new(),
            auto_name_counter: 0,
            compiled_outputs: FxHashMap::default(),
            vertex_data: FxHashMap::default(),
            requests: VertexDataRequests::new(),
            pixel_requests: VertexDataRequests::new(),
            includes: Vec::new(),
        }
    }

    /// Vertex stage compiler that passes `pixel_requests` through.
    #[must_use]
    pub fn new_vertex(
        graph: &'a MaterialGraph,
        layout: &'a MaterialDataLayout,
        setup: &'a MaterialCompilationSetup,
        config: &'a CompilerConfig,
        context_name: &'a str,
        pixel_requests: VertexDataRequests,
    ) -> Self {
        Self {
            pixel_requests,
            ..Self::new(graph, layout, setup, config, context_name, ShaderStage::Vertex)
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    #[must_use]
    pub fn setup(&self) -> &'a MaterialCompilationSetup {
        self.setup
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &'a CompilerConfig {
        self.config
    }

    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'a MaterialGraph {
        self.graph
    }

    #[inline]
    #[must_use]
    pub fn context_name(&self) -> &'a str {
        self.context_name
    }

    /// Statements emitted so far.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Vertex data requested by this stage.
    #[must_use]
    pub fn requests(&self) -> &VertexDataRequests {
        &self.requests
    }

    #[must_use]
    pub fn pixel_requests(&self) -> &VertexDataRequests {
        &self.pixel_requests
    }

    #[must_use]
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    // ─── Emission ────────────────────────────────────────────────────────────

    /// Appends raw statement text.
    pub fn append(&mut self, text: &str) {
        self.code.push_str(text);
    }

    pub fn appendf(&mut self, args: fmt::Arguments<'_>) {
        // Writing into a String cannot fail.
        let _ = self.code.write_fmt(args);
    }

    fn auto_name(&mut self) -> String {
        self.auto_name_counter += 1;
        format!("temp{}", self.auto_name_counter)
    }

    /// Emits `<type> tempN = value;` and returns a reference to `tempN`.
    ///
    /// Non-numeric values cannot be stored in a local and are returned as is.
    pub fn var(&mut self, value: &CodeChunk) -> CodeChunk {
        let Some(type_name) = value.ty().float_type_name() else {
            log::warn!("Cannot store '{value}' in a local variable in '{}'", self.context_name);
            return value.clone();
        };

        let name = self.auto_name();
        self.appendf(format_args!("{type_name} {name} = {value};\n"));
        CodeChunk::reference(value.ty(), name)
    }

    pub fn include_header(&mut self, path: &str) {
        if !path.is_empty() && !self.includes.iter().any(|p| p == path) {
            self.includes.push(path.to_owned());
        }
    }

    // ─── Evaluation ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn has_connection(&self, node: NodeId, input: &str) -> bool {
        self.graph.has_connection(node, input)
    }

    /// Value feeding `node.input`, or `default` when nothing usable is
    /// connected.
    ///
    /// The source block is compiled at most once per output; non-constant
    /// results are materialized into a local so repeated use does not
    /// duplicate the expression. A socket-declared swizzle is applied on top
    /// of the memoized value of the block's primary output.
    pub fn eval_input(&mut self, node: NodeId, input: &str, default: impl Into<CodeChunk>) -> CodeChunk {
        let graph = self.graph;
        let Some(connection) = graph.input_connection(node, input) else {
            return default.into();
        };
        let Some(source) = graph.block(connection.source) else {
            return default.into();
        };

        let swizzle = source
            .find_socket(connection.output, SocketDirection::Output)
            .and_then(|s| s.swizzle);
        let output = match swizzle {
            Some(_) => source.primary_output().unwrap_or(connection.output),
            None => connection.output,
        };

        let key = (connection.source, output);
        let value = if let Some(cached) = self.compiled_outputs.get(&key) {
            cached.clone()
        } else {
            let mut value = source.compile(connection.source, self, output);
            if !value.is_void() && !value.constant() && !is_identifier(value.text()) {
                if self.config.emit_debug_comments {
                    self.appendf(format_args!("// {}.{output}\n", source.type_name()));
                }
                value = self.var(&value);
            }
            self.compiled_outputs.insert(key, value.clone());
            value
        };

        if value.is_void() {
            log::debug!(
                "Block '{}' produced no value for '{output}' in '{}', using default",
                source.type_name(),
                self.context_name
            );
            return default.into();
        }

        match swizzle {
            Some(mask) => value.swizzle(mask),
            None => value,
        }
    }

    /// Semantic vertex value for the current stage.
    ///
    /// In the pixel stage a stream the mesh format lacks yields a zero of
    /// the right arity (with a warning) and is not requested; everything else
    /// is recorded as a request and returned as an interpolant reference.
    /// The vertex stage always returns a reference to its local.
    pub fn vertex_data(&mut self, data: MaterialVertexDataType) -> CodeChunk {
        if let Some(cached) = self.vertex_data.get(&data) {
            return cached.clone();
        }

        let info = data.info();
        let chunk = match self.stage {
            ShaderStage::Pixel if info.vertex_stream && !self.setup.vertex_format.info().provides(data) => {
                log::warn!(
                    "Vertex stream '{}' is not present in {:?} when compiling '{}'",
                    info.name,
                    self.setup.vertex_format,
                    self.context_name
                );
                data.default_value()
            }
            ShaderStage::Pixel if info.renormalize => {
                self.requests.insert(data);
                let name = format!("{}_NORM", info.name);
                self.appendf(format_args!("{} {name} = normalize({});\n", info.shader_type, info.name));
                CodeChunk::reference(info.ty, name)
            }
            ShaderStage::Pixel | ShaderStage::Vertex => {
                self.requests.insert(data);
                CodeChunk::reference(info.ty, info.name)
            }
        };

        self.vertex_data.insert(data, chunk.clone());
        chunk
    }

    /// Storage of a bound parameter, `None` when the layout does not bind it.
    #[must_use]
    pub fn find_param_entry(&self, name: &str) -> Option<&'a MaterialDataLayoutEntry> {
        self.layout.find_param_entry(name)
    }
}

/// Plain identifiers can be repeated without cost and are not materialized.
fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
