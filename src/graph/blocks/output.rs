//! Output blocks: the roots that drive code generation.
//!
//! Both output blocks share the pass dispatch below and differ only in how
//! they shade the surface color for the forward pass.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::code::{CodeChunk, MaterialVertexDataType, ops};
use crate::compiler::render_states::MaterialRenderStates;
use crate::compiler::setup::MaterialPass;
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock, MaterialOutputBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    Translucent,
}

/// Authored surface settings shared by all output blocks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub blend_mode: BlendMode,
    pub two_sided: bool,
    /// Discard threshold for the `Mask` input; `None` uses the configured
    /// default.
    pub mask_threshold: Option<f32>,
    /// Resolve the mask through alpha-to-coverage when rendering with MSAA.
    pub alpha_to_coverage: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            blend_mode: BlendMode::Opaque,
            two_sided: false,
            mask_threshold: None,
            alpha_to_coverage: true,
        }
    }
}

impl OutputSettings {
    #[must_use]
    pub fn translucent() -> Self {
        Self {
            blend_mode: BlendMode::Translucent,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.blend_mode == BlendMode::Translucent
    }

    fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.write_bool(self.is_translucent());
        hasher.write_bool(self.two_sided);
        hasher.write_bool(self.mask_threshold.is_some());
        hasher.write_f32(self.mask_threshold.unwrap_or_default());
        hasher.write_bool(self.alpha_to_coverage);
    }

    /// Whether `pass` evaluates the mask at all.
    #[must_use]
    pub fn masking_allowed(&self, pass: MaterialPass) -> bool {
        match pass {
            MaterialPass::Wireframe | MaterialPass::ConstantColor => false,
            MaterialPass::Forward => !self.is_translucent(),
            MaterialPass::DepthPrepass | MaterialPass::ShadowDepth | MaterialPass::SelectionFragments => true,
        }
    }

    /// Fixed-function state for `pass`.
    #[must_use]
    pub fn render_states(&self, pass: MaterialPass, masked: bool, msaa: bool) -> MaterialRenderStates {
        let mut states = MaterialRenderStates::opaque();
        if self.two_sided {
            states.insert(MaterialRenderStates::TWO_SIDED);
        }
        if pass == MaterialPass::Forward && self.is_translucent() {
            states.remove(MaterialRenderStates::DEPTH_WRITE);
            states.insert(MaterialRenderStates::ALPHA_BLEND);
        }
        if masked && msaa && self.alpha_to_coverage {
            states.insert(MaterialRenderStates::ALPHA_TO_COVERAGE);
        }
        if pass == MaterialPass::Forward && !self.is_translucent() && !masked {
            states.insert(MaterialRenderStates::EARLY_PIXEL_TESTS);
        }
        states
    }
}

/// Per-block shading of the forward color.
trait SurfaceShading {
    fn settings(&self) -> &OutputSettings;

    /// Three-component color written by the forward pass.
    fn shade(&self, node: NodeId, compiler: &mut StageCompiler<'_>) -> CodeChunk;
}

fn or_default(value: CodeChunk, default: impl Into<CodeChunk>) -> CodeChunk {
    if value.is_void() { default.into() } else { value }
}

fn emit_mask(node: NodeId, compiler: &mut StageCompiler<'_>, threshold: f32) {
    let mask = or_default(compiler.eval_input(node, "Mask", 1.0).conform(1), 1.0);
    let test = mask.less(&CodeChunk::from(threshold));
    compiler.appendf(format_args!("if {test} discard;\n"));
}

fn compile_surface_pixel<S: SurfaceShading>(
    block: &S,
    node: NodeId,
    compiler: &mut StageCompiler<'_>,
    states: &mut MaterialRenderStates,
) {
    let settings = *block.settings();
    let setup = *compiler.setup();
    let pass = setup.pass;

    let masked = settings.masking_allowed(pass) && compiler.has_connection(node, "Mask");
    *states = settings.render_states(pass, masked, setup.msaa);
    if masked {
        let threshold = settings
            .mask_threshold
            .unwrap_or(compiler.config().default_mask_threshold);
        emit_mask(node, compiler, threshold);
    }

    match pass {
        MaterialPass::DepthPrepass | MaterialPass::ShadowDepth => {}
        MaterialPass::SelectionFragments => {
            compiler.include_header("material/selection.h");
            let object = compiler.vertex_data(MaterialVertexDataType::ObjectIndex);
            let sub_object = compiler.vertex_data(MaterialVertexDataType::SubObjectIndex);
            compiler.appendf(format_args!("gl_Target0 = EncodeSelectionID({object}, {sub_object});\n"));
        }
        MaterialPass::Wireframe => {
            compiler.include_header("material/wireframe.h");
            compiler.append("gl_Target0 = vec4(WireframeColor, 1);\n");
        }
        MaterialPass::ConstantColor => {
            compiler.append("gl_Target0 = ConstantColor;\n");
        }
        MaterialPass::Forward => {
            let color = or_default(block.shade(node, compiler).conform(3), Vec3::ONE);
            let alpha = if settings.is_translucent() {
                or_default(compiler.eval_input(node, "Opacity", 1.0).conform(1), 1.0)
            } else {
                CodeChunk::from(1.0)
            };
            let target = ops::make_vector(&[&color, &alpha]);
            compiler.appendf(format_args!("gl_Target0 = {target};\n"));
        }
    }
}

fn compile_vertex_offset(node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates) {
    if !compiler.has_connection(node, "VertexOffset") {
        return;
    }
    let offset = compiler.eval_input(node, "VertexOffset", Vec3::ZERO).conform(3);
    if offset.is_void() {
        return;
    }
    if !offset.constant() {
        states.insert(MaterialRenderStates::HAS_VERTEX_OFFSET);
    }
    compiler.appendf(format_args!("WorldVertexOffset = {offset};\n"));
}

// ============================================================================
// Unlit
// ============================================================================

const UNLIT_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("Color").tagged("color"),
    SocketInfo::input("Opacity"),
    SocketInfo::input("Mask"),
    SocketInfo::input("VertexOffset").hidden(),
];

/// Writes `Color` unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct UnlitOutputBlock {
    pub settings: OutputSettings,
}

impl UnlitOutputBlock {
    #[must_use]
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }
}

impl SurfaceShading for UnlitOutputBlock {
    fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    fn shade(&self, node: NodeId, compiler: &mut StageCompiler<'_>) -> CodeChunk {
        compiler.eval_input(node, "Color", Vec3::ONE)
    }
}

impl MaterialBlock for UnlitOutputBlock {
    fn type_name(&self) -> &'static str {
        "UnlitOutput"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        UNLIT_SOCKETS
    }

    fn compile(&self, _node: NodeId, _compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        CodeChunk::void()
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        self.settings.hash_into(hasher);
    }

    fn as_output(&self) -> Option<&dyn MaterialOutputBlock> {
        Some(self)
    }
}

impl MaterialOutputBlock for UnlitOutputBlock {
    fn compile_pixel_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates) {
        compile_surface_pixel(self, node, compiler, states);
    }

    fn compile_vertex_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates) {
        compile_vertex_offset(node, compiler, states);
    }
}

// ============================================================================
// Lit
// ============================================================================

const LIT_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("BaseColor").tagged("color"),
    SocketInfo::input("Metallic"),
    SocketInfo::input("Roughness"),
    SocketInfo::input("Normal"),
    SocketInfo::input("Emissive").tagged("color"),
    SocketInfo::input("Opacity"),
    SocketInfo::input("Mask"),
    SocketInfo::input("VertexOffset").hidden(),
];

/// Metallic-roughness surface lit by `ComputeLighting`.
///
/// `Normal` is a world-space direction; unconnected it is the interpolated
/// vertex normal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LitOutputBlock {
    pub settings: OutputSettings,
}

impl LitOutputBlock {
    #[must_use]
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }
}

impl SurfaceShading for LitOutputBlock {
    fn settings(&self) -> &OutputSettings {
        &self.settings
    }

    fn shade(&self, node: NodeId, compiler: &mut StageCompiler<'_>) -> CodeChunk {
        compiler.include_header("material/lighting.h");

        let base_color = compiler.eval_input(node, "BaseColor", Vec3::splat(0.8)).conform(3);
        let metallic = compiler.eval_input(node, "Metallic", 0.0).conform(1);
        let roughness = compiler.eval_input(node, "Roughness", 0.5).conform(1);
        let normal = if compiler.has_connection(node, "Normal") {
            compiler.eval_input(node, "Normal", Vec3::Z).conform(3).normalize()
        } else {
            compiler.vertex_data(MaterialVertexDataType::WorldNormal)
        };
        let emissive = compiler.eval_input(node, "Emissive", Vec3::ZERO).conform(3);
        let position = compiler.vertex_data(MaterialVertexDataType::WorldPosition);

        let lighting = CodeChunk::new(
            base_color.ty(),
            format!("ComputeLighting({position}, {normal}, {base_color}, {metallic}, {roughness})"),
            false,
        );
        let lit = compiler.var(&lighting);
        if emissive.constant() && emissive == CodeChunk::from(Vec3::ZERO) {
            lit
        } else {
            &lit + &emissive
        }
    }
}

impl MaterialBlock for LitOutputBlock {
    fn type_name(&self) -> &'static str {
        "LitOutput"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        LIT_SOCKETS
    }

    fn compile(&self, _node: NodeId, _compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        CodeChunk::void()
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        self.settings.hash_into(hasher);
    }

    fn as_output(&self) -> Option<&dyn MaterialOutputBlock> {
        Some(self)
    }
}

impl MaterialOutputBlock for LitOutputBlock {
    fn compile_pixel_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates) {
        compile_surface_pixel(self, node, compiler, states);
    }

    fn compile_vertex_function(&self, node: NodeId, compiler: &mut StageCompiler<'_>, states: &mut MaterialRenderStates) {
        compile_vertex_offset(node, compiler, states);
    }
}
