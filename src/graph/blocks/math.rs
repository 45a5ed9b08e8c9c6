//! Arithmetic and intrinsic blocks.
//!
//! Operands are conformed to a common component count before the operator
//! is applied, so `vec3 + float` reads as `vec3 + float.xxx`.

use crate::code::{CodeChunk, ops};
use crate::compiler::stage::StageCompiler;
use crate::graph::block::{ContentHasher, MaterialBlock};
use crate::graph::container::NodeId;
use crate::graph::socket::SocketInfo;

fn common_arity(values: &[&CodeChunk]) -> u8 {
    values.iter().map(|v| v.components()).max().unwrap_or(1).max(1)
}

// ============================================================================
// Unary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Saturate,
    Floor,
    Ceil,
    Frac,
    Round,
    Sign,
    Sqrt,
    Log,
    Log2,
    Exp,
    Exp2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    OneMinus,
    Negate,
    Normalize,
    Length,
}

impl UnaryOp {
    fn apply(self, x: &CodeChunk) -> CodeChunk {
        match self {
            Self::Abs => x.abs(),
            Self::Saturate => x.saturate(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Frac => x.frac(),
            Self::Round => x.round(),
            Self::Sign => x.sign(),
            Self::Sqrt => x.sqrt(),
            Self::Log => x.log(),
            Self::Log2 => x.log2(),
            Self::Exp => x.exp(),
            Self::Exp2 => x.exp2(),
            Self::Sin => ops::sin(x),
            Self::Cos => ops::cos(x),
            Self::Tan => ops::tan(x),
            Self::Asin => ops::asin(x),
            Self::Acos => ops::acos(x),
            Self::Atan => ops::atan(x),
            Self::OneMinus => 1.0 - x,
            Self::Negate => -x,
            Self::Normalize => x.normalize(),
            Self::Length => x.length(),
        }
    }
}

const UNARY_SOCKETS: &[SocketInfo] = &[SocketInfo::input("X"), SocketInfo::output("Out")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnaryMathBlock {
    pub op: UnaryOp,
}

impl UnaryMathBlock {
    #[must_use]
    pub fn new(op: UnaryOp) -> Self {
        Self { op }
    }
}

impl MaterialBlock for UnaryMathBlock {
    fn type_name(&self) -> &'static str {
        "UnaryMath"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        UNARY_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let x = compiler.eval_input(node, "X", 0.0);
        self.op.apply(&x)
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&format!("{:?}", self.op));
    }
}

// ============================================================================
// Binary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Min,
    Max,
    Pow,
    Step,
}

impl BinaryOp {
    /// Value of an unconnected operand.
    fn identity(self) -> (f32, f32) {
        match self {
            Self::Multiply | Self::Divide | Self::Pow => (1.0, 1.0),
            _ => (0.0, 0.0),
        }
    }

    fn apply(self, a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Modulo => a % b,
            Self::Min => ops::min(a, b),
            Self::Max => ops::max(a, b),
            Self::Pow => a.pow(b),
            Self::Step => ops::step(a, b),
        }
    }
}

const BINARY_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("A"),
    SocketInfo::input("B"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryMathBlock {
    pub op: BinaryOp,
}

impl BinaryMathBlock {
    #[must_use]
    pub fn new(op: BinaryOp) -> Self {
        Self { op }
    }

    #[must_use]
    pub fn add() -> Self {
        Self::new(BinaryOp::Add)
    }

    #[must_use]
    pub fn multiply() -> Self {
        Self::new(BinaryOp::Multiply)
    }
}

impl MaterialBlock for BinaryMathBlock {
    fn type_name(&self) -> &'static str {
        "BinaryMath"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        BINARY_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let (default_a, default_b) = self.op.identity();
        let a = compiler.eval_input(node, "A", default_a);
        let b = compiler.eval_input(node, "B", default_b);
        let n = common_arity(&[&a, &b]);
        self.op.apply(&a.conform(n), &b.conform(n))
    }

    fn hash_content(&self, hasher: &mut ContentHasher) {
        hasher.write_str(&format!("{:?}", self.op));
    }
}

// ============================================================================
// Intrinsics
// ============================================================================

const CLAMP_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("X"),
    SocketInfo::input("Min"),
    SocketInfo::input("Max"),
    SocketInfo::output("Out"),
];

/// `clamp(x, min, max)`; bounds follow the arity of `X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClampBlock;

impl MaterialBlock for ClampBlock {
    fn type_name(&self) -> &'static str {
        "Clamp"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        CLAMP_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let x = compiler.eval_input(node, "X", 0.0);
        let low = compiler.eval_input(node, "Min", 0.0);
        let high = compiler.eval_input(node, "Max", 1.0);
        let n = x.components();
        ops::clamp(&x, &low.conform(n), &high.conform(n))
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const LERP_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("A"),
    SocketInfo::input("B"),
    SocketInfo::input("Alpha"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LerpBlock;

impl MaterialBlock for LerpBlock {
    fn type_name(&self) -> &'static str {
        "Lerp"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        LERP_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let a = compiler.eval_input(node, "A", 0.0);
        let b = compiler.eval_input(node, "B", 1.0);
        let alpha = compiler.eval_input(node, "Alpha", 0.5);
        let n = common_arity(&[&a, &b]);
        ops::lerp(&a.conform(n), &b.conform(n), &alpha.conform(1))
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const PAIR_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("A"),
    SocketInfo::input("B"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DotBlock;

impl MaterialBlock for DotBlock {
    fn type_name(&self) -> &'static str {
        "Dot"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        PAIR_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let a = compiler.eval_input(node, "A", 0.0);
        let b = compiler.eval_input(node, "B", 0.0);
        let n = common_arity(&[&a, &b]);
        ops::dot(&a.conform(n), &b.conform(n))
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrossBlock;

impl MaterialBlock for CrossBlock {
    fn type_name(&self) -> &'static str {
        "Cross"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        PAIR_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let a = compiler.eval_input(node, "A", glam::Vec3::X);
        let b = compiler.eval_input(node, "B", glam::Vec3::Y);
        ops::cross(&a, &b)
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const REFLECT_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("Vector"),
    SocketInfo::input("Normal"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReflectBlock;

impl MaterialBlock for ReflectBlock {
    fn type_name(&self) -> &'static str {
        "Reflect"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        REFLECT_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let v = compiler.eval_input(node, "Vector", glam::Vec3::ZERO);
        let n = compiler.eval_input(node, "Normal", glam::Vec3::Z);
        ops::reflect(&v.conform(3), &n.conform(3))
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const ATAN2_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("Y"),
    SocketInfo::input("X"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Atan2Block;

impl MaterialBlock for Atan2Block {
    fn type_name(&self) -> &'static str {
        "Atan2"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        ATAN2_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let y = compiler.eval_input(node, "Y", 0.0);
        let x = compiler.eval_input(node, "X", 1.0);
        let n = common_arity(&[&y, &x]);
        ops::atan2(&y.conform(n), &x.conform(n))
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const SMOOTHSTEP_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("Min"),
    SocketInfo::input("Max"),
    SocketInfo::input("X"),
    SocketInfo::output("Out"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmoothStepBlock;

impl MaterialBlock for SmoothStepBlock {
    fn type_name(&self) -> &'static str {
        "SmoothStep"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        SMOOTHSTEP_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, _output: &str) -> CodeChunk {
        let x = compiler.eval_input(node, "X", 0.0);
        let low = compiler.eval_input(node, "Min", 0.0);
        let high = compiler.eval_input(node, "Max", 1.0);
        let n = x.components();
        ops::smoothstep(&low.conform(n), &high.conform(n), &x)
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}

const DERIVATIVE_SOCKETS: &[SocketInfo] = &[
    SocketInfo::input("X"),
    SocketInfo::output("dF/dx"),
    SocketInfo::output("dF/dy"),
];

/// Screen-space partial derivatives. Only meaningful in the pixel stage;
/// the vertex stage gets zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivativeBlock;

impl MaterialBlock for DerivativeBlock {
    fn type_name(&self) -> &'static str {
        "Derivative"
    }

    fn sockets(&self) -> &'static [SocketInfo] {
        DERIVATIVE_SOCKETS
    }

    fn compile(&self, node: NodeId, compiler: &mut StageCompiler<'_>, output: &str) -> CodeChunk {
        let x = compiler.eval_input(node, "X", 0.0);
        if compiler.stage() == crate::compiler::stage::ShaderStage::Vertex {
            return CodeChunk::zero(x.components());
        }
        match output {
            "dF/dy" => x.ddy(),
            _ => x.ddx(),
        }
    }

    fn hash_content(&self, _hasher: &mut ContentHasher) {}
}
