//! Typed Shader Expressions
//!
//! [`CodeChunk`] is the value every material block produces: a fragment of
//! shader expression text together with its semantic type and a constant
//! flag. Chunks are immutable; every operator returns a new chunk.
//!
//! # Arity
//!
//! Numeric chunks carry 1 to 4 components. Binary operators follow the
//! shading-language broadcast rule: a single-component operand promotes to
//! the arity of the other side, and the result has
//! `max(components(a), components(b))` components. Two multi-component
//! operands of different arity are *not* rejected by the operators (blocks
//! are expected to [`conform`](CodeChunk::conform) first); the mismatch is
//! logged, and [`CodeChunk::try_binary_op`] is available for callers that
//! want a hard error instead.
//!
//! # Swizzles
//!
//! Swizzle masks use the letters `x y z w` plus the literal components `0`
//! and `1` understood by the engine's shading dialect (`v.xy0`). Swizzling a
//! swizzle composes the masks, so `c.xyz().x()` and `c.x()` produce the same
//! text.

use std::fmt;
use std::hash::{Hash, Hasher};

use glam::{Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::errors::{MaterialError, Result};

/// Semantic type of a [`CodeChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodeChunkType {
    /// No value (failed or absent expression).
    #[default]
    Void,
    /// A bound texture object.
    TextureResource,
    /// A bound buffer object.
    BufferResource,
    Numerical1,
    Numerical2,
    Numerical3,
    Numerical4,
    /// 4x4 matrix.
    Matrix,
}

impl CodeChunkType {
    /// Number of numeric components, 0 for non-vector types.
    #[inline]
    #[must_use]
    pub const fn components(self) -> u8 {
        match self {
            Self::Numerical1 => 1,
            Self::Numerical2 => 2,
            Self::Numerical3 => 3,
            Self::Numerical4 => 4,
            _ => 0,
        }
    }

    /// Numeric type with `count` components, `Void` outside 1..=4.
    #[inline]
    #[must_use]
    pub const fn for_components(count: u8) -> Self {
        match count {
            1 => Self::Numerical1,
            2 => Self::Numerical2,
            3 => Self::Numerical3,
            4 => Self::Numerical4,
            _ => Self::Void,
        }
    }

    /// Float type name used for local declarations.
    #[must_use]
    pub const fn float_type_name(self) -> Option<&'static str> {
        match self {
            Self::Numerical1 => Some("float"),
            Self::Numerical2 => Some("vec2"),
            Self::Numerical3 => Some("vec3"),
            Self::Numerical4 => Some("vec4"),
            Self::Matrix => Some("mat4"),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.components() != 0
    }
}

/// An immutable, typed fragment of shader expression text.
///
/// Equality and hashing are structural over (text, type, constant flag).
#[derive(Debug, Clone, Default)]
pub struct CodeChunk {
    text: String,
    ty: CodeChunkType,
    constant: bool,
    /// Byte offset of the mask when the text has the form `(inner).mask`.
    swizzle_mask_at: Option<usize>,
}

impl PartialEq for CodeChunk {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.constant == other.constant && self.text == other.text
    }
}

impl Eq for CodeChunk {}

impl Hash for CodeChunk {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
        self.ty.hash(state);
        self.constant.hash(state);
    }
}

impl fmt::Display for CodeChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn mask_component(c: char) -> Option<u8> {
    match c {
        'x' => Some(0),
        'y' => Some(1),
        'z' => Some(2),
        'w' => Some(3),
        _ => None,
    }
}

/// Formats a float the way literals appear in generated code (`2`, `0.5`).
///
/// NaN and infinities have no literal form and are written as `0`.
#[must_use]
pub fn format_float(value: f32) -> String {
    if !value.is_finite() {
        log::warn!("Non-finite constant {value} replaced by 0");
        return "0".to_owned();
    }
    format!("{value}")
}

impl CodeChunk {
    /// Creates a chunk from raw expression text.
    #[must_use]
    pub fn new(ty: CodeChunkType, text: impl Into<String>, constant: bool) -> Self {
        Self {
            text: text.into(),
            ty,
            constant,
            swizzle_mask_at: None,
        }
    }

    /// A non-constant reference to a named value (local, interpolant, global).
    #[must_use]
    pub fn reference(ty: CodeChunkType, name: impl Into<String>) -> Self {
        Self::new(ty, name, false)
    }

    /// The void chunk.
    #[inline]
    #[must_use]
    pub fn void() -> Self {
        Self::default()
    }

    /// Constant `vecN(...)` literal from 2 to 4 components.
    #[must_use]
    pub fn vector(values: &[f32]) -> Self {
        match values {
            [v] => Self::from(*v),
            [_, _] | [_, _, _] | [_, _, _, _] => {
                let body = values.iter().map(|v| format_float(*v)).collect::<Vec<_>>().join(", ");
                Self::new(
                    CodeChunkType::for_components(values.len() as u8),
                    format!("vec{}({body})", values.len()),
                    true,
                )
            }
            _ => {
                log::warn!("Cannot build a vector literal with {} components", values.len());
                Self::void()
            }
        }
    }

    /// Zero literal of the given component count.
    #[must_use]
    pub fn zero(components: u8) -> Self {
        Self::vector(&[0.0; 4][..usize::from(components.clamp(1, 4))])
    }

    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    #[must_use]
    pub fn ty(&self) -> CodeChunkType {
        self.ty
    }

    #[inline]
    #[must_use]
    pub fn constant(&self) -> bool {
        self.constant
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> u8 {
        self.ty.components()
    }

    #[inline]
    #[must_use]
    pub fn is_void(&self) -> bool {
        self.ty == CodeChunkType::Void
    }

    // ─── Swizzles ────────────────────────────────────────────────────────────

    /// Swizzles with a mask, deriving the input count from the highest
    /// component letter the mask addresses.
    #[must_use]
    pub fn swizzle(&self, mask: &str) -> Self {
        let in_count = mask.chars().filter_map(mask_component).max().map_or(0, |i| i + 1);
        self.swizzle_with(in_count, mask.len() as u8, mask)
    }

    /// Swizzles with an explicit `(in_count, out_count, mask)` triple.
    ///
    /// The mask must be `out_count` characters long and must not address a
    /// component beyond both `in_count` and the chunk's own arity.
    #[must_use]
    pub fn swizzle_with(&self, in_count: u8, out_count: u8, mask: &str) -> Self {
        let valid_chars = mask.chars().all(|c| mask_component(c).is_some() || c == '0' || c == '1');
        let addressed = mask.chars().filter_map(mask_component).max().map_or(0, |i| i + 1);
        if !self.ty.is_numeric()
            || !valid_chars
            || mask.len() != usize::from(out_count)
            || !(1..=4).contains(&out_count)
            || addressed > in_count
            || in_count > self.components()
        {
            log::warn!(
                "Invalid swizzle '{mask}' ({in_count} -> {out_count}) on '{}' with {} components",
                self.text,
                self.components()
            );
            return Self::void();
        }

        let (inner, mask) = match self.swizzle_mask_at {
            Some(at) => {
                let inner = &self.text[1..at - 2];
                let previous = self.text[at..].as_bytes();
                let composed: String = mask
                    .chars()
                    .map(|c| mask_component(c).map_or(c, |i| char::from(previous[usize::from(i)])))
                    .collect();
                (inner, composed)
            }
            None => (self.text.as_str(), mask.to_owned()),
        };

        // Only padded components selected: nothing left to read.
        if !mask.chars().any(|c| mask_component(c).is_some()) {
            let values: SmallVec<[f32; 4]> = mask.chars().map(|c| if c == '1' { 1.0 } else { 0.0 }).collect();
            return Self::vector(&values);
        }

        let text = format!("({inner}).{mask}");
        let mask_at = text.len() - mask.len();
        Self {
            text,
            ty: CodeChunkType::for_components(out_count),
            constant: self.constant,
            swizzle_mask_at: Some(mask_at),
        }
    }

    #[must_use]
    pub fn x(&self) -> Self {
        self.swizzle_with(1, 1, "x")
    }

    #[must_use]
    pub fn y(&self) -> Self {
        self.swizzle_with(2, 1, "y")
    }

    #[must_use]
    pub fn z(&self) -> Self {
        self.swizzle_with(3, 1, "z")
    }

    #[must_use]
    pub fn w(&self) -> Self {
        self.swizzle_with(4, 1, "w")
    }

    #[must_use]
    pub fn xy(&self) -> Self {
        self.swizzle_with(2, 2, "xy")
    }

    #[must_use]
    pub fn zw(&self) -> Self {
        self.swizzle_with(4, 2, "zw")
    }

    #[must_use]
    pub fn xyz(&self) -> Self {
        self.swizzle_with(3, 3, "xyz")
    }

    /// Broadcasts or truncates to `count` components.
    ///
    /// Same arity returns the chunk unchanged; widening repeats a scalar or
    /// pads a vector with `0` (and `1` for the fourth component of a
    /// position-like `xyz1`).
    #[must_use]
    pub fn conform(&self, count: u8) -> Self {
        let current = self.components();
        if current == 0 {
            log::warn!("Cannot conform non-numeric expression '{}' to {count} components", self.text);
            return Self::void();
        }

        if current == count {
            return self.clone();
        }

        match (count, current) {
            (1, _) => self.swizzle_with(1, 1, "x"),
            (2, 1) => self.swizzle_with(1, 2, "xx"),
            (2, _) => self.swizzle_with(2, 2, "xy"),
            (3, 1) => self.swizzle_with(1, 3, "xxx"),
            (3, 2) => self.swizzle_with(2, 3, "xy0"),
            (3, _) => self.swizzle_with(3, 3, "xyz"),
            (4, 1) => self.swizzle_with(1, 4, "xxxx"),
            (4, 2) => self.swizzle_with(2, 4, "xy01"),
            (4, _) => self.swizzle_with(3, 4, "xyz1"),
            _ => {
                log::warn!("Cannot conform '{}' to {count} components", self.text);
                Self::void()
            }
        }
    }

    // ─── Binary operators ────────────────────────────────────────────────────

    /// Result type of combining `self` with `other`.
    fn binary_result_type(&self, other: &Self) -> CodeChunkType {
        let (a, b) = (self.components(), other.components());
        if a == 0 || b == 0 {
            return CodeChunkType::Void;
        }
        if b == 1 {
            return self.ty;
        }
        if a == 1 {
            return other.ty;
        }
        if a != b {
            log::warn!("Combining expressions with {a} and {b} components: '{self}' and '{other}'");
        }
        CodeChunkType::for_components(a.max(b))
    }

    /// `(self op other)` with broadcast typing.
    #[must_use]
    pub fn binary_op(&self, op: &str, other: &Self) -> Self {
        let ty = self.binary_result_type(other);
        if ty == CodeChunkType::Void {
            log::warn!("Operator '{op}' applied to non-numeric operands '{self}' and '{other}'");
            return Self::void();
        }
        Self::new(ty, format!("({self} {op} {other})"), self.constant && other.constant)
    }

    /// Like [`binary_op`](Self::binary_op) but rejects two multi-component
    /// operands of different arity.
    pub fn try_binary_op(&self, op: &str, other: &Self) -> Result<Self> {
        let (a, b) = (self.components(), other.components());
        if a > 1 && b > 1 && a != b {
            return Err(MaterialError::ArityMismatch { left: a, right: b });
        }
        Ok(self.binary_op(op, other))
    }

    #[must_use]
    pub fn less(&self, other: &Self) -> Self {
        self.binary_op("<", other)
    }

    #[must_use]
    pub fn less_equal(&self, other: &Self) -> Self {
        self.binary_op("<=", other)
    }

    #[must_use]
    pub fn greater(&self, other: &Self) -> Self {
        self.binary_op(">", other)
    }

    #[must_use]
    pub fn greater_equal(&self, other: &Self) -> Self {
        self.binary_op(">=", other)
    }

    #[must_use]
    pub fn equal(&self, other: &Self) -> Self {
        self.binary_op("==", other)
    }

    #[must_use]
    pub fn not_equal(&self, other: &Self) -> Self {
        self.binary_op("!=", other)
    }

    // ─── Intrinsics ──────────────────────────────────────────────────────────

    /// `name(self)` with the given result type.
    #[must_use]
    pub fn call(&self, name: &str, ty: CodeChunkType) -> Self {
        if !self.ty.is_numeric() {
            log::warn!("Intrinsic '{name}' applied to non-numeric expression '{self}'");
            return Self::void();
        }
        Self::new(ty, format!("{name}({self})"), self.constant)
    }

    fn preserving(&self, name: &str) -> Self {
        self.call(name, self.ty)
    }

    #[must_use]
    pub fn saturate(&self) -> Self {
        self.preserving("saturate")
    }

    #[must_use]
    pub fn abs(&self) -> Self {
        self.preserving("abs")
    }

    #[must_use]
    pub fn length(&self) -> Self {
        self.call("length", CodeChunkType::Numerical1)
    }

    #[must_use]
    pub fn normalize(&self) -> Self {
        self.preserving("normalize")
    }

    #[must_use]
    pub fn sqrt(&self) -> Self {
        self.preserving("sqrt")
    }

    #[must_use]
    pub fn log(&self) -> Self {
        self.preserving("log")
    }

    #[must_use]
    pub fn log2(&self) -> Self {
        self.preserving("log2")
    }

    #[must_use]
    pub fn exp(&self) -> Self {
        self.preserving("exp")
    }

    #[must_use]
    pub fn exp2(&self) -> Self {
        self.preserving("exp2")
    }

    #[must_use]
    pub fn floor(&self) -> Self {
        self.preserving("floor")
    }

    #[must_use]
    pub fn round(&self) -> Self {
        self.preserving("round")
    }

    #[must_use]
    pub fn ceil(&self) -> Self {
        self.preserving("ceil")
    }

    #[must_use]
    pub fn frac(&self) -> Self {
        self.preserving("fract")
    }

    #[must_use]
    pub fn sign(&self) -> Self {
        self.preserving("sign")
    }

    #[must_use]
    pub fn ddx(&self) -> Self {
        self.preserving("dFdx")
    }

    #[must_use]
    pub fn ddy(&self) -> Self {
        self.preserving("dFdy")
    }

    /// `pow(self, exponent)`; a scalar exponent is broadcast.
    #[must_use]
    pub fn pow(&self, exponent: &Self) -> Self {
        let exponent = exponent.conform(self.components());
        if exponent.is_void() || !self.ty.is_numeric() {
            return Self::void();
        }
        Self::new(self.ty, format!("pow({self}, {exponent})"), self.constant && exponent.constant)
    }

    /// Component or row access `self[index]`.
    #[must_use]
    pub fn index(&self, index: u32) -> Self {
        let ty = match self.ty {
            CodeChunkType::Matrix => CodeChunkType::Numerical4,
            t if t.components() > 1 => CodeChunkType::Numerical1,
            _ => {
                log::warn!("Cannot index expression '{self}'");
                return Self::void();
            }
        };
        Self::new(ty, format!("{self}[{index}]"), self.constant)
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<f32> for CodeChunk {
    fn from(value: f32) -> Self {
        Self::new(CodeChunkType::Numerical1, format_float(value), true)
    }
}

impl From<Vec2> for CodeChunk {
    fn from(value: Vec2) -> Self {
        Self::vector(&value.to_array())
    }
}

impl From<Vec3> for CodeChunk {
    fn from(value: Vec3) -> Self {
        Self::vector(&value.to_array())
    }
}

impl From<Vec4> for CodeChunk {
    fn from(value: Vec4) -> Self {
        Self::vector(&value.to_array())
    }
}

// ─── Operator overloads ──────────────────────────────────────────────────────

macro_rules! impl_binary_operator {
    ($trait:ident, $method:ident, $op:literal) => {
        impl std::ops::$trait<&CodeChunk> for &CodeChunk {
            type Output = CodeChunk;
            fn $method(self, rhs: &CodeChunk) -> CodeChunk {
                self.binary_op($op, rhs)
            }
        }

        impl std::ops::$trait<CodeChunk> for CodeChunk {
            type Output = CodeChunk;
            fn $method(self, rhs: CodeChunk) -> CodeChunk {
                self.binary_op($op, &rhs)
            }
        }

        impl std::ops::$trait<&CodeChunk> for CodeChunk {
            type Output = CodeChunk;
            fn $method(self, rhs: &CodeChunk) -> CodeChunk {
                self.binary_op($op, rhs)
            }
        }

        impl std::ops::$trait<f32> for &CodeChunk {
            type Output = CodeChunk;
            fn $method(self, rhs: f32) -> CodeChunk {
                self.binary_op($op, &CodeChunk::from(rhs))
            }
        }

        impl std::ops::$trait<f32> for CodeChunk {
            type Output = CodeChunk;
            fn $method(self, rhs: f32) -> CodeChunk {
                self.binary_op($op, &CodeChunk::from(rhs))
            }
        }

        impl std::ops::$trait<&CodeChunk> for f32 {
            type Output = CodeChunk;
            fn $method(self, rhs: &CodeChunk) -> CodeChunk {
                CodeChunk::from(self).binary_op($op, rhs)
            }
        }

        impl std::ops::$trait<CodeChunk> for f32 {
            type Output = CodeChunk;
            fn $method(self, rhs: CodeChunk) -> CodeChunk {
                CodeChunk::from(self).binary_op($op, &rhs)
            }
        }
    };
}

impl_binary_operator!(Add, add, "+");
impl_binary_operator!(Sub, sub, "-");
impl_binary_operator!(Mul, mul, "*");
impl_binary_operator!(Div, div, "/");
impl_binary_operator!(Rem, rem, "%");

impl std::ops::Neg for &CodeChunk {
    type Output = CodeChunk;
    fn neg(self) -> CodeChunk {
        if !self.ty.is_numeric() {
            return CodeChunk::void();
        }
        CodeChunk::new(self.ty, format!("(-{self})"), self.constant)
    }
}

impl std::ops::Neg for CodeChunk {
    type Output = CodeChunk;
    fn neg(self) -> CodeChunk {
        -&self
    }
}
