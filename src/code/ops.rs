//! Free-function intrinsics over [`CodeChunk`]s.
//!
//! These cover the multi-operand shading functions that do not read well as
//! methods. Operands are expected to be conformed by the caller; a mismatch
//! yields a void chunk and a warning rather than malformed text.

use super::chunk::{CodeChunk, CodeChunkType};

fn all_numeric(name: &str, operands: &[&CodeChunk]) -> bool {
    let ok = operands.iter().all(|c| c.ty().is_numeric());
    if !ok {
        log::warn!("Intrinsic '{name}' requires numeric operands");
    }
    ok
}

fn same_arity(name: &str, operands: &[&CodeChunk]) -> bool {
    let first = operands.first().map_or(0, |c| c.components());
    let ok = operands.iter().all(|c| c.components() == first);
    if !ok {
        log::warn!("Intrinsic '{name}' requires operands with the same number of components");
    }
    ok
}

fn constant(operands: &[&CodeChunk]) -> bool {
    operands.iter().all(|c| c.constant())
}

fn call(name: &str, ty: CodeChunkType, operands: &[&CodeChunk]) -> CodeChunk {
    let args = operands.iter().map(|c| c.text()).collect::<Vec<_>>().join(", ");
    CodeChunk::new(ty, format!("{name}({args})"), constant(operands))
}

fn elementwise(name: &str, operands: &[&CodeChunk]) -> CodeChunk {
    if !all_numeric(name, operands) || !same_arity(name, operands) {
        return CodeChunk::void();
    }
    call(name, operands[0].ty(), operands)
}

// ─── Reductions ──────────────────────────────────────────────────────────────

#[must_use]
pub fn all(a: &CodeChunk) -> CodeChunk {
    a.call("all", CodeChunkType::Numerical1)
}

#[must_use]
pub fn any(a: &CodeChunk) -> CodeChunk {
    a.call("any", CodeChunkType::Numerical1)
}

/// Dot product; always scalar.
#[must_use]
pub fn dot(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    if !all_numeric("dot", &[a, b]) || !same_arity("dot", &[a, b]) {
        return CodeChunk::void();
    }
    call("dot", CodeChunkType::Numerical1, &[a, b])
}

/// Cross product of the `xyz` parts.
#[must_use]
pub fn cross(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    let (a, b) = (a.conform(3), b.conform(3));
    if a.is_void() || b.is_void() {
        return CodeChunk::void();
    }
    call("cross", CodeChunkType::Numerical3, &[&a, &b])
}

// ─── Elementwise ─────────────────────────────────────────────────────────────

#[must_use]
pub fn min(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    elementwise("min", &[a, b])
}

#[must_use]
pub fn max(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    elementwise("max", &[a, b])
}

#[must_use]
pub fn clamp(x: &CodeChunk, low: &CodeChunk, high: &CodeChunk) -> CodeChunk {
    elementwise("clamp", &[x, low, high])
}

/// `mix(x, y, s)`; `s` may be scalar.
#[must_use]
pub fn lerp(x: &CodeChunk, y: &CodeChunk, s: &CodeChunk) -> CodeChunk {
    if !all_numeric("mix", &[x, y, s]) || !same_arity("mix", &[x, y]) {
        return CodeChunk::void();
    }
    if s.components() != 1 && s.components() != x.components() {
        log::warn!("Interpolation factor '{s}' must be scalar or match the operands");
        return CodeChunk::void();
    }
    call("mix", x.ty(), &[x, y, s])
}

#[must_use]
pub fn step(edge: &CodeChunk, x: &CodeChunk) -> CodeChunk {
    elementwise("step", &[edge, x])
}

#[must_use]
pub fn smoothstep(low: &CodeChunk, high: &CodeChunk, x: &CodeChunk) -> CodeChunk {
    elementwise("smoothstep", &[low, high, x])
}

/// Fused `a * b + c`.
#[must_use]
pub fn mad(a: &CodeChunk, b: &CodeChunk, c: &CodeChunk) -> CodeChunk {
    elementwise("fma", &[a, b, c])
}

#[must_use]
pub fn trunc(a: &CodeChunk) -> CodeChunk {
    a.call("trunc", a.ty())
}

// ─── Trigonometry ────────────────────────────────────────────────────────────

#[must_use]
pub fn sin(a: &CodeChunk) -> CodeChunk {
    a.call("sin", a.ty())
}

#[must_use]
pub fn cos(a: &CodeChunk) -> CodeChunk {
    a.call("cos", a.ty())
}

#[must_use]
pub fn tan(a: &CodeChunk) -> CodeChunk {
    a.call("tan", a.ty())
}

#[must_use]
pub fn asin(a: &CodeChunk) -> CodeChunk {
    a.call("asin", a.ty())
}

#[must_use]
pub fn acos(a: &CodeChunk) -> CodeChunk {
    a.call("acos", a.ty())
}

#[must_use]
pub fn atan(a: &CodeChunk) -> CodeChunk {
    a.call("atan", a.ty())
}

/// Two-argument arctangent.
#[must_use]
pub fn atan2(y: &CodeChunk, x: &CodeChunk) -> CodeChunk {
    elementwise("atan", &[y, x])
}

/// `v - 2 * dot(v, n) * n` over three components.
#[must_use]
pub fn reflect(v: &CodeChunk, n: &CodeChunk) -> CodeChunk {
    let (v, n) = (v.conform(3), n.conform(3));
    if v.is_void() || n.is_void() {
        return CodeChunk::void();
    }
    &v - &(2.0 * dot(&v, &n) * &n)
}

// ─── Constructors ────────────────────────────────────────────────────────────

/// `vecN(a, b, ...)` where the operand components add up to N.
#[must_use]
pub fn make_vector(parts: &[&CodeChunk]) -> CodeChunk {
    let total: u8 = parts.iter().map(|c| c.components()).sum();
    if parts.iter().any(|c| c.components() == 0) || !(2..=4).contains(&total) {
        log::warn!("Cannot construct a vector from {} operands totalling {total} components", parts.len());
        return CodeChunk::void();
    }
    call(&format!("vec{total}"), CodeChunkType::for_components(total), parts)
}

#[must_use]
pub fn float2(a: &CodeChunk, b: &CodeChunk) -> CodeChunk {
    make_vector(&[a, b])
}

#[must_use]
pub fn float3(a: &CodeChunk, b: &CodeChunk, c: &CodeChunk) -> CodeChunk {
    make_vector(&[a, b, c])
}

#[must_use]
pub fn float4(a: &CodeChunk, b: &CodeChunk, c: &CodeChunk, d: &CodeChunk) -> CodeChunk {
    make_vector(&[a, b, c, d])
}

// ─── Texture sampling ────────────────────────────────────────────────────────

fn sample(name: &str, texture: &CodeChunk, uv: &CodeChunk, extra: Option<&CodeChunk>) -> CodeChunk {
    if texture.ty() != CodeChunkType::TextureResource {
        log::warn!("Sampling '{texture}' which is not a texture resource");
        return CodeChunk::void();
    }
    let uv = uv.conform(2);
    let args = match extra {
        Some(extra) => format!("{texture}, {uv}, {}", extra.conform(1)),
        None => format!("{texture}, {uv}"),
    };
    CodeChunk::new(CodeChunkType::Numerical4, format!("{name}({args})"), false)
}

#[must_use]
pub fn tex2d(texture: &CodeChunk, uv: &CodeChunk) -> CodeChunk {
    sample("texture", texture, uv, None)
}

/// Sample with a mip bias.
#[must_use]
pub fn tex2d_bias(texture: &CodeChunk, uv: &CodeChunk, bias: &CodeChunk) -> CodeChunk {
    sample("texture", texture, uv, Some(bias))
}

#[must_use]
pub fn tex2d_lod(texture: &CodeChunk, uv: &CodeChunk, lod: &CodeChunk) -> CodeChunk {
    sample("textureLod", texture, uv, Some(lod))
}
