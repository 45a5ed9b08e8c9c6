//! Code Chunk Tests
//!
//! Tests for:
//! - CodeChunk literals: float formatting, vector literals, constant flags
//! - Swizzles: named swizzles, composition, invalid masks
//! - conform: broadcast/pad/truncate policy, idempotence
//! - Binary operators: scalar promotion, arity mismatch, constant folding flag
//! - Intrinsics: dot, lerp, clamp, texture sampling

use glam::{Vec2, Vec3, Vec4};

use matgraph::code::{CodeChunk, CodeChunkType, ops};
use matgraph::errors::MaterialError;

fn float_ref(name: &str) -> CodeChunk {
    CodeChunk::reference(CodeChunkType::Numerical1, name)
}

fn vec_ref(components: u8, name: &str) -> CodeChunk {
    CodeChunk::reference(CodeChunkType::for_components(components), name)
}

// ============================================================================
// Literals
// ============================================================================

#[test]
fn vector_literals_are_constant() {
    let c = CodeChunk::from(Vec3::new(1.0, 0.5, 0.0));
    assert_eq!(c.text(), "vec3(1, 0.5, 0)");
    assert_eq!(c.ty(), CodeChunkType::Numerical3);
    assert!(c.constant());
}

#[test]
fn references_are_not_constant() {
    let c = vec_ref(2, "VertexUV0");
    assert!(!c.constant());
    assert_eq!(c.components(), 2);
}

#[test]
fn zero_has_requested_arity() {
    assert_eq!(CodeChunk::zero(1).text(), "0");
    assert_eq!(CodeChunk::zero(3).text(), "vec3(0, 0, 0)");
}

#[test]
fn void_chunk_has_no_components() {
    let v = CodeChunk::void();
    assert!(v.is_void());
    assert_eq!(v.components(), 0);
    assert!(v.conform(3).is_void());
}

// ============================================================================
// Swizzles
// ============================================================================

#[test]
fn swizzle_of_swizzle_reads_the_same_component() {
    let c = vec_ref(4, "c");
    assert_eq!(c.xyz().x(), c.x());
    assert_eq!(c.xyz().xy().y(), c.y());
}

#[test]
fn named_swizzles_set_result_arity() {
    let c = vec_ref(4, "c");
    assert_eq!(c.xy().ty(), CodeChunkType::Numerical2);
    assert_eq!(c.zw().text(), "(c).zw");
    assert_eq!(c.w().ty(), CodeChunkType::Numerical1);
}

#[test]
fn swizzle_beyond_arity_is_void() {
    let c = vec_ref(3, "c");
    assert!(c.w().is_void());
    assert!(c.zw().is_void());
}

#[test]
fn swizzle_keeps_constant_flag() {
    let c = CodeChunk::from(Vec4::ONE);
    assert!(c.xyz().constant());
    assert_eq!(c.xyz().text(), "(vec4(1, 1, 1, 1)).xyz");
}

// ============================================================================
// conform
// ============================================================================

#[test]
fn conform_broadcasts_scalars() {
    let x = float_ref("x");
    assert_eq!(x.conform(2).text(), "(x).xx");
    assert_eq!(x.conform(3).text(), "(x).xxx");
    assert_eq!(x.conform(4).text(), "(x).xxxx");
}

#[test]
fn conform_pads_vectors() {
    let uv = vec_ref(2, "uv");
    assert_eq!(uv.conform(3).text(), "(uv).xy0");
    assert_eq!(uv.conform(4).text(), "(uv).xy01");

    let p = vec_ref(3, "p");
    assert_eq!(p.conform(4).text(), "(p).xyz1");
}

#[test]
fn conform_truncates_wider_values() {
    let c = vec_ref(4, "c");
    assert_eq!(c.conform(3).text(), "(c).xyz");
    assert_eq!(c.conform(2).text(), "(c).xy");
    assert_eq!(c.conform(1).text(), "(c).x");
}

#[test]
fn conform_is_idempotent() {
    for components in 1..=4 {
        let c = vec_ref(components, "c");
        for target in 1..=4 {
            let once = c.conform(target);
            assert_eq!(once.conform(target), once);
            assert_eq!(once.components(), target);
        }
    }
}

#[test]
fn conform_to_same_arity_is_unchanged() {
    let n = vec_ref(3, "n");
    assert_eq!(n.conform(3), n);
}

#[test]
fn conform_rejects_resources() {
    let t = CodeChunk::reference(CodeChunkType::TextureResource, "BaseMap");
    assert!(t.conform(4).is_void());
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn scalar_operand_promotes_to_vector_type() {
    let v = vec_ref(3, "v");
    let sum = &v + 1.0;
    assert_eq!(sum.text(), "(v + 1)");
    assert_eq!(sum.ty(), CodeChunkType::Numerical3);

    let product = 2.0 * &v;
    assert_eq!(product.ty(), CodeChunkType::Numerical3);
}

#[test]
fn constant_operands_give_constant_result() {
    let sum = CodeChunk::from(2.0) + CodeChunk::from(3.0);
    assert_eq!(sum.text(), "(2 + 3)");
    assert!(sum.constant());

    let mixed = CodeChunk::from(2.0) + float_ref("t");
    assert!(!mixed.constant());
}

#[test]
fn mismatched_arity_uses_the_wider_type() {
    let a = vec_ref(2, "a");
    let b = vec_ref(4, "b");
    assert_eq!((&a + &b).ty(), CodeChunkType::Numerical4);
}

#[test]
fn checked_operator_rejects_mismatched_arity() {
    let a = vec_ref(2, "a");
    let b = vec_ref(3, "b");
    let err = a.try_binary_op("*", &b).unwrap_err();
    assert!(matches!(err, MaterialError::ArityMismatch { left: 2, right: 3 }));
    assert!(a.try_binary_op("*", &float_ref("s")).is_ok());
}

#[test]
fn operators_on_void_are_void() {
    let sum = CodeChunk::void() + CodeChunk::from(1.0);
    assert!(sum.is_void());
}

#[test]
fn comparison_is_parenthesized() {
    let test = float_ref("mask").less(&CodeChunk::from(0.5));
    assert_eq!(test.text(), "(mask < 0.5)");
}

#[test]
fn negation_and_remainder() {
    let v = vec_ref(2, "v");
    assert_eq!((-&v).text(), "(-v)");
    assert_eq!((&v % 2.0).text(), "(v % 2)");
}

// ============================================================================
// Intrinsics
// ============================================================================

#[test]
fn dot_is_scalar() {
    let a = vec_ref(3, "a");
    let b = vec_ref(3, "b");
    let d = ops::dot(&a, &b);
    assert_eq!(d.text(), "dot(a, b)");
    assert_eq!(d.ty(), CodeChunkType::Numerical1);
}

#[test]
fn lerp_emits_mix() {
    let a = vec_ref(3, "a");
    let b = vec_ref(3, "b");
    let m = ops::lerp(&a, &b, &float_ref("t"));
    assert_eq!(m.text(), "mix(a, b, t)");
    assert_eq!(m.ty(), CodeChunkType::Numerical3);
}

#[test]
fn length_and_normalize_types() {
    let v = vec_ref(3, "v");
    assert_eq!(v.length().ty(), CodeChunkType::Numerical1);
    assert_eq!(v.normalize().ty(), CodeChunkType::Numerical3);
    assert_eq!(v.frac().text(), "fract(v)");
}

#[test]
fn texture_sample_is_vec4_and_not_constant() {
    let t = CodeChunk::reference(CodeChunkType::TextureResource, "BaseMap");
    let uv = CodeChunk::from(Vec2::new(0.5, 0.5));
    let s = ops::tex2d(&t, &uv);
    assert_eq!(s.text(), "texture(BaseMap, vec2(0.5, 0.5))");
    assert_eq!(s.ty(), CodeChunkType::Numerical4);
    assert!(!s.constant());
}

#[test]
fn texture_sample_requires_texture() {
    let not_a_texture = float_ref("x");
    assert!(ops::tex2d(&not_a_texture, &vec_ref(2, "uv")).is_void());
}

#[test]
fn make_vector_counts_components() {
    let rgb = vec_ref(3, "rgb");
    let v = ops::make_vector(&[&rgb, &CodeChunk::from(1.0)]);
    assert_eq!(v.text(), "vec4(rgb, 1)");
    assert_eq!(v.ty(), CodeChunkType::Numerical4);
    assert!(ops::make_vector(&[&rgb, &rgb]).is_void());
}
