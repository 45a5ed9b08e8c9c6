//! Shader expression model.
//!
//! - [`CodeChunk`]: immutable typed expression text with operators and swizzles
//! - [`ops`]: multi-operand intrinsics (`dot`, `mix`, texture sampling, ...)
//! - [`MaterialVertexDataType`]: semantic vertex data requested by blocks

pub mod chunk;
pub mod ops;
pub mod vertex_data;

pub use chunk::{CodeChunk, CodeChunkType};
pub use vertex_data::{MaterialVertexDataInfo, MaterialVertexDataType};
