//! Concrete material blocks.
//!
//! | Module | Blocks |
//! |--------|--------|
//! | [`constant`] | `ConstFloat`, `ConstVector`, `ConstColor` |
//! | [`parameter`] | `Parameter` |
//! | [`math`] | `UnaryMath`, `BinaryMath`, `Clamp`, `Lerp`, `Dot`, `Cross`, `Reflect`, `Atan2`, `SmoothStep`, `Derivative` |
//! | [`vector`] | `MakeVector`, `SplitVector` |
//! | [`attribute`] | `VertexData`, `TexCoord`, `Global` |
//! | [`sampler`] | `TextureSample` |
//! | [`output`] | `UnlitOutput`, `LitOutput` |

pub mod attribute;
pub mod constant;
pub mod math;
pub mod output;
pub mod parameter;
pub mod sampler;
pub mod vector;

pub use attribute::{GlobalBlock, GlobalValue, TexCoordBlock, VertexDataBlock};
pub use constant::{ConstColorBlock, ConstFloatBlock, ConstVectorBlock};
pub use math::{
    Atan2Block, BinaryMathBlock, BinaryOp, ClampBlock, CrossBlock, DerivativeBlock, DotBlock, LerpBlock,
    ReflectBlock, SmoothStepBlock, UnaryMathBlock, UnaryOp,
};
pub use output::{BlendMode, LitOutputBlock, OutputSettings, UnlitOutputBlock};
pub use parameter::{ParameterBlock, ParameterValue};
pub use sampler::TextureSampleBlock;
pub use vector::{MakeVectorBlock, SplitVectorBlock};
