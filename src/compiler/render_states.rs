//! Render state side channel of a compiled technique.

use bitflags::bitflags;

bitflags! {
    /// Fixed-function state the generated shader expects.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct MaterialRenderStates: u32 {
        const TWO_SIDED         = 1 << 0;
        const DEPTH_TEST        = 1 << 1;
        const DEPTH_WRITE       = 1 << 2;
        const ALPHA_BLEND       = 1 << 3;
        const ALPHA_TO_COVERAGE = 1 << 4;
        /// Depth test before the pixel shader; depth was laid down by a prepass.
        const EARLY_PIXEL_TESTS = 1 << 5;
        const HAS_VERTEX_OFFSET = 1 << 6;
    }
}

impl MaterialRenderStates {
    /// Opaque, depth-tested, depth-writing, back-face culled.
    #[must_use]
    pub const fn opaque() -> Self {
        Self::DEPTH_TEST.union(Self::DEPTH_WRITE)
    }

    /// Depth comparison the pixel stage header declares.
    #[must_use]
    pub fn depth_function(self) -> &'static str {
        if self.contains(Self::EARLY_PIXEL_TESTS) && !self.contains(Self::ALPHA_BLEND) {
            "Equal"
        } else {
            "LessEqual"
        }
    }

    #[must_use]
    pub fn cull_mode(self) -> &'static str {
        if self.contains(Self::TWO_SIDED) { "None" } else { "Back" }
    }
}
