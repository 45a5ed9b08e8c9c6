//! Block socket declarations.

/// Direction of a socket relative to its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketDirection {
    Input,
    Output,
}

impl SocketDirection {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Static description of one named port on a block.
///
/// Output sockets may declare a swizzle: such a socket exposes a view of the
/// block's primary output (`Out.xy`, `RGBA.a`) and shares its compiled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketInfo {
    pub name: &'static str,
    pub direction: SocketDirection,
    pub swizzle: Option<&'static str>,
    /// Not shown in the editor unless connected.
    pub hidden: bool,
    /// Semantic hint for editor tooling (`"color"`, `"uv"`, ...).
    pub tag: Option<&'static str>,
}

impl SocketInfo {
    #[must_use]
    pub const fn input(name: &'static str) -> Self {
        Self {
            name,
            direction: SocketDirection::Input,
            swizzle: None,
            hidden: false,
            tag: None,
        }
    }

    #[must_use]
    pub const fn output(name: &'static str) -> Self {
        Self {
            name,
            direction: SocketDirection::Output,
            swizzle: None,
            hidden: false,
            tag: None,
        }
    }

    /// Output socket reading `mask` of the primary output.
    #[must_use]
    pub const fn swizzled(name: &'static str, mask: &'static str) -> Self {
        Self {
            swizzle: Some(mask),
            hidden: true,
            ..Self::output(name)
        }
    }

    #[must_use]
    pub const fn tagged(self, tag: &'static str) -> Self {
        Self { tag: Some(tag), ..self }
    }

    #[must_use]
    pub const fn hidden(self) -> Self {
        Self { hidden: true, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self.direction, SocketDirection::Input)
    }
}
