//! Shader backend seam.
//!
//! The cache hands every generated technique to a [`ShaderBackend`], which
//! turns shader text into whatever the renderer consumes and reports the
//! files the result depends on. [`IncludeResolvingBackend`] is the reference
//! implementation: it expands `#include <...>` directives from a list of
//! include roots and returns the expanded text as the binary.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::SystemTime;

use rustc_hash::FxHashSet;

use crate::compiler::GeneratedShader;
use crate::errors::{MaterialError, Result};

/// One compile request handed to a backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendRequest<'a> {
    pub context_name: &'a str,
    pub shader: &'a GeneratedShader,
}

/// A file the compiled artifact was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileDependency {
    pub path: PathBuf,
    /// Modification time when the file was read, if the platform reports one.
    pub modified: Option<SystemTime>,
}

impl FileDependency {
    /// Records `path` with its current modification time.
    #[must_use]
    pub fn stat(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self { path, modified }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOutput {
    pub binary: Vec<u8>,
    pub dependencies: Vec<FileDependency>,
}

/// Compiles generated shader text. Called from background workers.
pub trait ShaderBackend: Send + Sync + 'static {
    fn compile(&self, request: &BackendRequest<'_>) -> Result<BackendOutput>;
}

// ─── Include resolution ──────────────────────────────────────────────────────

/// Expands includes against `include_roots`, searched in order.
///
/// Each file is expanded once per compile; repeated includes are dropped.
/// The output starts with one `#define` line per compile define.
#[derive(Debug, Clone, Default)]
pub struct IncludeResolvingBackend {
    include_roots: Vec<PathBuf>,
}

impl IncludeResolvingBackend {
    #[must_use]
    pub fn new(include_roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            include_roots: include_roots.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn include_roots(&self) -> &[PathBuf] {
        &self.include_roots
    }

    /// First root containing `include`.
    pub fn resolve(&self, include: &str) -> Result<PathBuf> {
        self.include_roots
            .iter()
            .map(|root| root.join(include))
            .find(|path| path.is_file())
            .ok_or_else(|| MaterialError::IncludeNotFound(include.to_owned()))
    }

    fn expand(
        &self,
        source: &str,
        out: &mut String,
        visited: &mut FxHashSet<PathBuf>,
        dependencies: &mut Vec<FileDependency>,
    ) -> Result<()> {
        for line in source.lines() {
            let Some(include) = parse_include(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };

            let path = self.resolve(include)?;
            if !visited.insert(path.clone()) {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            dependencies.push(FileDependency::stat(&path));
            self.expand(&text, out, visited, dependencies)?;
        }
        Ok(())
    }
}

/// Path of a `#include <path>` line.
fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?.trim_start();
    rest.strip_prefix('<')?.strip_suffix('>').map(str::trim)
}

impl ShaderBackend for IncludeResolvingBackend {
    fn compile(&self, request: &BackendRequest<'_>) -> Result<BackendOutput> {
        let mut text = String::with_capacity(request.shader.source.len() * 2);
        for (name, value) in request.shader.defines.iter() {
            let _ = writeln!(text, "#define {name} {value}");
        }

        let mut visited = FxHashSet::default();
        let mut dependencies = Vec::new();
        self.expand(&request.shader.source, &mut text, &mut visited, &mut dependencies)?;

        log::debug!(
            "Resolved {} include(s) for '{}'",
            dependencies.len(),
            request.context_name
        );
        Ok(BackendOutput {
            binary: text.into_bytes(),
            dependencies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_lines_are_recognized() {
        assert_eq!(parse_include("#include <material/material.h>"), Some("material/material.h"));
        assert_eq!(parse_include("   #include   < a.h >"), Some("a.h"));
        assert_eq!(parse_include("#include \"a.h\""), None);
        assert_eq!(parse_include("// #include <a.h>"), None);
    }

    #[test]
    fn missing_include_is_reported() {
        let backend = IncludeResolvingBackend::new(Vec::<PathBuf>::new());
        assert!(matches!(backend.resolve("nope.h"), Err(MaterialError::IncludeNotFound(p)) if p == "nope.h"));
    }
}
