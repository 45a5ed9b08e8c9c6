//! Shader Macro Definitions
//!
//! Preprocessor defines handed to the shader backend next to the generated
//! source. They describe the permutation being compiled (pass, vertex
//! format, feature flags) so that shared include files can specialize.
//!
//! # Usage
//!
//! ```rust,ignore
//! use matgraph::compiler::ShaderDefines;
//!
//! let mut defines = ShaderDefines::new();
//! defines.set("MAT_PASS_FORWARD", "1");
//! defines.set("MAT_VERTEX_NUM_BONES", "4");
//!
//! let hash = defines.compute_hash();
//! ```

use xxhash_rust::xxh3::Xxh3;

/// An ordered set of `NAME=value` defines.
///
/// Entries are kept sorted by name so that identical sets produce identical
/// hashes and identical iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderDefines {
    defines: Vec<(String, String)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { defines: Vec::new() }
    }

    /// Sets a define, replacing the value of an existing one.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.defines.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
            Ok(idx) => value.clone_into(&mut self.defines[idx].1),
            Err(idx) => self.defines.insert(idx, (key.to_owned(), value.to_owned())),
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if let Ok(idx) = self.defines.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
            self.defines.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.defines
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.defines[idx].1.as_str())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stable 64-bit hash of the whole set.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for (k, v) in &self.defines {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\n");
        }
        hasher.digest()
    }
}
