//! Live technique slots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use slotmap::new_key_type;

use crate::compiler::{CompilationKey, MaterialCompilationSetup, MaterialRenderStates, ShaderDefines};

use super::backend::FileDependency;

new_key_type! {
    /// Handle of a technique registered with the cache.
    pub struct TechniqueId;
}

/// A successfully compiled technique, shared between every technique slot
/// whose request hashed to the same key.
#[derive(Debug)]
pub struct CompiledShader {
    pub key: CompilationKey,
    pub setup: MaterialCompilationSetup,
    pub render_states: MaterialRenderStates,
    pub defines: ShaderDefines,
    /// Generated text, before the backend ran.
    pub source: String,
    pub binary: Vec<u8>,
    pub dependencies: Vec<FileDependency>,
}

/// One (material, setup) slot the renderer binds.
///
/// The slot holds the last successfully compiled shader. Publishing swaps
/// the `Arc` under a short write lock, so readers see either the previous or
/// the new shader, never a partial one.
#[derive(Debug)]
pub struct MaterialTechnique {
    setup: MaterialCompilationSetup,
    live: RwLock<Option<Arc<CompiledShader>>>,
    revision: AtomicU64,
}

impl MaterialTechnique {
    #[must_use]
    pub fn new(setup: MaterialCompilationSetup) -> Self {
        Self {
            setup,
            live: RwLock::new(None),
            revision: AtomicU64::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn setup(&self) -> MaterialCompilationSetup {
        self.setup
    }

    /// Current shader, `None` until the first successful compile.
    #[must_use]
    pub fn shader(&self) -> Option<Arc<CompiledShader>> {
        self.live.read().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.live.read().is_some()
    }

    /// Number of shaders published so far.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Installs `shader`, returning the one it replaces.
    pub(crate) fn publish(&self, shader: Arc<CompiledShader>) -> Option<Arc<CompiledShader>> {
        let previous = self.live.write().replace(shader);
        self.revision.fetch_add(1, Ordering::AcqRel);
        previous
    }

    pub(crate) fn clear(&self) {
        self.live.write().take();
    }
}
