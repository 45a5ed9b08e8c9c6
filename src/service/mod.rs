//! Compilation cache service.
//!
//! - [`MaterialTechniqueCache`]: background compilation, artifact reuse and
//!   file invalidation
//! - [`MaterialTechnique`]: the live shader slot a renderer binds
//! - [`ShaderBackend`]: the seam to the platform shader compiler

pub mod backend;
pub mod cache;
pub mod dependencies;
pub mod technique;

pub use backend::{BackendOutput, BackendRequest, FileDependency, IncludeResolvingBackend, ShaderBackend};
pub use cache::{CompilationEvent, CompilationState, MaterialTechniqueCache};
pub use dependencies::{FileChange, FileDependencyTracker, PendingChanges};
pub use technique::{CompiledShader, MaterialTechnique, TechniqueId};
