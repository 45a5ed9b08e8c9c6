//! Error Types
//!
//! This module defines the error types used throughout the material compiler.
//!
//! # Overview
//!
//! The main error type [`MaterialError`] covers the failure modes that are
//! *not* recoverable authoring mistakes:
//! - Structural graph errors (duplicate parameter names, unknown sockets)
//! - Shader text assembly failures
//! - Shader backend failures and include resolution
//! - Compilation cache service misuse (unknown technique, shut down service)
//!
//! Authoring mistakes such as a missing texture or a vertex stream the mesh
//! format does not provide are never errors: the compiler substitutes a safe
//! default and logs a warning.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, MaterialError>`.
//!
//! ```rust,ignore
//! use matgraph::errors::{MaterialError, Result};
//!
//! fn build_graph() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the material compiler.
#[derive(Error, Debug)]
pub enum MaterialError {
    // ========================================================================
    // Graph Errors
    // ========================================================================
    /// Two parameter blocks in one graph share a name.
    #[error("Duplicate material parameter name: '{0}'")]
    DuplicateParameter(String),

    /// A parameter block was added without a name.
    #[error("Material parameter block has an empty name")]
    EmptyParameterName,

    /// The referenced block does not exist in the graph.
    #[error("Unknown block in material graph")]
    UnknownBlock,

    /// The block exists but has no socket with the given name and direction.
    #[error("Block '{block}' has no {direction} socket named '{socket}'")]
    UnknownSocket {
        /// Type name of the block
        block: &'static str,
        /// Requested socket name
        socket: String,
        /// "input" or "output"
        direction: &'static str,
    },

    /// The connection would make the graph cyclic.
    #[error("Connecting into block '{0}' would create a cycle")]
    CyclicConnection(&'static str),

    // ========================================================================
    // Code Generation Errors
    // ========================================================================
    /// Two multi-component operands with different arities were combined.
    #[error("Operand arity mismatch: {left} vs {right} components")]
    ArityMismatch {
        /// Components of the left operand
        left: u8,
        /// Components of the right operand
        right: u8,
    },

    /// Final shader text template failed to render.
    #[error("Shader template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    // ========================================================================
    // Backend & I/O Errors
    // ========================================================================
    /// An `#include` could not be resolved against any include root.
    #[error("Include file not found: '{0}'")]
    IncludeNotFound(String),

    /// The shader backend rejected the generated source.
    #[error("Shader backend failed for '{context}': {message}")]
    BackendError {
        /// Context name of the compiled material
        context: String,
        /// Backend diagnostic
        message: String,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to write a technique dump.
    #[error("Failed to write technique dump '{path}': {source}")]
    DumpError {
        /// Target dump file
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ========================================================================
    // Service Errors
    // ========================================================================
    /// The technique ID is not (or no longer) registered with the cache.
    #[error("Unknown or released material technique")]
    UnknownTechnique,

    /// The cache has been shut down and no longer accepts requests.
    #[error("Material technique cache is shut down")]
    ServiceShutDown,

    /// Background runtime creation or task failure.
    #[error("Task error: {0}")]
    TaskError(String),
}

/// Alias for `Result<T, MaterialError>`.
pub type Result<T> = std::result::Result<T, MaterialError>;
