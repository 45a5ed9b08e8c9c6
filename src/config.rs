//! Compiler & Cache Configuration
//!
//! Engine-wide tunables are passed explicitly to the compiler and the
//! technique cache, so that compiling a graph is a pure function of
//! (graph, setup, config) and can be cached and tested in isolation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use matgraph::config::{CacheConfig, CompilerConfig};
//!
//! // Defaults: 0.5 mask threshold, no dumps, two worker threads
//! let config = CacheConfig::default();
//!
//! // Dump every generated technique for inspection
//! let config = CacheConfig {
//!     compiler: CompilerConfig {
//!         dump_directory: Some("target/material_dumps".into()),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! // Or load from JSON; missing fields keep their defaults
//! let config = CacheConfig::from_json_str(r#"{ "worker_threads": 4 }"#)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

// ---------------------------------------------------------------------------
// CompilerConfig
// ---------------------------------------------------------------------------

/// Tunables read while generating shader text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Alpha-test threshold used by output blocks that do not author their
    /// own. Pixels whose mask value falls below it are discarded.
    pub default_mask_threshold: f32,

    /// Emit `// <Block>.<Output>` comments before each materialized value.
    pub emit_debug_comments: bool,

    /// When set, every generated technique is written to this directory
    /// before it is handed to the backend.
    pub dump_directory: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_mask_threshold: 0.5,
            emit_debug_comments: false,
            dump_directory: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CacheConfig
// ---------------------------------------------------------------------------

/// Configuration of the background technique cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Worker threads of the background compilation runtime.
    pub worker_threads: usize,

    /// First polling interval while waiting for in-flight jobs at shutdown.
    pub shutdown_poll_min_ms: u64,

    /// Upper bound the polling interval backs off to.
    pub shutdown_poll_max_ms: u64,

    /// Completion events buffered for subscribers; older events are dropped
    /// once the buffer is full.
    pub event_capacity: usize,

    /// Code generation settings forwarded to every compile job.
    pub compiler: CompilerConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            shutdown_poll_min_ms: 1,
            shutdown_poll_max_ms: 50,
            event_capacity: 256,
            compiler: CompilerConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Parses a JSON document; absent fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    #[must_use]
    pub fn shutdown_backoff(&self) -> (Duration, Duration) {
        let min = Duration::from_millis(self.shutdown_poll_min_ms.max(1));
        let max = Duration::from_millis(self.shutdown_poll_max_ms).max(min);
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_keep_defaults() {
        let config = CacheConfig::from_json_str(r#"{ "worker_threads": 4, "compiler": { "default_mask_threshold": 0.25 } }"#).unwrap();
        assert_eq!(config.worker_threads, 4);
        assert_eq!(config.shutdown_poll_max_ms, 50);
        assert!((config.compiler.default_mask_threshold - 0.25).abs() < f32::EPSILON);
        assert!(config.compiler.dump_directory.is_none());
    }

    #[test]
    fn backoff_is_ordered() {
        let config = CacheConfig { shutdown_poll_min_ms: 20, shutdown_poll_max_ms: 5, ..Default::default() };
        let (min, max) = config.shutdown_backoff();
        assert!(min <= max);
    }
}
