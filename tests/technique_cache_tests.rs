//! Technique Cache Tests
//!
//! Tests for:
//! - Request lifecycle: Ready publication, failures keeping the previous shader
//! - Artifact reuse across techniques and joined in-flight compiles
//! - Superseded requests never publishing
//! - File dependency invalidation through sync()
//! - Unknown techniques and shutdown
//! - IncludeResolvingBackend: include expansion, cycles, missing files

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use glam::Vec4;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use matgraph::compiler::{MaterialCompilationSetup, MaterialPass, MeshVertexFormat, compile_technique};
use matgraph::config::{CacheConfig, CompilerConfig};
use matgraph::errors::{MaterialError, Result};
use matgraph::graph::MaterialGraph;
use matgraph::graph::blocks::{ConstColorBlock, UnlitOutputBlock};
use matgraph::service::{
    BackendOutput, BackendRequest, CompilationEvent, CompilationState, FileDependency, IncludeResolvingBackend,
    MaterialTechniqueCache, ShaderBackend,
};

const IDLE: Duration = Duration::from_secs(5);

// ============================================================================
// Helpers
// ============================================================================

/// Counts backend calls per context and reports configurable dependencies.
#[derive(Default)]
struct CountingBackend {
    calls: Mutex<FxHashMap<String, usize>>,
    dependencies: Mutex<FxHashMap<String, Vec<PathBuf>>>,
    fail: AtomicBool,
}

impl CountingBackend {
    fn calls(&self, context: &str) -> usize {
        self.calls.lock().get(context).copied().unwrap_or(0)
    }

    fn depend_on(&self, context: &str, path: &str) {
        self.dependencies
            .lock()
            .entry(context.to_owned())
            .or_default()
            .push(PathBuf::from(path));
    }
}

impl ShaderBackend for CountingBackend {
    fn compile(&self, request: &BackendRequest<'_>) -> Result<BackendOutput> {
        *self.calls.lock().entry(request.context_name.to_owned()).or_default() += 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(MaterialError::BackendError {
                context: request.context_name.to_owned(),
                message: "rejected".to_owned(),
            });
        }
        let dependencies = self
            .dependencies
            .lock()
            .get(request.context_name)
            .map(|paths| paths.iter().map(FileDependency::stat).collect())
            .unwrap_or_default();
        Ok(BackendOutput {
            binary: request.shader.source.as_bytes().to_vec(),
            dependencies,
        })
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cache_with(backend: &Arc<CountingBackend>) -> MaterialTechniqueCache {
    init_logger();
    MaterialTechniqueCache::with_backend(Arc::clone(backend) as Arc<dyn ShaderBackend>, CacheConfig::default()).unwrap()
}

fn forward() -> MaterialCompilationSetup {
    MaterialCompilationSetup::new(MaterialPass::Forward, MeshVertexFormat::Static)
}

fn color_graph(color: Vec4) -> Arc<MaterialGraph> {
    let mut graph = MaterialGraph::new();
    let c = graph.add_block(ConstColorBlock::new(color)).unwrap();
    let output = graph.add_block(UnlitOutputBlock::default()).unwrap();
    graph.connect(c, "RGB", output, "Color").unwrap();
    Arc::new(graph)
}

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matgraph-{label}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_file(root: &Path, relative: &str, text: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

// ============================================================================
// Request lifecycle
// ============================================================================

#[test]
fn compiled_technique_becomes_ready() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let events = cache.events();

    let technique = cache.create_technique(forward());
    let key = cache.request_compilation("white", color_graph(Vec4::ONE), technique).unwrap();

    assert!(cache.wait_idle(IDLE));
    assert_eq!(cache.entry_state(technique), Some(CompilationState::Ready));
    assert_eq!(cache.entry_key(technique), Some(key));

    let slot = cache.technique(technique).unwrap();
    let shader = slot.shader().unwrap();
    assert_eq!(shader.key, key);
    assert_eq!(shader.binary, shader.source.as_bytes());
    assert_eq!(slot.revision(), 1);

    assert_eq!(events.try_recv().unwrap(), CompilationEvent::Ready { technique, key });
    assert_eq!(backend.calls("white"), 1);
}

#[test]
fn failure_keeps_the_previous_shader() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let technique = cache.create_technique(forward());

    let good = cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap();
    assert!(cache.wait_idle(IDLE));

    backend.fail.store(true, Ordering::SeqCst);
    let bad = cache
        .request_compilation("mat", color_graph(Vec4::new(1.0, 0.0, 0.0, 1.0)), technique)
        .unwrap();
    assert!(cache.wait_idle(IDLE));

    assert_ne!(good, bad);
    assert!(matches!(cache.entry_state(technique), Some(CompilationState::Failed(message)) if message.contains("rejected")));
    let slot = cache.technique(technique).unwrap();
    assert_eq!(slot.shader().unwrap().key, good);
    assert_eq!(slot.revision(), 1);
}

#[test]
fn failure_event_carries_the_message() {
    let backend = Arc::new(CountingBackend::default());
    backend.fail.store(true, Ordering::SeqCst);
    let cache = cache_with(&backend);
    let events = cache.events();

    let technique = cache.create_technique(forward());
    cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap();
    assert!(cache.wait_idle(IDLE));

    match events.try_recv().unwrap() {
        CompilationEvent::Failed { technique: id, message, .. } => {
            assert_eq!(id, technique);
            assert!(message.contains("rejected"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!cache.technique(technique).unwrap().is_ready());
    assert_eq!(cache.artifact_count(), 0);
}

// ============================================================================
// Artifact reuse
// ============================================================================

#[test]
fn identical_requests_compile_once() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let graph = color_graph(Vec4::ONE);

    let first = cache.create_technique(forward());
    let second = cache.create_technique(forward());
    let a = cache.request_compilation("shared", Arc::clone(&graph), first).unwrap();
    let b = cache.request_compilation("shared", Arc::clone(&graph), second).unwrap();
    assert!(cache.wait_idle(IDLE));

    assert_eq!(a, b);
    assert_eq!(backend.calls("shared"), 1);
    assert_eq!(cache.entry_state(first), Some(CompilationState::Ready));
    assert_eq!(cache.entry_state(second), Some(CompilationState::Ready));

    let third = cache.create_technique(forward());
    cache.request_compilation("shared", graph, third).unwrap();
    assert_eq!(cache.entry_state(third), Some(CompilationState::Ready));
    assert_eq!(backend.calls("shared"), 1);
    assert_eq!(cache.artifact_count(), 1);
}

#[test]
fn different_setups_compile_separately() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let graph = color_graph(Vec4::ONE);

    let forward_id = cache.create_technique(forward());
    let depth_id = cache.create_technique(MaterialCompilationSetup::new(MaterialPass::DepthPrepass, MeshVertexFormat::Static));
    let a = cache.request_compilation("mat", Arc::clone(&graph), forward_id).unwrap();
    let b = cache.request_compilation("mat", graph, depth_id).unwrap();
    assert!(cache.wait_idle(IDLE));

    assert_ne!(a, b);
    assert_eq!(backend.calls("mat"), 2);
    assert_eq!(cache.artifact_count(), 2);
}

#[test]
fn latest_request_wins() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let technique = cache.create_technique(forward());

    cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap();
    let latest = cache.request_compilation("mat", color_graph(Vec4::ZERO), technique).unwrap();
    assert!(cache.wait_idle(IDLE));

    assert_eq!(cache.entry_key(technique), Some(latest));
    assert_eq!(cache.technique(technique).unwrap().shader().unwrap().key, latest);
}

// ============================================================================
// File invalidation
// ============================================================================

#[test]
fn changed_file_recompiles_only_its_dependents() {
    let backend = Arc::new(CountingBackend::default());
    backend.depend_on("t", "shaders/t.h");
    backend.depend_on("u", "shaders/u.h");
    let cache = cache_with(&backend);

    let t = cache.create_technique(forward());
    let u = cache.create_technique(forward());
    cache.request_compilation("t", color_graph(Vec4::ONE), t).unwrap();
    cache.request_compilation("u", color_graph(Vec4::ONE), u).unwrap();
    assert!(cache.wait_idle(IDLE));

    cache.notify_file_changed("shaders/t.h");
    cache.notify_file_changed("shaders/t.h");
    assert_eq!(cache.sync(), 1);
    assert!(cache.wait_idle(IDLE));

    assert_eq!(backend.calls("t"), 2);
    assert_eq!(backend.calls("u"), 1);
    assert_eq!(cache.entry_state(t), Some(CompilationState::Ready));
    assert_eq!(cache.technique(t).unwrap().revision(), 2);

    assert_eq!(cache.sync(), 0);
}

#[test]
fn techniques_sharing_a_key_recompile_once_after_a_change() {
    let backend = Arc::new(CountingBackend::default());
    backend.depend_on("shared", "shaders/shared.h");
    let cache = cache_with(&backend);

    let graph = color_graph(Vec4::ONE);
    let t = cache.create_technique(forward());
    let u = cache.create_technique(forward());
    cache.request_compilation("shared", Arc::clone(&graph), t).unwrap();
    assert!(cache.wait_idle(IDLE));
    cache.request_compilation("shared", graph, u).unwrap();
    assert!(cache.wait_idle(IDLE));
    assert_eq!(backend.calls("shared"), 1);

    cache.notify_file_changed("shaders/shared.h");
    assert_eq!(cache.sync(), 2);
    assert!(cache.wait_idle(IDLE));

    assert_eq!(backend.calls("shared"), 2);
    assert_eq!(cache.artifact_count(), 1);
    for technique in [t, u] {
        assert_eq!(cache.entry_state(technique), Some(CompilationState::Ready));
        assert_eq!(cache.technique(technique).unwrap().revision(), 2);
    }
}

#[test]
fn untracked_file_changes_do_nothing() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);
    let t = cache.create_technique(forward());
    cache.request_compilation("t", color_graph(Vec4::ONE), t).unwrap();
    assert!(cache.wait_idle(IDLE));

    cache.notify_file_removed("unrelated.h");
    assert_eq!(cache.sync(), 0);
    assert_eq!(backend.calls("t"), 1);
}

#[test]
fn added_file_retries_failed_techniques() {
    let backend = Arc::new(CountingBackend::default());
    backend.fail.store(true, Ordering::SeqCst);
    let cache = cache_with(&backend);

    let t = cache.create_technique(forward());
    cache.request_compilation("t", color_graph(Vec4::ONE), t).unwrap();
    assert!(cache.wait_idle(IDLE));
    assert!(matches!(cache.entry_state(t), Some(CompilationState::Failed(_))));

    backend.fail.store(false, Ordering::SeqCst);
    cache.notify_file_added("shaders/new.h");
    assert_eq!(cache.sync(), 1);
    assert!(cache.wait_idle(IDLE));

    assert_eq!(cache.entry_state(t), Some(CompilationState::Ready));
    assert!(cache.technique(t).unwrap().is_ready());
}

// ============================================================================
// Techniques and shutdown
// ============================================================================

#[test]
fn released_technique_is_unknown() {
    let backend = Arc::new(CountingBackend::default());
    let cache = cache_with(&backend);

    let technique = cache.create_technique(forward());
    assert_eq!(cache.technique_count(), 1);
    assert!(cache.release_technique(technique));
    assert!(!cache.release_technique(technique));

    let err = cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap_err();
    assert!(matches!(err, MaterialError::UnknownTechnique));
    assert!(cache.entry_state(technique).is_none());
}

#[test]
fn shutdown_rejects_requests_and_clears_shaders() {
    let backend = Arc::new(CountingBackend::default());
    let mut cache = cache_with(&backend);

    let technique = cache.create_technique(forward());
    cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap();
    cache.shutdown();

    assert_eq!(cache.active_jobs(), 0);
    assert!(cache.technique(technique).unwrap().shader().is_none());
    assert_eq!(cache.artifact_count(), 0);

    let err = cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap_err();
    assert!(matches!(err, MaterialError::ServiceShutDown));
    assert_eq!(cache.sync(), 0);

    cache.shutdown();
}

// ============================================================================
// IncludeResolvingBackend
// ============================================================================

fn write_material_headers(root: &Path) {
    write_file(root, "material/material.h", "#include <material/common.h>\nfloat MaterialHeader;\n");
    write_file(root, "material/common.h", "#include <material/material.h>\nfloat CommonHeader;\n");
    write_file(root, "material/vertex_standard.h", "#include <material/common.h>\nfloat VertexHeader;\n");
}

#[test]
fn include_backend_inlines_each_header_once() -> anyhow::Result<()> {
    let root = temp_dir("includes");
    write_material_headers(&root);

    let backend = IncludeResolvingBackend::new([&root]);
    let graph = color_graph(Vec4::ONE);
    let shader = compile_technique("mat", &graph, &forward(), &CompilerConfig::default())?;
    let output = backend.compile(&BackendRequest {
        context_name: "mat",
        shader: &shader,
    })?;

    let text = String::from_utf8(output.binary)?;
    assert!(text.starts_with("#define "));
    assert!(text.contains("#define MAT_VERTEX_STATIC 1"));
    assert_eq!(text.matches("float MaterialHeader;").count(), 1);
    assert_eq!(text.matches("float CommonHeader;").count(), 1);
    assert_eq!(text.matches("float VertexHeader;").count(), 1);
    assert!(!text.contains("#include"));
    assert_eq!(output.dependencies.len(), 3);
    assert!(output.dependencies.iter().all(|d| d.modified.is_some()));

    std::fs::remove_dir_all(&root).ok();
    Ok(())
}

#[test]
fn include_backend_reports_missing_headers() {
    let root = temp_dir("missing");
    let backend = IncludeResolvingBackend::new([&root]);
    let shader = compile_technique("mat", &color_graph(Vec4::ONE), &forward(), &CompilerConfig::default()).unwrap();

    let err = backend
        .compile(&BackendRequest {
            context_name: "mat",
            shader: &shader,
        })
        .unwrap_err();
    assert!(matches!(err, MaterialError::IncludeNotFound(path) if path == "material/material.h"));

    std::fs::remove_dir_all(&root).ok();
}

#[test]
fn editing_an_included_header_recompiles() {
    init_logger();
    let root = temp_dir("cache");
    write_material_headers(&root);

    let cache = MaterialTechniqueCache::new(IncludeResolvingBackend::new([&root]), CacheConfig::default()).unwrap();
    let technique = cache.create_technique(forward());
    cache.request_compilation("mat", color_graph(Vec4::ONE), technique).unwrap();
    assert!(cache.wait_idle(IDLE));
    assert_eq!(cache.entry_state(technique), Some(CompilationState::Ready));

    let common = write_file(&root, "material/common.h", "#include <material/material.h>\nfloat EditedHeader;\n");
    cache.notify_file_changed(&common);
    assert_eq!(cache.sync(), 1);
    assert!(cache.wait_idle(IDLE));

    let shader = cache.technique(technique).unwrap().shader().unwrap();
    let text = String::from_utf8_lossy(&shader.binary);
    assert!(text.contains("float EditedHeader;"));
    assert_eq!(cache.technique(technique).unwrap().revision(), 2);

    std::fs::remove_dir_all(&root).ok();
}
