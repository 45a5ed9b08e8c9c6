//! Material Technique Cache
//!
//! Background compilation service. Callers register techniques (one per
//! material and [`MaterialCompilationSetup`]), request compilation of a graph
//! into them and keep rendering with whatever shader each technique holds
//! while new ones compile.
//!
//! # Lifecycle of a request
//!
//! ```text
//! request_compilation ─► Requested ─► Compiling ─┬─► Ready   (shader swapped in)
//!                                                └─► Failed  (previous shader kept)
//! ```
//!
//! - Requests never block on compilation. A request whose key was compiled
//!   before is served from the artifact cache; a request whose key is
//!   already compiling joins that job.
//! - Re-requesting a technique supersedes its earlier request: a stale job
//!   may still finish, but never publishes into the technique.
//! - File notifications only mark paths; [`MaterialTechniqueCache::sync`]
//!   recompiles each dependent technique once.
//! - [`MaterialTechniqueCache::shutdown`] (also run on drop) stops new work,
//!   waits for running jobs and releases every entry.
//!
//! # Locking
//!
//! Entry, artifact, in-flight and dependency tables each sit behind their
//! own `parking_lot::Mutex`. No lock is held while a job compiles or while
//! the backend runs. When two are needed, `in_flight` is taken before
//! `artifacts`.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;
use tokio::runtime::Runtime;

use crate::compiler::{CompilationKey, MaterialCompilationSetup, compile_technique};
use crate::config::CacheConfig;
use crate::errors::{MaterialError, Result};
use crate::graph::MaterialGraph;

use super::backend::{BackendRequest, ShaderBackend};
use super::dependencies::{FileChange, FileDependencyTracker};
use super::technique::{CompiledShader, MaterialTechnique, TechniqueId};

/// Compilation state of a technique's latest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationState {
    Requested,
    Compiling,
    Ready,
    /// The latest request failed; the technique keeps its previous shader.
    Failed(String),
}

/// Broadcast when a request completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilationEvent {
    Ready {
        technique: TechniqueId,
        key: CompilationKey,
    },
    Failed {
        technique: TechniqueId,
        key: CompilationKey,
        message: String,
    },
}

struct CacheEntry {
    context_name: String,
    graph: Arc<MaterialGraph>,
    key: CompilationKey,
    state: CompilationState,
    /// Bumped on every request; results for older generations are dropped.
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Waiter {
    technique: TechniqueId,
    generation: u64,
}

struct InFlight {
    job: u64,
    waiters: SmallVec<[Waiter; 2]>,
}

/// Decrements the active job count when a job ends, including by panic.
struct JobGuard(Arc<CacheInner>);

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.0.active_jobs.fetch_sub(1, Ordering::AcqRel);
    }
}

struct CacheInner {
    backend: Arc<dyn ShaderBackend>,
    config: CacheConfig,

    techniques: RwLock<SlotMap<TechniqueId, Arc<MaterialTechnique>>>,
    entries: Mutex<FxHashMap<TechniqueId, CacheEntry>>,
    artifacts: Mutex<FxHashMap<CompilationKey, Arc<CompiledShader>>>,
    in_flight: Mutex<FxHashMap<CompilationKey, InFlight>>,
    dependencies: Mutex<FileDependencyTracker>,
    sync_guard: Mutex<()>,

    next_job: AtomicU64,
    active_jobs: AtomicUsize,
    shut_down: AtomicBool,

    events_tx: flume::Sender<CompilationEvent>,
    events_rx: flume::Receiver<CompilationEvent>,
}

pub struct MaterialTechniqueCache {
    inner: Arc<CacheInner>,
    runtime: Option<Runtime>,
}

impl MaterialTechniqueCache {
    pub fn new(backend: impl ShaderBackend, config: CacheConfig) -> Result<Self> {
        Self::with_backend(Arc::new(backend), config)
    }

    pub fn with_backend(backend: Arc<dyn ShaderBackend>, config: CacheConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .max_blocking_threads(config.worker_threads.max(1))
            .thread_name("matgraph-compile")
            .build()
            .map_err(|e| MaterialError::TaskError(format!("Failed to create compilation runtime: {e}")))?;

        let (events_tx, events_rx) = flume::bounded(config.event_capacity.max(1));
        let inner = CacheInner {
            backend,
            config,
            techniques: RwLock::new(SlotMap::with_key()),
            entries: Mutex::new(FxHashMap::default()),
            artifacts: Mutex::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashMap::default()),
            dependencies: Mutex::new(FileDependencyTracker::new()),
            sync_guard: Mutex::new(()),
            next_job: AtomicU64::new(1),
            active_jobs: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            events_tx,
            events_rx,
        };

        Ok(Self {
            inner: Arc::new(inner),
            runtime: Some(runtime),
        })
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // ========================================================================
    // Techniques
    // ========================================================================

    /// Registers an empty technique slot for `setup`.
    pub fn create_technique(&self, setup: MaterialCompilationSetup) -> TechniqueId {
        self.inner
            .techniques
            .write()
            .insert(Arc::new(MaterialTechnique::new(setup)))
    }

    #[must_use]
    pub fn technique(&self, id: TechniqueId) -> Option<Arc<MaterialTechnique>> {
        self.inner.techniques.read().get(id).cloned()
    }

    /// Unregisters a technique. Jobs still running for it finish without
    /// publishing.
    pub fn release_technique(&self, id: TechniqueId) -> bool {
        let removed = self.inner.techniques.write().remove(id);
        self.inner.entries.lock().remove(&id);
        self.inner.dependencies.lock().remove(id);
        removed.is_some()
    }

    #[must_use]
    pub fn technique_count(&self) -> usize {
        self.inner.techniques.read().len()
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Schedules compilation of `graph` into `technique`. Never blocks on
    /// the compile itself.
    pub fn request_compilation(
        &self,
        context_name: &str,
        graph: Arc<MaterialGraph>,
        technique: TechniqueId,
    ) -> Result<CompilationKey> {
        self.request(context_name, graph, technique, |_| false)
    }

    /// `force` decides, given the request's key, whether to start a fresh
    /// job instead of reusing an artifact or joining a running compile.
    fn request(
        &self,
        context_name: &str,
        graph: Arc<MaterialGraph>,
        technique: TechniqueId,
        force: impl FnOnce(&CompilationKey) -> bool,
    ) -> Result<CompilationKey> {
        let inner = &self.inner;
        if inner.shut_down.load(Ordering::Acquire) {
            return Err(MaterialError::ServiceShutDown);
        }
        let Some(slot) = self.technique(technique) else {
            return Err(MaterialError::UnknownTechnique);
        };

        let setup = slot.setup();
        let key = CompilationKey::compute(context_name, &graph, &setup);
        let force = force(&key);

        let generation = {
            let mut entries = inner.entries.lock();
            let generation = entries.get(&technique).map_or(1, |e| e.generation + 1);
            entries.insert(
                technique,
                CacheEntry {
                    context_name: context_name.to_owned(),
                    graph: Arc::clone(&graph),
                    key,
                    state: CompilationState::Requested,
                    generation,
                },
            );
            generation
        };
        let waiter = Waiter { technique, generation };

        let job = {
            let mut in_flight = inner.in_flight.lock();
            if !force {
                let cached = inner.artifacts.lock().get(&key).cloned();
                if let Some(shader) = cached {
                    drop(in_flight);
                    log::debug!("Technique '{context_name}' ({setup}) served from cache");
                    inner.complete_waiter(waiter, &Ok(shader));
                    return Ok(key);
                }
                if let Some(running) = in_flight.get_mut(&key) {
                    log::debug!("Technique '{context_name}' ({setup}) joined a running compile");
                    running.waiters.push(waiter);
                    return Ok(key);
                }
            }

            let job = inner.next_job.fetch_add(1, Ordering::Relaxed);
            let mut waiters = in_flight.remove(&key).map(|f| f.waiters).unwrap_or_default();
            waiters.push(waiter);
            in_flight.insert(key, InFlight { job, waiters });
            job
        };

        self.spawn_job(job, key, context_name.to_owned(), graph, setup)?;
        Ok(key)
    }

    fn spawn_job(
        &self,
        job: u64,
        key: CompilationKey,
        context_name: String,
        graph: Arc<MaterialGraph>,
        setup: MaterialCompilationSetup,
    ) -> Result<()> {
        let Some(runtime) = &self.runtime else {
            return Err(MaterialError::ServiceShutDown);
        };

        let inner = Arc::clone(&self.inner);
        inner.active_jobs.fetch_add(1, Ordering::AcqRel);
        let guard = JobGuard(Arc::clone(&inner));

        runtime.spawn(async move {
            let worker = Arc::clone(&inner);
            let task = tokio::task::spawn_blocking(move || {
                let _guard = guard;
                worker.run_job(job, key, &context_name, &graph, &setup);
            });
            if let Err(e) = task.await {
                log::error!("Compile job {job} did not finish: {e}");
                inner.finish(job, key, &Err(MaterialError::TaskError(e.to_string())));
            }
        });
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// State of the latest request for `technique`.
    #[must_use]
    pub fn entry_state(&self, technique: TechniqueId) -> Option<CompilationState> {
        self.inner.entries.lock().get(&technique).map(|e| e.state.clone())
    }

    /// Key of the latest request for `technique`.
    #[must_use]
    pub fn entry_key(&self, technique: TechniqueId) -> Option<CompilationKey> {
        self.inner.entries.lock().get(&technique).map(|e| e.key)
    }

    /// Receiver of completion events. Receivers compete for events.
    #[must_use]
    pub fn events(&self) -> flume::Receiver<CompilationEvent> {
        self.inner.events_rx.clone()
    }

    #[must_use]
    pub fn active_jobs(&self) -> usize {
        self.inner.active_jobs.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn artifact_count(&self) -> usize {
        self.inner.artifacts.lock().len()
    }

    /// Blocks until no job is running or `timeout` elapses. Returns whether
    /// the cache went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (min, max) = self.inner.config.shutdown_backoff();
        let mut interval = min;
        loop {
            if self.active_jobs() == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(interval.min(deadline - now));
            interval = (interval * 2).min(max);
        }
    }

    // ========================================================================
    // File invalidation
    // ========================================================================

    pub fn notify_file_changed(&self, path: impl AsRef<Path>) {
        self.inner.dependencies.lock().notify(path.as_ref(), FileChange::Changed);
    }

    pub fn notify_file_added(&self, path: impl AsRef<Path>) {
        self.inner.dependencies.lock().notify(path.as_ref(), FileChange::Added);
    }

    pub fn notify_file_removed(&self, path: impl AsRef<Path>) {
        self.inner.dependencies.lock().notify(path.as_ref(), FileChange::Removed);
    }

    /// Recompiles every technique depending on a file notified since the
    /// last call, each exactly once. Techniques sharing a key share one
    /// compile. A call made while another `sync` is
    /// running returns immediately. Returns the number of techniques
    /// re-requested.
    pub fn sync(&self) -> usize {
        let inner = &self.inner;
        let Some(_guard) = inner.sync_guard.try_lock() else {
            return 0;
        };
        if inner.shut_down.load(Ordering::Acquire) {
            return 0;
        }

        let changes = inner.dependencies.lock().drain();
        if changes.paths.is_empty() && !changes.files_added {
            return 0;
        }

        inner.artifacts.lock().retain(|_, shader| {
            !shader
                .dependencies
                .iter()
                .any(|d| changes.paths.contains(&d.path))
        });

        let mut targets = changes.techniques;
        if changes.files_added {
            let entries = inner.entries.lock();
            targets.extend(
                entries
                    .iter()
                    .filter(|(_, e)| matches!(e.state, CompilationState::Failed(_)))
                    .map(|(id, _)| *id),
            );
            targets.sort_unstable();
            targets.dedup();
        }

        // One fresh job per key; later techniques sharing it join that job.
        let mut restarted: FxHashSet<CompilationKey> = FxHashSet::default();
        let mut requested = 0;
        for technique in targets {
            let request = inner
                .entries
                .lock()
                .get(&technique)
                .map(|e| (e.context_name.clone(), Arc::clone(&e.graph)));
            let Some((context_name, graph)) = request else {
                continue;
            };
            match self.request(&context_name, graph, technique, |key| restarted.insert(*key)) {
                Ok(_) => requested += 1,
                Err(e) => log::warn!("Failed to re-request '{context_name}': {e}"),
            }
        }

        if requested > 0 {
            log::info!("Recompiling {requested} technique(s) after file changes");
        }
        requested
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stops accepting requests, waits for running jobs and releases every
    /// entry. Idempotent.
    pub fn shutdown(&mut self) {
        let inner = &self.inner;
        if inner.shut_down.swap(true, Ordering::AcqRel) && self.runtime.is_none() {
            return;
        }

        let (min, max) = inner.config.shutdown_backoff();
        let mut interval = min;
        while inner.active_jobs.load(Ordering::Acquire) > 0 {
            std::thread::sleep(interval);
            interval = (interval * 2).min(max);
        }

        inner.in_flight.lock().clear();
        inner.entries.lock().clear();
        inner.artifacts.lock().clear();
        for (_, technique) in inner.techniques.read().iter() {
            technique.clear();
        }

        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        log::debug!("Material technique cache shut down");
    }
}

impl Drop for MaterialTechniqueCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─── Job execution ───────────────────────────────────────────────────────────

impl CacheInner {
    fn cancelled(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn run_job(
        &self,
        job: u64,
        key: CompilationKey,
        context_name: &str,
        graph: &MaterialGraph,
        setup: &MaterialCompilationSetup,
    ) {
        self.mark_compiling(key);

        let result = compile_technique(context_name, graph, setup, &self.config.compiler).and_then(|shader| {
            if self.cancelled() {
                return Err(MaterialError::ServiceShutDown);
            }
            let output = self.backend.compile(&BackendRequest {
                context_name,
                shader: &shader,
            })?;
            Ok(Arc::new(CompiledShader {
                key,
                setup: *setup,
                render_states: shader.render_states,
                defines: shader.defines,
                source: shader.source,
                binary: output.binary,
                dependencies: output.dependencies,
            }))
        });

        if self.cancelled() {
            log::debug!("Dropping result of job {job} for '{context_name}': cache shut down");
            return;
        }
        self.finish(job, key, &result);
    }

    fn mark_compiling(&self, key: CompilationKey) {
        let waiters = match self.in_flight.lock().get(&key) {
            Some(f) => f.waiters.clone(),
            None => return,
        };
        let mut entries = self.entries.lock();
        for waiter in waiters {
            if let Some(entry) = entries.get_mut(&waiter.technique)
                && entry.generation == waiter.generation
            {
                entry.state = CompilationState::Compiling;
            }
        }
    }

    /// Hands the result of `job` to its waiters, unless a newer job for the
    /// same key replaced it.
    fn finish(&self, job: u64, key: CompilationKey, result: &Result<Arc<CompiledShader>>) {
        let waiters = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(f) if f.job == job => {}
                _ => {
                    log::debug!("Job {job} was superseded, discarding its result");
                    return;
                }
            }
            if let Ok(shader) = result {
                self.artifacts.lock().insert(key, Arc::clone(shader));
            }
            in_flight.remove(&key).map(|f| f.waiters).unwrap_or_default()
        };

        for waiter in waiters {
            self.complete_waiter(waiter, result);
        }
    }

    fn complete_waiter(&self, waiter: Waiter, result: &Result<Arc<CompiledShader>>) {
        let Some(technique) = self.techniques.read().get(waiter.technique).cloned() else {
            return;
        };

        let event = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&waiter.technique) else {
                return;
            };
            if entry.generation != waiter.generation {
                log::debug!("Request for '{}' was superseded", entry.context_name);
                return;
            }

            match result {
                Ok(shader) => {
                    technique.publish(Arc::clone(shader));
                    entry.state = CompilationState::Ready;
                    self.dependencies
                        .lock()
                        .replace(waiter.technique, &shader.dependencies);
                    CompilationEvent::Ready {
                        technique: waiter.technique,
                        key: entry.key,
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    log::error!(
                        "Failed to compile '{}' ({}): {message}",
                        entry.context_name,
                        technique.setup()
                    );
                    entry.state = CompilationState::Failed(message.clone());
                    CompilationEvent::Failed {
                        technique: waiter.technique,
                        key: entry.key,
                        message,
                    }
                }
            }
        };

        self.emit(event);
    }

    fn emit(&self, event: CompilationEvent) {
        if let Err(flume::TrySendError::Full(event)) = self.events_tx.try_send(event) {
            let _ = self.events_rx.try_recv();
            let _ = self.events_tx.try_send(event);
        }
    }
}
