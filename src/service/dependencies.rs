//! File dependency tracking.
//!
//! Every compiled technique records the files its shader was built from.
//! File notifications only mark paths as pending; [`FileDependencyTracker::drain`]
//! turns the pending set into the techniques to recompile, each listed once
//! no matter how many of its files changed.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};

use super::backend::FileDependency;
use super::technique::TechniqueId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChange {
    Changed,
    Added,
    Removed,
}

/// Result of draining the pending set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChanges {
    pub paths: Vec<PathBuf>,
    /// Dependents of `paths`, deduplicated, in handle order.
    pub techniques: Vec<TechniqueId>,
    /// A file appeared; failed techniques may now resolve their includes.
    pub files_added: bool,
}

#[derive(Debug, Default)]
pub struct FileDependencyTracker {
    dependents: FxHashMap<PathBuf, FxHashSet<TechniqueId>>,
    files: FxHashMap<TechniqueId, Vec<PathBuf>>,
    pending: Vec<PathBuf>,
    files_added: bool,
}

impl FileDependencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the recorded dependencies of `technique`.
    pub fn replace(&mut self, technique: TechniqueId, dependencies: &[FileDependency]) {
        self.remove(technique);
        let paths: Vec<PathBuf> = dependencies.iter().map(|d| d.path.clone()).collect();
        for path in &paths {
            self.dependents.entry(path.clone()).or_default().insert(technique);
        }
        self.files.insert(technique, paths);
    }

    pub fn remove(&mut self, technique: TechniqueId) {
        let Some(paths) = self.files.remove(&technique) else {
            return;
        };
        for path in paths {
            if let Some(set) = self.dependents.get_mut(&path) {
                set.remove(&technique);
                if set.is_empty() {
                    self.dependents.remove(&path);
                }
            }
        }
    }

    #[must_use]
    pub fn dependencies(&self, technique: TechniqueId) -> &[PathBuf] {
        self.files.get(&technique).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_tracked(&self, path: &Path) -> bool {
        self.dependents.contains_key(path)
    }

    pub fn notify(&mut self, path: &Path, change: FileChange) {
        log::debug!("File {change:?}: {}", path.display());
        if change == FileChange::Added {
            self.files_added = true;
        }
        if !self.pending.iter().any(|p| p == path) {
            self.pending.push(path.to_path_buf());
        }
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.files_added
    }

    /// Takes the pending set.
    pub fn drain(&mut self) -> PendingChanges {
        let paths = std::mem::take(&mut self.pending);
        let files_added = std::mem::take(&mut self.files_added);

        let mut techniques: Vec<TechniqueId> = paths
            .iter()
            .filter_map(|p| self.dependents.get(p))
            .flatten()
            .copied()
            .collect();
        techniques.sort_unstable();
        techniques.dedup();

        PendingChanges {
            paths,
            techniques,
            files_added,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn dep(path: &str) -> FileDependency {
        FileDependency {
            path: PathBuf::from(path),
            modified: None,
        }
    }

    #[test]
    fn drain_lists_each_dependent_once() {
        let mut ids: SlotMap<TechniqueId, ()> = SlotMap::with_key();
        let t = ids.insert(());
        let u = ids.insert(());

        let mut tracker = FileDependencyTracker::new();
        tracker.replace(t, &[dep("a.h"), dep("b.h")]);
        tracker.replace(u, &[dep("c.h")]);

        tracker.notify(Path::new("a.h"), FileChange::Changed);
        tracker.notify(Path::new("b.h"), FileChange::Changed);
        tracker.notify(Path::new("a.h"), FileChange::Changed);

        let drained = tracker.drain();
        assert_eq!(drained.techniques, vec![t]);
        assert_eq!(drained.paths.len(), 2);
        assert!(!tracker.has_pending());
    }

    #[test]
    fn replacing_dependencies_forgets_old_files() {
        let mut ids: SlotMap<TechniqueId, ()> = SlotMap::with_key();
        let t = ids.insert(());

        let mut tracker = FileDependencyTracker::new();
        tracker.replace(t, &[dep("old.h")]);
        tracker.replace(t, &[dep("new.h")]);

        assert!(!tracker.is_tracked(Path::new("old.h")));
        tracker.notify(Path::new("old.h"), FileChange::Removed);
        assert!(tracker.drain().techniques.is_empty());
    }
}
