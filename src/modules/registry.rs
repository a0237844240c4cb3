//! Module registry: the live id → instance index behind the gateway.
//!
//! The registry publishes immutable [`RegistrySnapshot`]s through an
//! [`ArcSwap`].  A reload builds the next snapshot entirely off to the side
//! and then swaps the pointer, so a concurrent reader sees either the old
//! map or the new one, never a partially populated one.  Readers that
//! already hold an instance from the old snapshot keep it alive until their
//! request completes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::loader::{LoadFailure, ModuleLoader};
use super::module_base::DashboardModule;

// ============================================================================
// RegistrySnapshot
// ============================================================================

/// An immutable, fully built generation of the registry.
pub struct RegistrySnapshot {
    entries: Vec<(String, Arc<dyn DashboardModule>)>,
    index: HashMap<String, usize>,
    failures: Vec<LoadFailure>,
    generation: u64,
}

impl RegistrySnapshot {
    /// The empty snapshot a registry starts with before its first load.
    pub fn empty() -> Self {
        Self::build(Vec::new(), Vec::new(), 0)
    }

    fn build(
        entries: Vec<(String, Arc<dyn DashboardModule>)>,
        failures: Vec<LoadFailure>,
        generation: u64,
    ) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(pos, (id, _))| (id.clone(), pos))
            .collect();
        Self {
            entries,
            index,
            failures,
            generation,
        }
    }

    /// Look up a module by id.
    pub fn get(&self, module_id: &str) -> Option<&Arc<dyn DashboardModule>> {
        self.index.get(module_id).map(|&pos| &self.entries[pos].1)
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.index.contains_key(module_id)
    }

    /// Module ids in load order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    /// `(id, instance)` pairs in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn DashboardModule>)> {
        self.entries.iter().map(|(id, module)| (id.as_str(), module))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Candidates that failed to construct during this generation's load.
    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    /// Monotonic load counter; 0 for the initial empty snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("ids", &self.ids())
            .field("generation", &self.generation)
            .field("failures", &self.failures)
            .finish()
    }
}

// ============================================================================
// ModuleRegistry
// ============================================================================

/// Discovers modules through a [`ModuleLoader`] and serves lookups from the
/// current snapshot.
pub struct ModuleRegistry {
    loader: ModuleLoader,
    current: ArcSwap<RegistrySnapshot>,
    generation: AtomicU64,
    /// Serializes reloads so generations are published in order.
    reload_lock: Mutex<()>,
}

impl ModuleRegistry {
    /// Create a registry without loading anything yet.
    pub fn new(loader: ModuleLoader) -> Self {
        Self {
            loader,
            current: ArcSwap::from_pointee(RegistrySnapshot::empty()),
            generation: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        }
    }

    /// Create a registry and run the initial discovery.
    pub fn load(loader: ModuleLoader) -> Self {
        let registry = Self::new(loader);
        registry.reload();
        registry
    }

    /// The current snapshot.  Hold on to it for the duration of a request to
    /// get a consistent view.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Look up a module by id in the current snapshot.
    pub fn get(&self, module_id: &str) -> Option<Arc<dyn DashboardModule>> {
        self.current.load().get(module_id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        self.current.load().ids()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Rediscover every module from scratch and publish the result.
    ///
    /// Previous instances are discarded with all their state; nothing is
    /// merged or carried over.
    pub fn reload(&self) -> Arc<RegistrySnapshot> {
        let _guard = self.reload_lock.lock();
        let loaded = self.loader.load_all();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(RegistrySnapshot::build(
            loaded.modules,
            loaded.failures,
            generation,
        ));
        self.current.store(Arc::clone(&snapshot));
        log::debug!(
            "Registry generation {} published with {} modules",
            generation,
            snapshot.len()
        );
        snapshot
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("current", &*self.current.load())
            .finish()
    }
}
