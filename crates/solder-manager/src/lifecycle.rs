//! Plugin lifecycle management.
//!
//! [`PluginManager`] is the central owner of the registry. It:
//!
//! - Accepts [`Descriptor`]s from discovery ([`ingest`](PluginManager::ingest),
//!   which applies the blocklist and swallows duplicates) or from direct
//!   callers ([`insert`](PluginManager::insert), which surfaces
//!   `DuplicateId`).
//! - Runs resolution sweeps ([`resolve`](PluginManager::resolve)).
//! - Drives every linkable plugin through Construct → Activate in
//!   dependency order via [`initialize`](PluginManager::initialize), and
//!   back through Deactivate in reverse order via
//!   [`shutdown`](PluginManager::shutdown).
//!
//! # Example
//!
//! ```rust,ignore
//! use solder_manager::PluginManager;
//!
//! let manager = PluginManager::new();
//! manager.insert(descriptor)?;
//! manager.resolve();
//! let report = manager.initialize(&InitArgs::new())?;
//! info!(activated = report.initialized.len(), "Plugins up");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use solder_core::{Descriptor, InitArgs, PluginError, PluginId, PluginInstance, Result};

use crate::record::PluginRecord;
use crate::registry::PluginRegistry;
use crate::resolver;

/// Predicate applied to every identity before descriptor ingestion.
pub type BlockPredicate = Arc<dyn Fn(&PluginId) -> bool + Send + Sync>;

/// Namespace reserved for the manager itself; the default blocklist rejects
/// identities under it.
pub const MANAGER_NAMESPACE: &str = "solder.";

/// Summary of one [`PluginManager::initialize`] call.
#[derive(Debug, Default)]
pub struct InitReport {
    /// Plugins activated during this call, in initialization order.
    pub initialized: Vec<PluginId>,
    /// Library plugins that were ordered but intentionally not driven.
    pub skipped: Vec<PluginId>,
    /// Plugins whose activators failed first and succeeded on the
    /// end-of-call retry.
    pub recovered: Vec<PluginId>,
}

/// Central manager for plugin registration, resolution, and lifecycle.
pub struct PluginManager {
    registry: PluginRegistry,
    is_blocked: BlockPredicate,
    shutting_down: AtomicBool,
    /// Plugins whose first activation attempt failed; cleared and rebuilt by
    /// each `initialize` call.
    post_init_failures: Mutex<Vec<PluginId>>,
}

impl PluginManager {
    /// Creates a manager with the default blocklist, which rejects
    /// identities under [`MANAGER_NAMESPACE`].
    pub fn new() -> Self {
        Self::with_blocklist(Arc::new(|id: &PluginId| {
            id.as_str().starts_with(MANAGER_NAMESPACE)
        }))
    }

    /// Creates a manager with a caller-supplied blocklist predicate.
    pub fn with_blocklist(is_blocked: BlockPredicate) -> Self {
        Self {
            registry: PluginRegistry::new(),
            is_blocked,
            shutting_down: AtomicBool::new(false),
            post_init_failures: Mutex::new(Vec::new()),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    // ─── Ingestion ───────────────────────────────────────────────────────────

    /// Inserts a descriptor on behalf of discovery.
    ///
    /// Blocked identities and duplicate ids are logged and swallowed
    /// (returning `Ok(None)`); discovery keeps going either way. Direct
    /// callers who want the error should use [`insert`](Self::insert).
    pub fn ingest(&self, desc: Descriptor) -> Result<Option<usize>> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(PluginError::ShuttingDown);
        }
        if (self.is_blocked)(desc.id()) {
            warn!(plugin = %desc.id(), "Attempted to register a blocked plugin id");
            return Ok(None);
        }
        match self.registry.insert(desc) {
            Ok(index) => Ok(Some(index)),
            Err(PluginError::DuplicateId(id)) => {
                warn!(plugin = %id, "Duplicate plugin id, descriptor discarded");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    /// Inserts a descriptor, surfacing `DuplicateId` to the caller.
    pub fn insert(&self, desc: Descriptor) -> Result<usize> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(PluginError::ShuttingDown);
        }
        self.registry.insert(desc)
    }

    // ─── Resolution ──────────────────────────────────────────────────────────

    /// Runs one resolution sweep. Returns `true` iff no requests remain
    /// pending.
    pub fn resolve(&self) -> bool {
        resolver::satisfy_pass(&self.registry)
    }

    /// Runs the linkability fixed-point test for this plugin.
    pub fn is_linkable(&self, id: &PluginId) -> bool {
        resolver::is_linkable(&self.registry, id)
    }

    /// Whether this plugin is currently active.
    pub fn is_active(&self, id: &PluginId) -> bool {
        self.registry
            .lookup(id)
            .is_some_and(|record| record.is_active())
    }

    /// The constructed instance of this plugin, if any.
    pub fn instance(&self, id: &PluginId) -> Option<PluginInstance> {
        self.registry.lookup(id).and_then(|record| record.instance())
    }

    /// The record this plugin's dependency on `dependency` is bound to.
    ///
    /// Errors with `UnresolvedDependency` when the plugin is unknown or the
    /// dependency is not (yet) bound.
    pub fn resolved_dependency(
        &self,
        plugin: &PluginId,
        dependency: &PluginId,
    ) -> Result<Arc<PluginRecord>> {
        let unresolved = || PluginError::UnresolvedDependency {
            plugin: plugin.clone(),
            dependency: dependency.clone(),
        };
        let record = self.registry.lookup(plugin).ok_or_else(unresolved)?;
        let index = record.resolved_dependency(dependency).ok_or_else(unresolved)?;
        Ok(Arc::clone(&self.registry.records()[index]))
    }

    /// Plugins whose first activation attempt failed during the most recent
    /// `initialize` call and were not recovered by the retry.
    pub fn post_init_failures(&self) -> Vec<PluginId> {
        self.post_init_failures.lock().clone()
    }

    /// The deterministic initialization order over the currently linkable
    /// records: dependencies before dependents, insertion order otherwise.
    pub fn initialization_order(&self) -> Vec<PluginId> {
        let records = self.registry.records();
        resolver::linkable_order(&records)
            .into_iter()
            .map(|index| records[index].id().clone())
            .collect()
    }

    // ─── Lifecycle driving ───────────────────────────────────────────────────

    /// Constructs and activates every linkable plugin in dependency order.
    ///
    /// 1. Runs a resolution sweep.
    /// 2. Orders the linkable records children-first.
    /// 3. Constructs and activates each in turn. Library plugins are ordered
    ///    but not driven. A construction failure aborts initialization. An
    ///    activation failure stops driving further plugins; every collected
    ///    failure is retried once at the end of the call (resuming from the
    ///    failed hook), and only plugins still inactive after that retry are
    ///    reported as an error.
    ///
    /// Partial initialization is possible; inspect the report,
    /// [`post_init_failures`](Self::post_init_failures), and
    /// [`is_active`](Self::is_active).
    pub fn initialize(&self, args: &InitArgs) -> Result<InitReport> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(PluginError::ShuttingDown);
        }
        resolver::satisfy_pass(&self.registry);

        // Snapshot the arena and order, then drop the registry lock before
        // running user hooks: a hook may call back into the manager.
        let (order, records) = {
            let inner = self.registry.inner.read();
            (resolver::linkable_order(&inner.records), inner.records.clone())
        };

        let mut report = InitReport::default();
        let mut failure: Option<(usize, PluginError)> = None;

        for &index in &order {
            let record = &records[index];
            if !record.should_initialize() {
                report.skipped.push(record.id().clone());
                continue;
            }
            if record.is_active() {
                continue;
            }
            if !record.is_constructed() {
                record.construct(args)?;
            }
            match record.call_activators(args) {
                Ok(()) => {
                    record.set_active(true);
                    report.initialized.push(record.id().clone());
                    info!(plugin = %record.id(), "Plugin active");
                }
                Err(e) => {
                    error!(plugin = %record.id(), error = %e, "Plugin activation failed");
                    failure = Some((index, e));
                    break;
                }
            }
        }

        // Stopgap until plugin removal exists: give failed activators one
        // more chance before reporting, resuming from the hook that failed.
        let mut unrecovered = Vec::new();
        if let Some((index, first_error)) = failure {
            let record = &records[index];
            match record.call_activators(args) {
                Ok(()) => {
                    record.set_active(true);
                    report.recovered.push(record.id().clone());
                    info!(plugin = %record.id(), "Plugin activated on retry");
                }
                Err(retry_error) => {
                    warn!(
                        plugin = %record.id(),
                        error = %retry_error,
                        "Activation retry failed, plugin stays inactive"
                    );
                    unrecovered.push(record.id().clone());
                }
            }
            *self.post_init_failures.lock() = unrecovered.clone();
            if !unrecovered.is_empty() {
                return Err(first_error);
            }
        } else {
            self.post_init_failures.lock().clear();
        }

        Ok(report)
    }

    /// Constructs one plugin on demand.
    ///
    /// Runs the linkability test first; a plugin that is not linkable
    /// errors with `Unlinkable`.
    pub fn construct_plugin(&self, id: &PluginId, args: &InitArgs) -> Result<PluginInstance> {
        let record = {
            let inner = self.registry.inner.read();
            let Some(&index) = inner.index.get(id) else {
                return Err(PluginError::Unlinkable(id.clone()));
            };
            resolver::is_linkable_at(&inner.records, index);
            Arc::clone(&inner.records[index])
        };
        record.construct(args)
    }

    /// Deactivates every active plugin in reverse initialization order and
    /// refuses further ingestion.
    ///
    /// Deactivator failures are logged; the first is surfaced after the
    /// sweep completes. Plugins are marked inactive regardless.
    pub fn shutdown(&self, args: &InitArgs) -> Result<()> {
        self.shutting_down.store(true, Ordering::SeqCst);

        let (order, records) = {
            let inner = self.registry.inner.read();
            (resolver::linkable_order(&inner.records), inner.records.clone())
        };

        let mut first_error = None;
        for &index in order.iter().rev() {
            let record = &records[index];
            if !record.is_active() {
                continue;
            }
            if let Err(e) = record.call_deactivators(args) {
                error!(plugin = %record.id(), error = %e, "Plugin deactivation failed");
                first_error.get_or_insert(e);
            }
            record.set_active(false);
            info!(plugin = %record.id(), "Plugin deactivated");
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether the manager has begun shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
