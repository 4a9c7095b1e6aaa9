//! Per-plugin runtime state.
//!
//! A [`PluginRecord`] is created when the registry accepts a descriptor and
//! lives until manager shutdown. All mutable state — resolved bindings, the
//! linkability flag, the constructed instance — sits behind the record's own
//! locks so that discovery workers, the resolver, and the lifecycle driver
//! can touch different records concurrently.
//!
//! Records reference each other by **arena index**, never by pointer, so
//! dependency cycles cannot create ownership cycles. Indices are stable: the
//! registry arena only grows.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use solder_core::{
    BoxError, DeclaredDep, Descriptor, HookEntry, InitArgs, LifecycleHook, PluginError, PluginId,
    PluginInstance, Result,
};

use crate::request::DependencyRequest;

// ─── ResolvedDeps ────────────────────────────────────────────────────────────

/// Insertion-ordered map from dependency id to arena index.
///
/// Dependency lists are small; linear scans beat hashing here and keep
/// discovery order intact for the deterministic sweeps.
#[derive(Default)]
pub(crate) struct ResolvedDeps {
    entries: Vec<(PluginId, usize)>,
}

impl ResolvedDeps {
    pub(crate) fn contains(&self, id: &PluginId) -> bool {
        self.entries.iter().any(|(dep, _)| dep == id)
    }

    pub(crate) fn get(&self, id: &PluginId) -> Option<usize> {
        self.entries
            .iter()
            .find(|(dep, _)| dep == id)
            .map(|&(_, index)| index)
    }

    pub(crate) fn insert(&mut self, id: PluginId, index: usize) {
        debug_assert!(!self.contains(&id));
        self.entries.push((id, index));
    }

    pub(crate) fn remove(&mut self, id: &PluginId) -> bool {
        match self.entries.iter().position(|(dep, _)| dep == id) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    pub(crate) fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|&(_, index)| index).collect()
    }

    pub(crate) fn ids(&self) -> Vec<PluginId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn contains_all(&self, ids: &HashSet<PluginId>) -> bool {
        ids.iter().all(|id| self.contains(id))
    }
}

// ─── HookRunner ──────────────────────────────────────────────────────────────

/// Lazily sorted hook list with a resume index.
///
/// Hooks are ordered by `(priority, declaration index)` on first use and the
/// ordering is memoized. When a hook fails, the index stays on the failed
/// hook so a retry continues from there instead of re-running earlier hooks.
struct HookRunner {
    sorted: Option<Vec<LifecycleHook>>,
    resume: usize,
}

impl HookRunner {
    fn new() -> Self {
        Self {
            sorted: None,
            resume: 0,
        }
    }

    fn run(
        &mut self,
        source: &[HookEntry],
        instance: &PluginInstance,
        args: &InitArgs,
    ) -> std::result::Result<(), BoxError> {
        let hooks = self.sorted.get_or_insert_with(|| {
            let mut keyed: Vec<(i32, usize)> = source
                .iter()
                .enumerate()
                .map(|(index, entry)| (entry.priority, index))
                .collect();
            keyed.sort_by_key(|&(priority, index)| (priority, index));
            keyed
                .into_iter()
                .map(|(_, index)| source[index].hook.clone())
                .collect()
        });
        while self.resume < hooks.len() {
            (hooks[self.resume].as_ref())(instance, args)?;
            self.resume += 1;
        }
        Ok(())
    }
}

// ─── PluginRecord ────────────────────────────────────────────────────────────

/// Mutable runtime state for one registered plugin.
///
/// # Lock hierarchy
///
/// When a code path needs more than one lock it acquires them in this order
/// (registry locks come first, see [`PluginRegistry`]): `linkability` →
/// `parent` → `dependencies` → `construction`. The sticky flags
/// (`linkable`, `active`) are atomics and can be read anywhere.
///
/// [`PluginRegistry`]: crate::registry::PluginRegistry
pub struct PluginRecord {
    desc: Descriptor,
    index: usize,
    /// Ids of the required declared dependencies, cached at creation.
    required_deps: HashSet<PluginId>,
    parent: Mutex<Option<usize>>,
    dependencies: RwLock<ResolvedDeps>,
    /// Serializes linkability fixed-point tests.
    pub(crate) linkability: RwLock<()>,
    /// Sticky: transitions false → true exactly once.
    linkable: AtomicBool,
    construction: Mutex<Option<PluginInstance>>,
    active: AtomicBool,
    /// Requests this record satisfied; needed when removal lands.
    satisfied: Mutex<Vec<DependencyRequest>>,
    activators: Mutex<HookRunner>,
    deactivators: Mutex<HookRunner>,
}

impl PluginRecord {
    pub(crate) fn new(desc: Descriptor, index: usize) -> Self {
        let required_deps = desc
            .dependencies()
            .iter()
            .filter(|dep| dep.required)
            .map(|dep| dep.id.clone())
            .collect();
        Self {
            desc,
            index,
            required_deps,
            parent: Mutex::new(None),
            dependencies: RwLock::new(ResolvedDeps::default()),
            linkability: RwLock::new(()),
            linkable: AtomicBool::new(false),
            construction: Mutex::new(None),
            active: AtomicBool::new(false),
            satisfied: Mutex::new(Vec::new()),
            activators: Mutex::new(HookRunner::new()),
            deactivators: Mutex::new(HookRunner::new()),
        }
    }

    /// The immutable descriptor this record was created from.
    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    /// The plugin id.
    pub fn id(&self) -> &PluginId {
        self.desc.id()
    }

    /// The plugin version string.
    pub fn version(&self) -> &str {
        self.desc.version()
    }

    /// This record's arena index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the lifecycle driver constructs and activates this plugin.
    pub fn should_initialize(&self) -> bool {
        self.desc.kind().should_initialize()
    }

    // ─── Resolution state ────────────────────────────────────────────────────

    /// A record is resolved iff its parent is bound (or it declares none) and
    /// every required dependency id is bound.
    ///
    /// Optional dependencies never block resolution.
    pub fn is_resolved(&self) -> bool {
        if self.desc.parent().is_some() && self.parent.lock().is_none() {
            return false;
        }
        self.dependencies.read().contains_all(&self.required_deps)
    }

    /// The sticky linkability flag. `false` means "not yet shown linkable",
    /// not "unlinkable" — run the resolver's fixed-point test to find out.
    pub fn linkable(&self) -> bool {
        self.linkable.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_linkable(&self) {
        self.linkable.store(true, Ordering::SeqCst);
    }

    /// Ids currently bound in the resolved dependency map, in binding order.
    pub fn resolved_dependency_ids(&self) -> Vec<PluginId> {
        self.dependencies.read().ids()
    }

    /// Arena indices of the resolved dependencies, in binding order.
    pub(crate) fn resolved_dep_indices(&self) -> Vec<usize> {
        self.dependencies.read().indices()
    }

    /// Arena index of the bound dependency with this id, if any.
    pub fn resolved_dependency(&self, id: &PluginId) -> Option<usize> {
        self.dependencies.read().get(id)
    }

    /// Arena index of the resolved parent, if bound.
    pub fn parent_index(&self) -> Option<usize> {
        *self.parent.lock()
    }

    // ─── Request plumbing ────────────────────────────────────────────────────

    /// Emits one pending request per unresolved slot: the parent (when
    /// declared and unbound) followed by each declared dependency that has no
    /// binding yet.
    pub(crate) fn dependency_requests(&self) -> Vec<DependencyRequest> {
        let mut requests = Vec::new();
        if let Some(parent_id) = self.desc.parent() {
            let parent = self.parent.lock();
            if parent.is_none() {
                requests.push(DependencyRequest::parent(
                    self.index,
                    self.id().clone(),
                    parent_id.clone(),
                ));
            }
        }
        let resolved = self.dependencies.read();
        for dep in self.desc.dependencies() {
            if !resolved.contains(&dep.id) {
                requests.push(DependencyRequest::regular(
                    self.index,
                    self.id().clone(),
                    dep.clone(),
                ));
            }
        }
        requests
    }

    /// Binds `candidate` into the resolved dependency map for a regular
    /// request. Returns the arena index the request was bound to, or `None`
    /// when the bind fails.
    ///
    /// An id that is already bound (the parent bind may have inserted it)
    /// is reused iff the existing binding still matches the requested range.
    pub(crate) fn apply_regular(
        &self,
        want: &DeclaredDep,
        arena: &[Arc<PluginRecord>],
        candidate: usize,
    ) -> Option<usize> {
        let mut deps = self.dependencies.write();
        if let Some(existing) = deps.get(&want.id) {
            if want.version.matches(arena[existing].version()) {
                return Some(existing);
            }
            return None;
        }
        deps.insert(want.id.clone(), candidate);
        debug!(
            plugin = %self.id(),
            dependency = %want,
            satisfier = %arena[candidate].id(),
            version = arena[candidate].version(),
            "Resolved dependency"
        );
        Some(candidate)
    }

    /// Binds `candidate` as the resolved parent. Reuses an existing
    /// dependency binding for the same id; otherwise also inserts the parent
    /// into the dependency map so the parent participates in the dependency
    /// graph like any other edge.
    pub(crate) fn apply_parent(
        &self,
        want: &DeclaredDep,
        arena: &[Arc<PluginRecord>],
        candidate: usize,
    ) -> Option<usize> {
        let mut parent = self.parent.lock();
        if parent.is_some() {
            return None;
        }
        let mut deps = self.dependencies.write();
        let bound = match deps.get(&want.id) {
            Some(existing) => existing,
            None => {
                deps.insert(want.id.clone(), candidate);
                candidate
            }
        };
        *parent = Some(bound);
        debug!(
            plugin = %self.id(),
            parent = %arena[bound].id(),
            version = arena[bound].version(),
            "Resolved parent plugin"
        );
        Some(bound)
    }

    /// Undoes a regular bind. Returns `true` iff a binding was removed.
    pub(crate) fn unapply_regular(&self, want: &DeclaredDep) -> bool {
        self.dependencies.write().remove(&want.id)
    }

    /// Undoes a parent bind. Returns `true` iff the parent was cleared.
    pub(crate) fn unapply_parent(&self) -> bool {
        let mut parent = self.parent.lock();
        if parent.is_none() {
            return false;
        }
        *parent = None;
        true
    }

    /// Attempts to satisfy `request` with this record, retaining a
    /// back-reference to the satisfied request on success.
    pub(crate) fn try_satisfy_request(
        &self,
        request: &mut DependencyRequest,
        arena: &[Arc<PluginRecord>],
    ) -> bool {
        let mut satisfied = self.satisfied.lock();
        if !request.try_satisfy(arena, self.index) {
            return false;
        }
        satisfied.push(request.clone());
        true
    }

    /// Snapshot of the requests this record has satisfied.
    pub fn satisfied_requests(&self) -> Vec<DependencyRequest> {
        self.satisfied.lock().clone()
    }

    // ─── Construction and activation ─────────────────────────────────────────

    /// Whether the construction hook has produced an instance.
    pub fn is_constructed(&self) -> bool {
        self.construction.lock().is_some()
    }

    /// The constructed instance, if any.
    pub fn instance(&self) -> Option<PluginInstance> {
        self.construction.lock().clone()
    }

    /// Runs the construction hook.
    ///
    /// The linkability flag is checked before the construction lock is taken;
    /// the flag is monotonic, so it cannot revert while the lock is held.
    /// Constructing twice returns the existing instance with a warning.
    pub fn construct(&self, args: &InitArgs) -> Result<PluginInstance> {
        if !self.linkable() {
            return Err(PluginError::Unlinkable(self.id().clone()));
        }
        let mut slot = self.construction.lock();
        if let Some(existing) = slot.as_ref() {
            warn!(
                plugin = %self.id(),
                "Plugin is already constructed, returning the existing instance"
            );
            return Ok(existing.clone());
        }
        let instance = (self.desc.construct_hook().as_ref())(args).map_err(|source| {
            PluginError::Construction {
                plugin: self.id().clone(),
                source,
            }
        })?;
        *slot = Some(instance.clone());
        debug!(plugin = %self.id(), "Plugin constructed");
        Ok(instance)
    }

    /// Runs the activators in `(priority, declaration)` order.
    ///
    /// On failure the position is remembered; a later call resumes from the
    /// failed hook. Once every activator has run, further calls are no-ops.
    pub fn call_activators(&self, args: &InitArgs) -> Result<()> {
        let Some(instance) = self.instance() else {
            return Err(PluginError::activation(
                self.id().clone(),
                "plugin is not constructed".into(),
            ));
        };
        let mut runner = self.activators.lock();
        runner
            .run(self.desc.activators(), &instance, args)
            .map_err(|source| PluginError::Activation {
                plugin: self.id().clone(),
                source,
            })
    }

    /// Runs the deactivators; behaves symmetrically to
    /// [`call_activators`](Self::call_activators).
    pub fn call_deactivators(&self, args: &InitArgs) -> Result<()> {
        let Some(instance) = self.instance() else {
            return Err(PluginError::deactivation(
                self.id().clone(),
                "plugin is not constructed".into(),
            ));
        };
        let mut runner = self.deactivators.lock();
        runner
            .run(self.desc.deactivators(), &instance, args)
            .map_err(|source| PluginError::Deactivation {
                plugin: self.id().clone(),
                source,
            })
    }

    /// Whether every activator completed successfully and the plugin has not
    /// been deactivated since.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRecord")
            .field("id", self.id())
            .field("version", &self.version())
            .field("index", &self.index)
            .field("linkable", &self.linkable())
            .field("constructed", &self.is_constructed())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use solder_core::{Descriptor, VersionRange};

    fn record(desc: Descriptor) -> PluginRecord {
        PluginRecord::new(desc, 0)
    }

    #[test]
    fn resolved_when_required_bound() {
        // Pins the documented meaning: resolved = all required dependencies
        // (and the parent, when declared) are bound.
        let desc = Descriptor::builder("a", "1.0")
            .dependency("b", VersionRange::Any, true)
            .dependency("c", VersionRange::Any, false)
            .build();
        let rec = record(desc);
        assert!(!rec.is_resolved(), "required dep unbound");

        rec.dependencies
            .write()
            .insert(PluginId::from("b"), 1);
        assert!(rec.is_resolved(), "optional dep must not block resolution");
    }

    #[test]
    fn unbound_parent_blocks_resolution() {
        let desc = Descriptor::builder("a", "1.0").parent("p").build();
        let rec = record(desc);
        assert!(!rec.is_resolved());
        *rec.parent.lock() = Some(3);
        assert!(rec.is_resolved());
    }

    #[test]
    fn construct_requires_linkable() {
        let rec = record(Descriptor::builder("a", "1.0").build());
        let err = rec.construct(&InitArgs::new()).unwrap_err();
        assert!(matches!(err, PluginError::Unlinkable(_)));
    }

    #[test]
    fn construct_is_idempotent() {
        let rec = record(Descriptor::builder("a", "1.0").build());
        rec.mark_linkable();
        let first = rec.construct(&InitArgs::new()).unwrap();
        let second = rec.construct(&InitArgs::new()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    fn log_hook(tag: &'static str, calls: &Arc<Mutex<Vec<&'static str>>>) -> LifecycleHook {
        let calls = Arc::clone(calls);
        Arc::new(move |_, _| {
            calls.lock().push(tag);
            Ok(())
        })
    }

    #[test]
    fn activators_run_in_priority_order_and_resume() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let failures_left = Arc::new(AtomicUsize::new(1));

        let flaky: LifecycleHook = {
            let calls = Arc::clone(&calls);
            let failures_left = Arc::clone(&failures_left);
            Arc::new(move |_, _| {
                if failures_left
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
                {
                    return Err("flaky".into());
                }
                calls.lock().push("flaky");
                Ok(())
            })
        };

        let desc = Descriptor::builder("a", "1.0")
            .activator(10, log_hook("late", &calls))
            .activator(0, flaky)
            .activator(0, log_hook("early-second", &calls))
            .build();
        let rec = record(desc);
        rec.mark_linkable();
        rec.construct(&InitArgs::new()).unwrap();

        // First attempt stops at the flaky hook (priority 0, declared first
        // among the ties after sorting puts it ahead of "early-second").
        assert!(rec.call_activators(&InitArgs::new()).is_err());
        assert!(calls.lock().is_empty());

        // Retry resumes from the failed hook; earlier hooks do not re-run.
        rec.call_activators(&InitArgs::new()).unwrap();
        assert_eq!(*calls.lock(), vec!["flaky", "early-second", "late"]);

        // A fully drained runner is a no-op.
        rec.call_activators(&InitArgs::new()).unwrap();
        assert_eq!(calls.lock().len(), 3);
    }

    #[test]
    fn activation_before_construction_fails() {
        let rec = record(Descriptor::builder("a", "1.0").build());
        let err = rec.call_activators(&InitArgs::new()).unwrap_err();
        assert!(matches!(err, PluginError::Activation { .. }));
    }
}
