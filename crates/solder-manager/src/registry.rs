//! The plugin registry: id-unique record arena plus the pending request list.
//!
//! The arena (`Vec<Arc<PluginRecord>>` + id index) is the canonical source
//! of determinism: every sweep and every topological emission iterates it in
//! insertion order. Records address each other by arena index, so dependency
//! cycles are expressible without ownership cycles; indices stay valid
//! because the arena only grows (removal is future work).
//!
//! # Lock hierarchy
//!
//! The registry lock is the top of the crate-wide hierarchy:
//!
//! 1. registry arena (`inner`)
//! 2. pending request list
//! 3. record linkability gate
//! 4. record parent lock
//! 5. record dependencies lock
//! 6. record construction lock
//!
//! Every path that needs more than one of these acquires them in this
//! top-down order. The sticky per-record flags (`linkable`, `active`) are
//! atomics, so fast-path checks never touch a lock at all.
//!
//! `insert` holds locks 1 and 2 together (in that order) so the id check,
//! the record insertion, and the request emission form one critical section.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::info;

use solder_core::{Descriptor, PluginError, PluginId, Result};

use crate::record::PluginRecord;
use crate::request::DependencyRequest;

pub(crate) struct RegistryInner {
    pub(crate) records: Vec<Arc<PluginRecord>>,
    pub(crate) index: HashMap<PluginId, usize>,
}

/// Id-unique map from plugin id to [`PluginRecord`], plus the pending
/// dependency-request list the resolver sweeps.
pub struct PluginRegistry {
    pub(crate) inner: RwLock<RegistryInner>,
    pub(crate) pending: RwLock<Vec<DependencyRequest>>,
    /// Nudged after every successful insert so a resolver task can sweep
    /// without polling.
    changed: Notify,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner {
                records: Vec::new(),
                index: HashMap::new(),
            }),
            pending: RwLock::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    /// Inserts a descriptor, creating its record and emitting its dependency
    /// requests onto the pending list.
    ///
    /// Returns the new record's arena index. A descriptor whose id is
    /// already registered is discarded: the earlier record is preserved and
    /// `DuplicateId` is returned.
    pub fn insert(&self, desc: Descriptor) -> Result<usize> {
        let mut inner = self.inner.write();
        if inner.index.contains_key(desc.id()) {
            return Err(PluginError::DuplicateId(desc.id().clone()));
        }
        let index = inner.records.len();
        let id = desc.id().clone();
        let version = desc.version().to_string();
        let record = Arc::new(PluginRecord::new(desc, index));
        let requests = record.dependency_requests();
        inner.index.insert(id.clone(), index);
        inner.records.push(record);
        self.pending.write().extend(requests);
        drop(inner);

        info!(plugin = %id, version = %version, "Plugin registered");
        self.changed.notify_waiters();
        Ok(index)
    }

    /// Removes a plugin from the registry.
    ///
    /// Declared for forward compatibility; unbinding a live dependency graph
    /// needs the desatisfy cascade, which is future work.
    pub fn remove(&self, _id: &PluginId) -> Result<()> {
        Err(PluginError::Unsupported("plugin removal"))
    }

    /// Looks up a record by id.
    pub fn lookup(&self, id: &PluginId) -> Option<Arc<PluginRecord>> {
        let inner = self.inner.read();
        inner
            .index
            .get(id)
            .map(|&index| Arc::clone(&inner.records[index]))
    }

    /// Arena index of the record with this id.
    pub fn index_of(&self, id: &PluginId) -> Option<usize> {
        self.inner.read().index.get(id).copied()
    }

    /// Snapshot of every record in insertion order.
    pub fn records(&self) -> Vec<Arc<PluginRecord>> {
        self.inner.read().records.clone()
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests still pending.
    pub fn pending_len(&self) -> usize {
        self.pending.read().len()
    }

    /// Completes the next time the registry changes.
    ///
    /// Used by resolver tasks to sweep on insert instead of polling; a
    /// missed nudge is harmless because `initialize` always sweeps first.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
