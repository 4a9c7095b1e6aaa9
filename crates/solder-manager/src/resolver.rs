//! Dependency resolution sweeps and the linkability fixed-point.
//!
//! Resolution is a bulk operation: [`satisfy_pass`] offers every registered
//! record, in insertion order, to every pending request. Requests that bind
//! leave the pending list; everything else stays and is retried on the next
//! sweep (typically after another plugin arrives).
//!
//! Linkability is the transitive closure of resolution: a record is linkable
//! when the whole subgraph reachable through its resolved dependencies is
//! resolved. Cycles are fine as long as every member of the cycle is
//! resolved — the fixed-point test collects the candidate component first
//! and only then marks all of it linkable at once.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use solder_core::PluginId;

use crate::record::PluginRecord;
use crate::registry::PluginRegistry;

/// Offers every registered record to every pending request.
///
/// Holds the registry read lock and the pending-list write lock for the
/// whole sweep, so the pass is atomic with respect to inserts. Satisfied
/// requests move to the satisfier's back-reference list. When several
/// records could satisfy a request, the one earliest in insertion order
/// wins.
///
/// Returns `true` iff the pending list is empty afterwards. Running the pass
/// twice without an intervening insert changes nothing on the second run.
pub fn satisfy_pass(registry: &PluginRegistry) -> bool {
    let inner = registry.inner.read();
    let mut pending = registry.pending.write();
    for record in &inner.records {
        let mut i = 0;
        while i < pending.len() {
            if record.try_satisfy_request(&mut pending[i], &inner.records) {
                let request = pending.remove(i);
                trace!(request = %request, "Request satisfied");
            } else {
                i += 1;
            }
        }
    }
    pending.is_empty()
}

/// Runs the linkability fixed-point test for the record with this id.
///
/// Returns `false` for unknown ids.
pub fn is_linkable(registry: &PluginRegistry, id: &PluginId) -> bool {
    let inner = registry.inner.read();
    match inner.index.get(id) {
        Some(&index) => is_linkable_at(&inner.records, index),
        None => false,
    }
}

/// The linkability fixed-point test over the arena.
///
/// A record already marked linkable short-circuits. Otherwise the test takes
/// the record's linkability gate (serializing concurrent tests on the same
/// record), walks the resolved-dependency graph depth-first, and either
/// aborts on the first unresolved record or marks the entire visited
/// component linkable.
///
/// Cycle edges back into the visited set terminate without recursing: if
/// every member of the component is resolved and every edge leaving it lands
/// on an already-linkable record, the whole component links together.
pub(crate) fn is_linkable_at(arena: &[Arc<PluginRecord>], index: usize) -> bool {
    let record = &arena[index];
    if record.linkable() {
        return true;
    }
    let _gate = record.linkability.write();
    // A concurrent test may have finished while this one waited on the gate.
    if record.linkable() {
        return true;
    }
    let mut visited: HashMap<PluginId, usize> = HashMap::new();
    if collect_component(arena, index, &mut visited) {
        for &member in visited.values() {
            arena[member].mark_linkable();
        }
        return true;
    }
    false
}

/// Fills `visited` with the component that must resolve together for
/// `index` to be linkable. Returns `false` as soon as an unresolved record
/// is reachable.
fn collect_component(
    arena: &[Arc<PluginRecord>],
    index: usize,
    visited: &mut HashMap<PluginId, usize>,
) -> bool {
    let record = &arena[index];
    if record.linkable() {
        return true;
    }
    if !record.is_resolved() {
        return false;
    }
    if visited.contains_key(record.id()) {
        return true;
    }
    visited.insert(record.id().clone(), index);
    for dep in record.resolved_dep_indices() {
        if !collect_component(arena, dep, visited) {
            return false;
        }
    }
    true
}

/// Emits the linkable records in deterministic initialization order:
/// dependencies before dependents, ties and roots in insertion order.
///
/// Inside a cycle the member reached first (by insertion order) is emitted
/// last among its cycle peers; every record appears at most once.
pub(crate) fn linkable_order(arena: &[Arc<PluginRecord>]) -> Vec<usize> {
    let mut order = Vec::new();
    let mut seen = vec![false; arena.len()];
    for index in 0..arena.len() {
        if is_linkable_at(arena, index) {
            emit(arena, index, &mut seen, &mut order);
        }
    }
    order
}

fn emit(arena: &[Arc<PluginRecord>], index: usize, seen: &mut [bool], order: &mut Vec<usize>) {
    if seen[index] {
        return;
    }
    seen[index] = true;
    for dep in arena[index].resolved_dep_indices() {
        if arena[dep].linkable() {
            emit(arena, dep, seen, order);
        }
    }
    order.push(index);
}
