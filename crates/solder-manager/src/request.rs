//! Outstanding dependency requests.
//!
//! When the registry accepts a descriptor, the new record emits one
//! [`DependencyRequest`] per unresolved slot onto the manager's pending
//! list. The resolver then offers every registered record to every pending
//! request; a request that accepts a candidate binds it into the requestor's
//! record and moves to the satisfier's back-reference list.
//!
//! Two kinds exist: **regular** requests bind into the requestor's resolved
//! dependency map, **parent** requests additionally set the requestor's
//! resolved parent slot.

use std::fmt;
use std::sync::Arc;

use solder_core::{DeclaredDep, PluginId};

use crate::record::PluginRecord;

/// Which slot of the requestor a request binds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Binds into the resolved dependency map.
    Regular,
    /// Sets the resolved parent (and mirrors the binding into the map).
    Parent,
}

/// One outstanding "need `id`, version ∈ range" from a requestor record.
#[derive(Clone)]
pub struct DependencyRequest {
    requestor: usize,
    requestor_id: PluginId,
    want: DeclaredDep,
    kind: RequestKind,
    satisfier: Option<usize>,
}

impl DependencyRequest {
    pub(crate) fn regular(requestor: usize, requestor_id: PluginId, want: DeclaredDep) -> Self {
        Self {
            requestor,
            requestor_id,
            want,
            kind: RequestKind::Regular,
            satisfier: None,
        }
    }

    pub(crate) fn parent(requestor: usize, requestor_id: PluginId, parent_id: PluginId) -> Self {
        Self {
            requestor,
            requestor_id,
            // A declared parent behaves like a required dependency on any
            // version of the parent id.
            want: DeclaredDep {
                id: parent_id,
                version: solder_core::VersionRange::Any,
                required: true,
            },
            kind: RequestKind::Parent,
            satisfier: None,
        }
    }

    /// Arena index of the requesting record.
    pub fn requestor(&self) -> usize {
        self.requestor
    }

    /// Id of the requesting plugin.
    pub fn requestor_id(&self) -> &PluginId {
        &self.requestor_id
    }

    /// The requested dependency.
    pub fn want(&self) -> &DeclaredDep {
        &self.want
    }

    /// Regular or parent request.
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Arena index of the satisfier, once bound.
    pub fn satisfier(&self) -> Option<usize> {
        self.satisfier
    }

    /// Whether a satisfier has been bound.
    pub fn is_satisfied(&self) -> bool {
        self.satisfier.is_some()
    }

    /// Offers `candidate` as a satisfier.
    ///
    /// Returns `true` iff all of: the request was still pending, the
    /// candidate's id equals the requested id, the candidate's version is
    /// inside the requested range, and the kind-specific bind succeeded.
    pub fn try_satisfy(&mut self, arena: &[Arc<PluginRecord>], candidate: usize) -> bool {
        if self.is_satisfied() {
            return false;
        }
        let record = &arena[candidate];
        if record.id() != &self.want.id || !self.want.version.matches(record.version()) {
            return false;
        }
        let requestor = &arena[self.requestor];
        let bound = match self.kind {
            RequestKind::Regular => requestor.apply_regular(&self.want, arena, candidate),
            RequestKind::Parent => requestor.apply_parent(&self.want, arena, candidate),
        };
        match bound {
            Some(index) => {
                self.satisfier = Some(index);
                true
            }
            None => false,
        }
    }

    /// Undoes a successful bind, returning the request to pending.
    ///
    /// Only removal will exercise this; registry removal itself is not yet
    /// implemented.
    pub fn try_desatisfy(&mut self, arena: &[Arc<PluginRecord>]) -> bool {
        if !self.is_satisfied() {
            return false;
        }
        let requestor = &arena[self.requestor];
        let undone = match self.kind {
            RequestKind::Regular => requestor.unapply_regular(&self.want),
            RequestKind::Parent => requestor.unapply_parent(),
        };
        if undone {
            self.satisfier = None;
        }
        undone
    }
}

impl fmt::Display for DependencyRequest {
    /// Formats as `"requestor:{id, version, required}:satisfied"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.requestor_id,
            self.want,
            self.is_satisfied()
        )
    }
}

impl fmt::Debug for DependencyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRequest")
            .field("requestor", &self.requestor_id)
            .field("want", &self.want)
            .field("kind", &self.kind)
            .field("satisfier", &self.satisfier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solder_core::{Descriptor, VersionRange};

    fn arena(descs: Vec<Descriptor>) -> Vec<Arc<PluginRecord>> {
        descs
            .into_iter()
            .enumerate()
            .map(|(index, desc)| Arc::new(PluginRecord::new(desc, index)))
            .collect()
    }

    #[test]
    fn satisfies_on_id_and_version_match() {
        let arena = arena(vec![
            Descriptor::builder("a", "1.0")
                .dependency("b", VersionRange::Exact("1.0".into()), true)
                .build(),
            Descriptor::builder("b", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].try_satisfy(&arena, 1));
        assert_eq!(requests[0].satisfier(), Some(1));
        assert_eq!(arena[0].resolved_dependency(&"b".into()), Some(1));
    }

    #[test]
    fn rejects_version_mismatch() {
        let arena = arena(vec![
            Descriptor::builder("a", "1.0")
                .dependency("b", VersionRange::Exact("2.0".into()), true)
                .build(),
            Descriptor::builder("b", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert!(!requests[0].try_satisfy(&arena, 1));
        assert!(!requests[0].is_satisfied());
        assert!(arena[0].resolved_dependency_ids().is_empty());
    }

    #[test]
    fn rejects_id_mismatch_and_double_satisfaction() {
        let arena = arena(vec![
            Descriptor::builder("a", "1.0")
                .dependency("b", VersionRange::Any, true)
                .build(),
            Descriptor::builder("b", "1.0").build(),
            Descriptor::builder("c", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert!(!requests[0].try_satisfy(&arena, 2), "wrong id");
        assert!(requests[0].try_satisfy(&arena, 1));
        assert!(!requests[0].try_satisfy(&arena, 1), "already satisfied");
    }

    #[test]
    fn parent_request_sets_parent_and_mirrors_into_deps() {
        let arena = arena(vec![
            Descriptor::builder("child", "1.0").parent("base").build(),
            Descriptor::builder("base", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind(), RequestKind::Parent);
        assert!(requests[0].try_satisfy(&arena, 1));
        assert_eq!(arena[0].parent_index(), Some(1));
        assert_eq!(arena[0].resolved_dependency(&"base".into()), Some(1));
    }

    #[test]
    fn parent_request_reuses_existing_dependency_binding() {
        // "base" is both a declared dependency and the parent; the regular
        // bind lands first and the parent bind reuses it.
        let arena = arena(vec![
            Descriptor::builder("child", "1.0")
                .parent("base")
                .dependency("base", VersionRange::Any, true)
                .build(),
            Descriptor::builder("base", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert_eq!(requests.len(), 2);
        // Regular request is emitted after the parent request; satisfy it
        // first to set up the existing binding.
        assert!(requests[1].try_satisfy(&arena, 1));
        assert!(requests[0].try_satisfy(&arena, 1));
        assert_eq!(arena[0].parent_index(), Some(1));
        assert_eq!(arena[0].resolved_dependency_ids().len(), 1);
    }

    #[test]
    fn desatisfy_restores_pending_state() {
        let arena = arena(vec![
            Descriptor::builder("a", "1.0")
                .dependency("b", VersionRange::Any, true)
                .build(),
            Descriptor::builder("b", "1.0").build(),
        ]);
        let mut requests = arena[0].dependency_requests();
        assert!(requests[0].try_satisfy(&arena, 1));
        assert!(requests[0].try_desatisfy(&arena));
        assert!(!requests[0].is_satisfied());
        assert!(arena[0].resolved_dependency_ids().is_empty());
        assert!(!requests[0].try_desatisfy(&arena), "already pending");
        // And it can be satisfied again.
        assert!(requests[0].try_satisfy(&arena, 1));
    }
}
