//! Destroy-dependency pools
//!
//! While a cascading delete runs, every object whose delete was checked is
//! recorded so dependents declared with `destroyable_if_destroying_associated`
//! can be let through. Each thread keeps its own pool, so independent delete
//! transactions never see each other's objects.

use dashmap::DashMap;
use serde::Serialize;
use std::thread::{self, ThreadId};

use crate::entity::ObjectRef;

/// Objects being deleted in one cascade, plus the cascade's first target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DestroyPool {
    objects: Vec<ObjectRef>,
    initial: Option<ObjectRef>,
}

impl DestroyPool {
    /// Record an object; the first one recorded becomes the initial target
    pub fn record(&mut self, object: ObjectRef) {
        if self.initial.is_none() {
            self.initial = Some(object.clone());
        }
        if !self.objects.contains(&object) {
            self.objects.push(object);
        }
    }

    /// Whether `object` is being deleted in this cascade
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.objects.contains(object)
    }

    /// The delete that started the cascade
    pub fn initial(&self) -> Option<&ObjectRef> {
        self.initial.as_ref()
    }

    /// Recorded objects, in order
    pub fn objects(&self) -> &[ObjectRef] {
        &self.objects
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.initial.is_none()
    }

    /// Forget the cascade
    pub fn clear(&mut self) {
        self.objects.clear();
        self.initial = None;
    }
}

/// Per-thread destroy pools
#[derive(Debug, Default)]
pub(crate) struct DestroyPools {
    pools: DashMap<ThreadId, DestroyPool>,
}

impl DestroyPools {
    fn key() -> ThreadId {
        thread::current().id()
    }

    pub(crate) fn record(&self, object: ObjectRef) {
        self.pools.entry(Self::key()).or_default().record(object);
    }

    pub(crate) fn contains(&self, object: &ObjectRef) -> bool {
        self.pools
            .get(&Self::key())
            .map(|pool| pool.contains(object))
            .unwrap_or(false)
    }

    pub(crate) fn snapshot(&self) -> DestroyPool {
        self.pools
            .get(&Self::key())
            .map(|pool| pool.clone())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&self) {
        self.pools.remove(&Self::key());
    }

    /// Clear the pool if `object` started the cascade
    pub(crate) fn finish(&self, object: &ObjectRef) -> bool {
        self.pools
            .remove_if(&Self::key(), |_, pool| pool.initial() == Some(object))
            .is_some()
    }
}
