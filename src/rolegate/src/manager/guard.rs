//! Scoped authorization bypass
//!
//! Guards count per thread: a bulk job that disables checks on one thread
//! leaves requests handled by other threads checked as usual.

use dashmap::DashMap;
use std::thread::{self, ThreadId};
use tracing::warn;

use super::Manager;

/// Live guard count per thread
#[derive(Debug, Default)]
pub(crate) struct BypassDepths {
    depths: DashMap<ThreadId, usize>,
}

impl BypassDepths {
    /// Returns whether this is the thread's first live guard
    fn enter(&self, thread: ThreadId) -> bool {
        let mut depth = self.depths.entry(thread).or_insert(0);
        *depth += 1;
        *depth == 1
    }

    /// Returns whether the thread's last live guard was released
    fn leave(&self, thread: ThreadId) -> bool {
        self.depths
            .remove_if_mut(&thread, |_, depth| {
                *depth = depth.saturating_sub(1);
                *depth == 0
            })
            .is_some()
    }

    /// Whether the calling thread holds a live guard
    pub(crate) fn is_active(&self) -> bool {
        self.depths
            .get(&thread::current().id())
            .map(|depth| *depth > 0)
            .unwrap_or(false)
    }
}

/// Keeps authorization checks bypassed on the acquiring thread while alive.
///
/// Guards nest: checks resume only when the last live guard is released.
/// Dropping the guard (including during unwinding) releases it.
#[must_use = "authorization is re-enabled as soon as the guard is dropped"]
pub struct DisableGuard<'a> {
    manager: &'a Manager,
    thread: ThreadId,
}

impl<'a> DisableGuard<'a> {
    pub(super) fn acquire(manager: &'a Manager) -> Self {
        let thread = thread::current().id();
        if manager.bypass.enter(thread) {
            warn!(thread = ?thread, "ACL manager is disabled - skipping authorization checks");
        }
        Self { manager, thread }
    }

    /// Release the guard now
    pub fn enable(self) {
        drop(self);
    }
}

impl Drop for DisableGuard<'_> {
    fn drop(&mut self) {
        if self.manager.bypass.leave(self.thread) {
            warn!(thread = ?self.thread, "ACL manager is enabled");
        }
    }
}

impl std::fmt::Debug for DisableGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisableGuard")
            .field("thread", &self.thread)
            .finish_non_exhaustive()
    }
}
