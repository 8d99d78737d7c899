//! Persistence lifecycle integration
//!
//! A storage layer calls these around its writes: `before_*` refuse the
//! operation with [`AclError::Denied`], `after_delete` ends a cascade.

use std::sync::Arc;
use tracing::debug;

use crate::entity::{Entity, Principal};
use crate::error::Result;
use crate::manager::Manager;
use crate::types::Action;

/// Lifecycle checks bound to one manager
#[derive(Debug, Clone)]
pub struct Lifecycle {
    manager: Arc<Manager>,
}

impl Lifecycle {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Check before inserting a new record
    pub fn before_create(&self, principal: Option<&Principal>, object: &dyn Entity) -> Result<()> {
        self.manager.authorize(principal, object, Action::Create, &[])
    }

    /// Check before saving changes; the changed attributes come from the object
    pub fn before_update(&self, principal: Option<&Principal>, object: &dyn Entity) -> Result<()> {
        let changed = object.changed_attributes();
        let changed: Vec<&str> = changed.iter().map(String::as_str).collect();
        self.manager.authorize(principal, object, Action::Update, &changed)
    }

    /// Check before deleting; records the object in the destroy pool
    pub fn before_delete(&self, principal: Option<&Principal>, object: &dyn Entity) -> Result<()> {
        self.manager.authorize(principal, object, Action::Delete, &[])
    }

    /// Call once the delete has happened
    pub fn after_delete(&self, object: &dyn Entity) {
        let reference = object.object_ref();
        if self.manager.finish_delete(&reference) {
            debug!(object = %reference, "Delete cascade complete");
        }
    }

    /// Non-raising check for UI decisions ("show the edit button?").
    /// Errors count as not allowed.
    pub fn is_allowed(
        &self,
        principal: Option<&Principal>,
        object: &dyn Entity,
        action: Action,
        changed: &[&str],
    ) -> bool {
        self.manager
            .permit(principal, object, action, changed)
            .unwrap_or(false)
    }
}
