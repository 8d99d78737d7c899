//! Shared fixtures for integration tests

#![allow(dead_code)]

use rolegate::entity::{Entity, ObjectRef, Principal, Value};
use rolegate::manager::Manager;
use rolegate::role::{InMemoryRoleStore, Role, RoleScope, RoleStore};
use rolegate::schema::{EntityType, Schema};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory domain object with named members and dirty attributes
#[derive(Clone)]
pub struct Record {
    object: ObjectRef,
    members: HashMap<String, Value>,
    changed: Vec<String>,
}

impl Record {
    /// Persisted record
    pub fn new(type_name: &str, id: &str) -> Self {
        Self {
            object: ObjectRef::new(type_name, id),
            members: HashMap::new(),
            changed: Vec::new(),
        }
    }

    /// Record that has not been saved yet
    pub fn unsaved(type_name: &str) -> Self {
        Self {
            object: ObjectRef::transient(type_name),
            members: HashMap::new(),
            changed: Vec::new(),
        }
    }

    pub fn base(mut self, base_type: &str) -> Self {
        self.object = self.object.with_base_type(base_type);
        self
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.members.insert(name.to_string(), value.into());
        self
    }

    pub fn with_record(self, name: &str, record: Record) -> Self {
        self.with(name, record.shared())
    }

    pub fn with_nil(self, name: &str) -> Self {
        self.with(name, Value::Nil)
    }

    pub fn with_principals(mut self, name: &str, principals: &[&Principal]) -> Self {
        let items = principals
            .iter()
            .map(|p| Value::Principal(p.reference()))
            .collect();
        self.members.insert(name.to_string(), Value::Collection(items));
        self
    }

    pub fn changed(mut self, attributes: &[&str]) -> Self {
        self.changed = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn shared(self) -> Arc<dyn Entity> {
        Arc::new(self)
    }

    pub fn reference(&self) -> ObjectRef {
        self.object.clone()
    }
}

impl Entity for Record {
    fn object_ref(&self) -> ObjectRef {
        self.object.clone()
    }

    fn member(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    fn changed_attributes(&self) -> Vec<String> {
        self.changed.clone()
    }
}

/// Entity types used across the suites
pub fn schema() -> Schema {
    Schema::new()
        .with(EntityType::new("User").with_members(["name"]))
        .with(EntityType::new("Server").with_members(["name", "ip", "owner"]))
        .with(EntityType::new("ServerItem").belongs_to("server", "Server"))
        .with(
            EntityType::new("Ownership")
                .belongs_to("user", "User")
                .belongs_to("server", "Server"),
        )
        .with(
            EntityType::new("Comment")
                .belongs_to("server", "Server")
                .belongs_to_polymorphic("commentable"),
        )
        .with(EntityType::new("UnderScore"))
        .with(EntityType::new("Laptop").with_base_type("Computer"))
}

/// Store plus a manager compiled from `source`
pub fn setup(source: &str) -> (Arc<Manager>, Arc<InMemoryRoleStore>) {
    let store = Arc::new(InMemoryRoleStore::new());
    let manager = Manager::from_source(source, store.clone(), schema()).unwrap();
    (Arc::new(manager), store)
}

/// Create a role and grant it to `principal`
pub fn grant(store: &InMemoryRoleStore, name: &str, scope: RoleScope, principal: &Principal) -> Role {
    let role = store
        .find_role(name, &scope)
        .unwrap_or_else(|| store.create_role(name, scope).unwrap());
    store.grant_to(&role, principal).unwrap();
    role
}

pub fn user(id: &str) -> Principal {
    Principal::new(id)
}
