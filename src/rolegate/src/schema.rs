//! Entity type registry
//!
//! The engine needs a little static knowledge about host types: which types
//! are securable entities at all, their base type, and which owning
//! (`belongs_to`) associations they declare. The join-table fallback and
//! `of_class` delegation both build type-only instances from it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entity::{ObjectRef, TransientEntity};

/// Owning association of an entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    /// Accessor name (`server`)
    pub name: String,

    /// Type the association points to; empty for polymorphic associations
    #[serde(default)]
    pub target_type: String,

    /// Whether the target type varies per row
    #[serde(default)]
    pub polymorphic: bool,
}

/// Static description of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    /// Type name (`ServerItem`)
    pub name: String,

    /// Root of the type hierarchy, if different from `name`
    #[serde(default)]
    pub base_type: Option<String>,

    /// Owning associations, in declaration order
    #[serde(default)]
    pub belongs_to: Vec<Association>,

    /// Other accessors the type exposes
    #[serde(default)]
    pub members: Vec<String>,
}

impl EntityType {
    /// Describe a type with no associations
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_type: None,
            belongs_to: Vec::new(),
            members: Vec::new(),
        }
    }

    /// Set the base type
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = Some(base_type.into());
        self
    }

    /// Declare an owning association
    pub fn belongs_to(mut self, name: impl Into<String>, target_type: impl Into<String>) -> Self {
        self.belongs_to.push(Association {
            name: name.into(),
            target_type: target_type.into(),
            polymorphic: false,
        });
        self
    }

    /// Declare a polymorphic owning association
    pub fn belongs_to_polymorphic(mut self, name: impl Into<String>) -> Self {
        self.belongs_to.push(Association {
            name: name.into(),
            target_type: String::new(),
            polymorphic: true,
        });
        self
    }

    /// Declare plain accessors
    pub fn with_members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    /// Base type, falling back to the type itself
    pub fn base(&self) -> &str {
        self.base_type.as_deref().unwrap_or(&self.name)
    }
}

/// Registry of securable entity types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    types: IndexMap<String, EntityType>,
}

impl Schema {
    /// Empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a type
    pub fn register(&mut self, entity_type: EntityType) -> &mut Self {
        self.types.insert(entity_type.name.clone(), entity_type);
        self
    }

    /// Builder-style registration
    pub fn with(mut self, entity_type: EntityType) -> Self {
        self.register(entity_type);
        self
    }

    /// Look up a type by name
    pub fn get(&self, type_name: &str) -> Option<&EntityType> {
        self.types.get(type_name)
    }

    /// Whether `type_name` is a registered entity type
    pub fn is_entity(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// A new, unsaved instance of `type_name`: every declared accessor
    /// resolves to `Nil` and scope matching sees no id.
    pub fn transient(&self, type_name: &str) -> TransientEntity {
        match self.get(type_name) {
            Some(ty) => {
                let object = ObjectRef::transient(ty.name.clone()).with_base_type(ty.base());
                let members = ty
                    .belongs_to
                    .iter()
                    .map(|a| a.name.clone())
                    .chain(ty.members.iter().cloned());
                TransientEntity::new(object).with_members(members)
            }
            None => TransientEntity::new(ObjectRef::transient(type_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Value};

    #[test]
    fn test_transient_uses_registered_base_type() {
        let schema = Schema::new().with(
            EntityType::new("Laptop")
                .with_base_type("Device")
                .belongs_to("owner", "User"),
        );

        let laptop = schema.transient("Laptop");
        let object = laptop.object_ref();
        assert_eq!(object.base_type, "Device");
        assert!(object.id.is_none());
        assert!(matches!(laptop.member("owner"), Some(Value::Nil)));
    }

    #[test]
    fn test_unknown_type_is_not_an_entity() {
        let schema = Schema::new().with(EntityType::new("Server"));
        assert!(schema.is_entity("Server"));
        assert!(!schema.is_entity("String"));
        assert_eq!(schema.transient("Widget").object_ref().type_name, "Widget");
    }
}
