//! Host object model capability
//!
//! The engine never reflects on host objects. Hosts expose their domain
//! objects through [`Entity`], which answers identity questions and resolves
//! named, argument-free accessors to a [`Value`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::inflect;

/// Identity of a securable object: runtime type, base type and (for
/// persisted objects) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Runtime type name (e.g. "ServerItem")
    pub type_name: String,

    /// Root of the type hierarchy; equal to `type_name` for unrelated types
    pub base_type: String,

    /// Object id, `None` for objects that are not persisted yet
    pub id: Option<String>,
}

impl ObjectRef {
    /// Reference to a persisted object
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            base_type: type_name.clone(),
            type_name,
            id: Some(id.into()),
        }
    }

    /// Reference to a new (not yet persisted) object
    pub fn transient(type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            base_type: type_name.clone(),
            type_name,
            id: None,
        }
    }

    /// Set the base type for objects that belong to a type hierarchy
    pub fn with_base_type(mut self, base_type: impl Into<String>) -> Self {
        self.base_type = base_type.into();
        self
    }

    /// Whether the object has been persisted
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Resource name used to look up rules (`ServerItem` → `server_items`)
    pub fn resource_name(&self) -> String {
        inflect::tableize(&self.type_name)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}[{}]", self.type_name, id),
            None => write!(f, "a new {}", self.type_name),
        }
    }
}

/// Value produced by resolving an accessor on an entity
#[derive(Clone)]
pub enum Value {
    /// Absent association or attribute
    Nil,

    /// Related domain object
    Entity(Arc<dyn Entity>),

    /// Collection of values (has-many association, member list)
    Collection(Vec<Value>),

    /// A principal reference (users held directly in member lists)
    Principal(PrincipalRef),

    /// Scalar text (type names, attribute values)
    Text(String),

    /// Scalar flag
    Bool(bool),
}

impl Value {
    /// Whether the value is absent
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// The referenced entity, if this value is one
    pub fn as_entity(&self) -> Option<&Arc<dyn Entity>> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    /// Text form used when the value names a type
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether `principal` is this value or is contained in it
    pub fn includes(&self, principal: &Principal) -> bool {
        match self {
            Self::Collection(items) => items.iter().any(|item| item.is_principal(principal)),
            other => other.is_principal(principal),
        }
    }

    fn is_principal(&self, principal: &Principal) -> bool {
        match self {
            Self::Principal(p) => *p == principal.reference(),
            Self::Entity(e) => e.object_ref() == principal.object_ref(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "Nil"),
            Self::Entity(e) => write!(f, "Entity({})", e.object_ref()),
            Self::Collection(items) => f.debug_list().entries(items).finish(),
            Self::Principal(p) => write!(f, "Principal({}:{})", p.kind, p.id),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Bool(b) => write!(f, "Bool({b})"),
        }
    }
}

impl From<Arc<dyn Entity>> for Value {
    fn from(entity: Arc<dyn Entity>) -> Self {
        Self::Entity(entity)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Nil)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A domain object the engine can secure.
///
/// `member` returns `None` when the type has no accessor of that name; an
/// accessor that exists but holds nothing returns `Some(Value::Nil)`. The
/// distinction lets misconfigured rules fail loudly instead of denying.
pub trait Entity: Send + Sync {
    /// Identity (type, base type, id)
    fn object_ref(&self) -> ObjectRef;

    /// Resolve an argument-free accessor by name
    fn member(&self, name: &str) -> Option<Value>;

    /// Attributes modified since the object was loaded
    fn changed_attributes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Kind + id identifying a principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalRef {
    /// Principal kind ("User", "Group", "Service")
    pub kind: String,

    /// Principal identifier
    pub id: String,
}

/// The acting user or agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier
    pub id: String,

    /// Principal kind, "User" unless stated otherwise
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Display name used in diagnostics
    #[serde(default)]
    pub name: Option<String>,

    /// Groups the principal belongs to; their grants count as held
    #[serde(default)]
    pub group_ids: Vec<String>,
}

fn default_kind() -> String {
    "User".to_string()
}

impl Principal {
    /// Create a user principal
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_kind(),
            name: None,
            group_ids: Vec::new(),
        }
    }

    /// Set the principal kind
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a group membership
    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_ids.push(group_id.into());
        self
    }

    /// Kind + id reference
    pub fn reference(&self) -> PrincipalRef {
        PrincipalRef {
            kind: self.kind.clone(),
            id: self.id.clone(),
        }
    }

    /// The principal seen as a securable object of its kind
    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.kind.clone(), self.id.clone())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {}", self.kind, name),
            None => write!(f, "{} {}", self.kind, self.id),
        }
    }
}

/// A type-only stand-in used when a rule needs "an instance of type T"
/// for scope matching (`of_class` delegation, join-table fallback).
/// Every declared member resolves to `Nil`.
#[derive(Debug, Clone)]
pub struct TransientEntity {
    object: ObjectRef,
    members: Vec<String>,
}

impl TransientEntity {
    /// Transient instance of `type_name` with no members
    pub fn new(object: ObjectRef) -> Self {
        Self {
            object,
            members: Vec::new(),
        }
    }

    /// Declare members that exist (and resolve to `Nil`)
    pub fn with_members(mut self, members: impl IntoIterator<Item = String>) -> Self {
        self.members.extend(members);
        self
    }
}

impl Entity for TransientEntity {
    fn object_ref(&self) -> ObjectRef {
        self.object.clone()
    }

    fn member(&self, name: &str) -> Option<Value> {
        self.members.iter().any(|m| m == name).then_some(Value::Nil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new("Server", "7").to_string(), "Server[7]");
        assert_eq!(ObjectRef::transient("Server").to_string(), "a new Server");
    }

    #[test]
    fn test_resource_name() {
        assert_eq!(ObjectRef::new("ServerItem", "1").resource_name(), "server_items");
    }

    #[test]
    fn test_collection_membership() {
        let alice = Principal::new("1");
        let bob = Principal::new("2");
        let members = Value::Collection(vec![Value::Principal(alice.reference())]);

        assert!(members.includes(&alice));
        assert!(!members.includes(&bob));
        assert!(!Value::Nil.includes(&alice));
    }

    #[test]
    fn test_transient_members_resolve_to_nil() {
        let transient = TransientEntity::new(ObjectRef::transient("Server"))
            .with_members(vec!["owner".to_string()]);

        assert!(matches!(transient.member("owner"), Some(Value::Nil)));
        assert!(transient.member("missing").is_none());
    }
}
