//! Association paths used by delegation and condition options
//!
//! A path is either a single accessor (`owner`) or a chain of accessors
//! (`server_item => owner`). Each hop is resolved through
//! [`Entity::member`], never by reflection.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

use crate::entity::{Entity, Value};
use crate::error::{AclError, Result};

/// Chain of argument-free accessors, resolved left to right
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccessPath {
    /// Final accessor
    Leaf(String),
    /// Accessor followed by the rest of the path
    Chain(String, Box<AccessPath>),
}

impl AccessPath {
    /// Single-hop path
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    /// Multi-hop path from its segments; `None` when `segments` is empty
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        let (last, init) = segments.split_last()?;
        let mut path = Self::leaf(last.as_ref());
        for segment in init.iter().rev() {
            path = Self::Chain(segment.as_ref().to_string(), Box::new(path));
        }
        Some(path)
    }

    /// First accessor of the path
    pub fn head(&self) -> &str {
        match self {
            Self::Leaf(name) | Self::Chain(name, _) => name,
        }
    }

    /// All accessors in traversal order
    pub fn segments(&self) -> Vec<&str> {
        let mut out = vec![self.head()];
        let mut current = self;
        while let Self::Chain(_, rest) = current {
            out.push(rest.head());
            current = rest;
        }
        out
    }

    /// Resolve the path starting at `entity`.
    ///
    /// Only the last hop may yield `Nil`. Stepping through `Nil` or a
    /// scalar, or naming an accessor the current object does not have, is
    /// an [`AclError::MissingAssociation`].
    pub fn resolve(&self, entity: &dyn Entity) -> Result<Value> {
        let value = entity
            .member(self.head())
            .ok_or_else(|| AclError::missing(entity.object_ref().type_name, self.head()))?;

        let rest = match self {
            Self::Leaf(_) => return Ok(value),
            Self::Chain(_, rest) => rest,
        };

        match value {
            Value::Entity(next) => rest.resolve(next.as_ref()),
            other => Err(AclError::missing(value_kind(&other), rest.head())),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Nil => "nil",
        Value::Entity(_) => "entity",
        Value::Collection(_) => "collection",
        Value::Principal(_) => "principal",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments().join("."))
    }
}

// Serialized the way it is written in policy text: `"owner"` or
// `{"server_item": "owner"}`.
impl Serialize for AccessPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(name) => serializer.serialize_str(name),
            Self::Chain(name, rest) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, rest.as_ref())?;
                map.end()
            }
        }
    }
}
