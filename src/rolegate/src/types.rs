//! Core access-control types
//!
//! Names are validated once, when a policy is compiled or a request is
//! parsed, so the decision engine never re-checks string shapes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AclError;
use crate::inflect;
use crate::reader::DslError;
use crate::role::ScopeKind;

/// Mutating action checked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Persisting a new object
    Create,
    /// Changing attributes of a persisted object
    Update,
    /// Destroying an object
    Delete,
    /// Attaching an associated resource
    Add,
    /// Detaching an associated resource
    Remove,
}

impl Action {
    /// All actions, in table order
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::Add,
        Action::Remove,
    ];

    /// Lower-case action name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" | "destroy" => Ok(Self::Delete),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            other => Err(AclError::UnsupportedAction(format!(
                "action `{other}` is not supported"
            ))),
        }
    }
}

/// Name of a role as used in rules: `all`, `$global`, `@@class` or `@instance`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// The pseudo-role every logged-in principal holds
    pub const ALL: &'static str = "all";

    /// Parse a rule role name, rejecting anything without a sigil
    pub fn parse(name: &str) -> Result<Self, DslError> {
        let name = name.trim();
        if name == Self::ALL || scope_of(name).is_some() {
            Ok(Self(name.to_string()))
        } else {
            Err(DslError::InvalidRoleName(name.to_string()))
        }
    }

    /// Whether this is the `all` pseudo-role
    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL
    }

    /// Scope implied by the sigil; `None` for `all`
    pub fn scope_kind(&self) -> Option<ScopeKind> {
        scope_of(&self.0)
    }

    /// Borrow the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sigil shape check: `$x`, `@@x`, `@x` with `x` made of `[a-z0-9_]`.
pub(crate) fn scope_of(name: &str) -> Option<ScopeKind> {
    let (kind, rest) = if let Some(rest) = name.strip_prefix('$') {
        (ScopeKind::Global, rest)
    } else if let Some(rest) = name.strip_prefix("@@") {
        (ScopeKind::Class, rest)
    } else if let Some(rest) = name.strip_prefix('@') {
        (ScopeKind::Instance, rest)
    } else {
        return None;
    };

    let valid = !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    valid.then_some(kind)
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoleName {
    type Error = DslError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plural, lower-case resource name (`servers`, `server_items`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceName(String);

impl ResourceName {
    /// Parse a declared resource name; singular names are rejected
    pub fn parse(name: &str) -> Result<Self, DslError> {
        let normalized = name.trim().to_ascii_lowercase();
        if normalized.is_empty() || !inflect::is_plural(&normalized) {
            return Err(DslError::NotPlural(name.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Resource name for an entity type (`ServerItem` → `server_items`)
    pub fn for_type(type_name: &str) -> Self {
        Self(inflect::tableize(type_name))
    }

    /// Borrow the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ResourceName {
    type Error = DslError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceName> for String {
    fn from(name: ResourceName) -> Self {
        name.0
    }
}

impl std::borrow::Borrow<str> for ResourceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
