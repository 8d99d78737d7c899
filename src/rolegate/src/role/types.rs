/// Role model: scopes, roles, grants and signatures
///
/// A role is named with a sigil that matches its scope:
/// - `$name` for global roles
/// - `@@name` for class roles
/// - `@name` for instance roles

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::entity::{ObjectRef, PrincipalRef};
use crate::inflect;

/// Result type for role operations
pub type RoleResult<T> = Result<T, RoleError>;

/// Role-model violations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
    /// Role name is empty
    #[error("Role name can't be blank")]
    EmptyName,

    /// Role name shorter than 3 or longer than 25 characters
    #[error("Role name `{0}` must be between 3 and 25 characters")]
    InvalidLength(String),

    /// Role name uses characters outside `[a-z0-9_@$]`
    #[error("Invalid characters in role name `{0}`")]
    InvalidCharacters(String),

    /// Sigil does not agree with the scope
    #[error("{expected} role name must begin with {sigil}: `{name}`")]
    SigilMismatch {
        /// Offending name
        name: String,
        /// Scope the role was created with
        expected: ScopeKind,
        /// Sigil that scope requires
        sigil: &'static str,
    },

    /// Instance scope without a securable type, or similar
    #[error("Invalid role scope: {0}")]
    InvalidScope(String),

    /// A role with this name already exists in the scope
    #[error("Role `{name}` already exists on {scope}")]
    DuplicateRole {
        /// Role name
        name: String,
        /// Scope description
        scope: String,
    },

    /// The grantee already holds the role
    #[error("Cannot grant same role: `{role}` is already granted to {grantee}")]
    DuplicateGrant {
        /// Role name
        role: String,
        /// Grantee description
        grantee: String,
    },

    /// No role with this id
    #[error("Unknown role id {0}")]
    UnknownRole(u64),

    /// Signature could not be parsed
    #[error("Invalid role signature `{0}`")]
    InvalidSignature(String),
}

/// Scope discriminator, implied by a role name's sigil
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// Every object of every type
    Global,
    /// Every object of one type
    Class,
    /// One object
    Instance,
}

impl ScopeKind {
    /// Sigil role names of this scope start with
    pub fn sigil(&self) -> &'static str {
        match self {
            Self::Global => "$",
            Self::Class => "@@",
            Self::Instance => "@",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "Global"),
            Self::Class => write!(f, "Class"),
            Self::Instance => write!(f, "Instance"),
        }
    }
}

/// What a role is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum RoleScope {
    /// No securable
    Global,
    /// All instances of a type
    Class {
        /// Securable type name
        securable_type: String,
    },
    /// A single object
    Instance {
        /// Securable type name
        securable_type: String,
        /// Securable id
        securable_id: String,
    },
}

impl RoleScope {
    /// Class scope on `securable_type`
    pub fn class(securable_type: impl Into<String>) -> Self {
        Self::Class {
            securable_type: securable_type.into(),
        }
    }

    /// Instance scope on one object
    pub fn instance(securable_type: impl Into<String>, securable_id: impl Into<String>) -> Self {
        Self::Instance {
            securable_type: securable_type.into(),
            securable_id: securable_id.into(),
        }
    }

    /// Instance scope on a persisted object
    pub fn on(object: &ObjectRef) -> RoleResult<Self> {
        match &object.id {
            Some(id) => Ok(Self::instance(object.type_name.clone(), id.clone())),
            None => Err(RoleError::InvalidScope(format!(
                "{object} has no id to scope a role on"
            ))),
        }
    }

    /// Build a scope from stored columns, where `""` is the empty sentinel
    /// for both type and id.
    pub fn from_parts(securable_type: &str, securable_id: &str) -> RoleResult<Self> {
        match (securable_type.is_empty(), securable_id.is_empty()) {
            (true, true) => Ok(Self::Global),
            (false, true) => Ok(Self::class(securable_type)),
            (false, false) => Ok(Self::instance(securable_type, securable_id)),
            (true, false) => Err(RoleError::InvalidScope(format!(
                "securable id `{securable_id}` without a securable type"
            ))),
        }
    }

    /// Scope discriminator
    pub fn kind(&self) -> ScopeKind {
        match self {
            Self::Global => ScopeKind::Global,
            Self::Class { .. } => ScopeKind::Class,
            Self::Instance { .. } => ScopeKind::Instance,
        }
    }

    /// Securable type, empty for global scope
    pub fn securable_type(&self) -> &str {
        match self {
            Self::Global => "",
            Self::Class { securable_type } | Self::Instance { securable_type, .. } => {
                securable_type
            }
        }
    }

    /// Securable id, empty unless instance scope
    pub fn securable_id(&self) -> &str {
        match self {
            Self::Instance { securable_id, .. } => securable_id,
            _ => "",
        }
    }

    /// Whether a role with this scope applies to `object`.
    ///
    /// Global applies everywhere. Class applies when the type matches the
    /// object's type or base type. Instance additionally needs the exact id,
    /// so it never applies to an unsaved object.
    pub fn applies_to(&self, object: &ObjectRef) -> bool {
        match self {
            Self::Global => true,
            Self::Class { securable_type } => type_matches(securable_type, object),
            Self::Instance {
                securable_type,
                securable_id,
            } => {
                object.id.as_deref() == Some(securable_id.as_str())
                    && type_matches(securable_type, object)
            }
        }
    }

    /// Whether a role with this scope applies to a type as a whole
    pub fn applies_to_class(&self, type_name: &str, base_type: &str) -> bool {
        match self {
            Self::Global => true,
            Self::Class { securable_type } => {
                securable_type == type_name || securable_type == base_type
            }
            Self::Instance { .. } => false,
        }
    }
}

fn type_matches(securable_type: &str, object: &ObjectRef) -> bool {
    securable_type == object.type_name || securable_type == object.base_type
}

impl fmt::Display for RoleScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global scope"),
            Self::Class { securable_type } => write!(f, "all {}", inflect::pluralize(securable_type)),
            Self::Instance {
                securable_type,
                securable_id,
            } => write!(
                f,
                "instance {} of {}",
                securable_id,
                inflect::pluralize(securable_type)
            ),
        }
    }
}

/// Unique role identifier, assigned by the role store
pub type RoleId = u64;

/// A named role attached to a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Store-assigned id; 0 until stored
    #[serde(default)]
    pub id: RoleId,

    /// Role name including its sigil
    pub name: String,

    /// What the role is attached to
    #[serde(flatten)]
    pub scope: RoleScope,
}

impl Role {
    /// Validate and build an unsaved role
    pub fn new(name: impl Into<String>, scope: RoleScope) -> RoleResult<Self> {
        let name = name.into();
        validate_name(&name, scope.kind())?;
        Ok(Self { id: 0, name, scope })
    }

    /// Global role
    pub fn global(name: impl Into<String>) -> RoleResult<Self> {
        Self::new(name, RoleScope::Global)
    }

    /// Class role on `securable_type`
    pub fn class(name: impl Into<String>, securable_type: impl Into<String>) -> RoleResult<Self> {
        Self::new(name, RoleScope::class(securable_type))
    }

    /// Instance role on a persisted object
    pub fn instance(name: impl Into<String>, object: &ObjectRef) -> RoleResult<Self> {
        Self::new(name, RoleScope::on(object)?)
    }

    /// Scope discriminator
    pub fn kind(&self) -> ScopeKind {
        self.scope.kind()
    }

    /// Whether the role applies to `object`
    pub fn applies_to(&self, object: &ObjectRef) -> bool {
        self.scope.applies_to(object)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            RoleScope::Global => write!(f, "GLOBAL ROLE {}", self.name),
            RoleScope::Class { .. } => write!(f, "CLASS ROLE {} on {}", self.name, self.scope),
            RoleScope::Instance { .. } => write!(f, "INSTANCE ROLE {} on {}", self.name, self.scope),
        }
    }
}

/// Validate a role name against the naming rules and its scope's sigil
pub fn validate_name(name: &str, kind: ScopeKind) -> RoleResult<()> {
    if name.is_empty() {
        return Err(RoleError::EmptyName);
    }
    let len = name.chars().count();
    if !(3..=25).contains(&len) {
        return Err(RoleError::InvalidLength(name.to_string()));
    }
    let legal = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '@' | '$');
    if !name.chars().all(legal) {
        return Err(RoleError::InvalidCharacters(name.to_string()));
    }

    let sigil_ok = match kind {
        ScopeKind::Global => name.starts_with('$'),
        ScopeKind::Class => name.starts_with("@@"),
        ScopeKind::Instance => name.starts_with('@') && !name.starts_with("@@"),
    };
    if !sigil_ok {
        return Err(RoleError::SigilMismatch {
            name: name.to_string(),
            expected: kind,
            sigil: kind.sigil(),
        });
    }
    Ok(())
}

/// Principal (user or group) a role is granted to
pub type Grantee = PrincipalRef;

/// A role held by a grantee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Granted role
    pub role: Role,
    /// Holder
    pub grantee: Grantee,
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Granted {} to {} {}",
            self.role, self.grantee.kind, self.grantee.id
        )
    }
}

/// Parsed role signature.
///
/// - `name` → global role `$name`
/// - `Type:name` → class role `@@name` on `Type`
/// - `Type/securable:name` → instance role `@name` on the `Type` named `securable`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSignature {
    /// Role name with sigil
    pub name: String,
    /// Securable type, absent for global roles
    pub securable_type: Option<String>,
    /// Securable name, present for instance roles
    pub securable_name: Option<String>,
}

impl RoleSignature {
    /// Parse a signature, splitting at the first `/` and the last `:`
    pub fn parse(token: &str) -> RoleResult<Self> {
        let colon = token.rfind(':');
        let slash = token.find('/');
        let invalid = || RoleError::InvalidSignature(token.to_string());

        match (slash, colon) {
            (None, None) => Ok(Self {
                name: format!("${token}"),
                securable_type: None,
                securable_name: None,
            }),
            (None, Some(colon)) => Ok(Self {
                name: format!("@@{}", &token[colon + 1..]),
                securable_type: Some(token[..colon].to_string()),
                securable_name: None,
            }),
            (Some(slash), Some(colon)) if slash < colon => Ok(Self {
                name: format!("@{}", &token[colon + 1..]),
                securable_type: Some(token[..slash].to_string()),
                securable_name: Some(token[slash + 1..colon].to_string()),
            }),
            _ => Err(invalid()),
        }
    }

    /// Scope kind implied by the signature
    pub fn kind(&self) -> ScopeKind {
        match (&self.securable_type, &self.securable_name) {
            (None, _) => ScopeKind::Global,
            (Some(_), None) => ScopeKind::Class,
            (Some(_), Some(_)) => ScopeKind::Instance,
        }
    }
}
