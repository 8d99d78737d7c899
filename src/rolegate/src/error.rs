//! Error types for the access-control engine

use thiserror::Error;

use crate::reader::DslError;
use crate::role::RoleError;

/// Access-control engine errors
#[derive(Debug, Error)]
pub enum AclError {
    /// Policy configuration is malformed
    #[error(transparent)]
    Dsl(#[from] DslError),

    /// Role or grant violates the role model
    #[error(transparent)]
    Role(#[from] RoleError),

    /// Action (or target type) the engine does not model
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// A delegation, membership or nil-check path names an accessor
    /// the entity does not have
    #[error("Undefined member `{member}` on {type_name}")]
    MissingAssociation {
        /// Runtime type the lookup was made on
        type_name: String,
        /// Accessor that does not exist
        member: String,
    },

    /// The principal is not permitted to perform the action
    #[error("{0}")]
    Denied(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AclError {
    /// Returns true for the ordinary "not permitted" outcome, as opposed to
    /// configuration or traversal failures.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    pub(crate) fn missing(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MissingAssociation {
            type_name: type_name.into(),
            member: member.into(),
        }
    }
}

/// Result type for access-control operations
pub type Result<T> = std::result::Result<T, AclError>;
