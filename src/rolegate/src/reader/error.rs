//! Policy compilation errors

use thiserror::Error;

/// Result type for policy compilation
pub type DslResult<T> = Result<T, DslError>;

/// Malformed policy configuration.
///
/// Every failure of the reader is reported as a `DslError`; lexer and parser
/// failures become [`DslError::Syntax`] with the offending position.
#[derive(Debug, Error)]
pub enum DslError {
    /// A resource was secured twice
    #[error("Can't define authorization rules on resource `{0}` twice")]
    DuplicateResource(String),

    /// `secure` target is singular
    #[error("Resource name `{0}` must be plural")]
    NotPlural(String),

    /// `only` (or a column/resource name list) is not a list
    #[error("`only` must be a list of names")]
    OnlyNotSequence,

    /// Delegation or condition path is neither a name nor a single-key mapping
    #[error("Invalid delegation for `{0}`: expected a name or a single-key mapping")]
    InvalidDelegation(String),

    /// Universal rule declared after a `secure` block
    #[error("Can't declare universal rules after a secure block")]
    UniversalAfterSecure,

    /// `resource` without exactly one of `addable_by` / `removable_by`
    #[error("Invalid resource ACL: {0}")]
    InvalidResourceAcl(String),

    /// `column` without exactly `updatable_by`
    #[error("Invalid column ACL: {0}")]
    InvalidColumnAcl(String),

    /// Role name without a valid sigil
    #[error("Invalid role name `{0}`")]
    InvalidRoleName(String),

    /// Declaration the policy language does not define
    #[error("Unknown declaration `{0}`")]
    UnknownDeclaration(String),

    /// Resource-only declaration used outside a `secure` block
    #[error("`{0}` may only appear inside a secure block")]
    OutsideResource(String),

    /// `secure` opened inside another `secure` block
    #[error("Can't nest secure blocks (`{0}`)")]
    NestedSecure(String),

    /// Declaration called with arguments of the wrong shape
    #[error("Invalid arguments to `{declaration}`: {message}")]
    InvalidArguments {
        /// Declaration name
        declaration: String,
        /// What was wrong
        message: String,
    },

    /// Text could not be tokenized or parsed
    #[error("Illegal policy syntax at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Parser message
        message: String,
    },

    /// Policy file could not be read
    #[error("Cannot read policy: {0}")]
    Io(#[from] std::io::Error),
}

impl DslError {
    pub(crate) fn args(declaration: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            declaration: declaration.to_string(),
            message: message.into(),
        }
    }
}
