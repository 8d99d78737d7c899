//! # Rolegate
//!
//! Role-based access control for domain objects, driven by a declarative
//! policy language.
//!
//! ## Features
//!
//! - **Policy compiler** turning `secure :servers do ... end` text into an
//!   immutable [`RuleSet`]
//! - **Global, class and instance roles** with sigil-checked names
//!   (`$root`, `@@manager`, `@owner`)
//! - **Delegation** of role checks to associated objects or classes
//! - **Attribute restrictions** and membership / nil-check conditions
//! - **Exclusive roles** that lock a record down to its instance roles
//! - **Cascading deletes** through declared dependencies
//! - **Denial diagnostics** listing held and permitted roles
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use rolegate::{Action, Manager, Principal, Schema};
//! use rolegate::entity::{Entity, ObjectRef, Value};
//! use rolegate::role::{InMemoryRoleStore, RoleScope};
//!
//! struct Document(&'static str);
//!
//! impl Entity for Document {
//!     fn object_ref(&self) -> ObjectRef {
//!         ObjectRef::new("Document", self.0)
//!     }
//!     fn member(&self, _name: &str) -> Option<Value> {
//!         None
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemoryRoleStore::new());
//! let editor = store.create_role("@editor", RoleScope::instance("Document", "secret"))?;
//! let alice = Principal::new("alice");
//! store.grant_to(&editor, &alice)?;
//!
//! let manager = Manager::from_source(
//!     "secure :documents do\n  updatable_by :@editor\nend",
//!     store,
//!     Schema::new(),
//! )?;
//!
//! assert!(manager.permit(Some(&alice), &Document("secret"), Action::Update, &["body"])?);
//! assert!(!manager.permit(Some(&alice), &Document("public"), Action::Update, &["body"])?);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod hooks;
pub mod inflect;
pub mod manager;
pub mod path;
pub mod reader;
pub mod role;
pub mod rules;
pub mod schema;
pub mod types;

// Re-export commonly used types
pub use entity::{Entity, ObjectRef, Principal, Value};
pub use error::{AclError, Result};
pub use hooks::Lifecycle;
pub use manager::{DisableGuard, Manager, ManagerConfig};
pub use reader::{compile, DslError, Reader};
pub use role::{InMemoryRoleStore, Role, RoleScope, RoleStore};
pub use rules::RuleSet;
pub use schema::{EntityType, Schema};
pub use types::{Action, ResourceName, RoleName};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
