/// Role model and role store
///
/// Roles carry a scope (global, class or instance) and a sigil-prefixed
/// name. The engine asks a [`RoleStore`] which roles apply to an object and
/// which a principal holds.
///
/// # Examples
///
/// ```
/// use rolegate::entity::{ObjectRef, Principal};
/// use rolegate::role::{InMemoryRoleStore, RoleScope, RoleStore};
///
/// let store = InMemoryRoleStore::new();
/// let manager = store.create_role("@@manager", RoleScope::class("Server")).unwrap();
/// let alice = Principal::new("1");
/// store.grant_to(&manager, &alice).unwrap();
///
/// let server = ObjectRef::new("Server", "7");
/// assert!(store.holds_applicable(&alice, &server, "@@manager"));
/// ```

mod store;
mod types;


pub use store::{InMemoryRoleStore, RoleStore, GROUP_KIND};
pub use types::{
    validate_name, Grant, Grantee, Role, RoleError, RoleId, RoleResult, RoleScope, RoleSignature,
    ScopeKind,
};
