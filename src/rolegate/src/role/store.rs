/// Role store capability and the in-memory implementation
///
/// The decision engine only reads roles. Persistence layers implement
/// [`RoleStore`]; [`InMemoryRoleStore`] backs tests, the CLI and embedded
/// use.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use super::types::{Grant, Grantee, Role, RoleError, RoleId, RoleResult, RoleScope, RoleSignature};
use crate::entity::{ObjectRef, Principal};

/// Grantee kind whose grants are inherited by member principals
pub const GROUP_KIND: &str = "Group";

/// Read access to roles and grants
pub trait RoleStore: Send + Sync {
    /// Global roles, class roles on the object's type or base type, and
    /// instance roles on the object itself
    fn roles_applicable_to(&self, object: &ObjectRef) -> Vec<Role>;

    /// Global roles and class roles on the type or base type
    fn roles_applicable_to_class(&self, type_name: &str, base_type: &str) -> Vec<Role>;

    /// Roles granted to the principal directly or to any of its groups
    fn roles_held_by(&self, principal: &Principal) -> Vec<Role>;

    /// Role with this name in exactly this scope
    fn find_role(&self, name: &str, scope: &RoleScope) -> Option<Role>;

    /// Grants of one role
    fn grants_of(&self, role: &Role) -> Vec<Grant>;

    /// Role named `name` applicable to `object`, if one exists
    fn find_applicable(&self, object: &ObjectRef, name: &str) -> Option<Role> {
        self.roles_applicable_to(object)
            .into_iter()
            .find(|role| role.name == name)
    }

    /// Whether the principal holds a role named `name` applicable to `object`
    fn holds_applicable(&self, principal: &Principal, object: &ObjectRef, name: &str) -> bool {
        self.roles_held_by(principal)
            .iter()
            .any(|role| role.name == name && role.applies_to(object))
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    roles: Vec<Role>,
    grants: Vec<(RoleId, Grantee)>,
    /// Named securables for signature lookups
    securables: HashMap<(String, String), ObjectRef>,
    next_id: RoleId,
}

impl StoreInner {
    fn role(&self, id: RoleId) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    fn base_type_of(&self, type_name: &str) -> String {
        self.securables
            .values()
            .find(|o| o.type_name == type_name)
            .map(|o| o.base_type.clone())
            .unwrap_or_else(|| type_name.to_string())
    }
}

/// Role store held in memory behind a read-write lock
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryRoleStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a role; `(name, scope)` must be unique
    pub fn create_role(&self, name: &str, scope: RoleScope) -> RoleResult<Role> {
        let mut role = Role::new(name, scope)?;
        let mut inner = self.inner.write();

        if inner
            .roles
            .iter()
            .any(|r| r.name == role.name && r.scope == role.scope)
        {
            return Err(RoleError::DuplicateRole {
                name: role.name,
                scope: role.scope.to_string(),
            });
        }

        inner.next_id += 1;
        role.id = inner.next_id;
        inner.roles.push(role.clone());
        debug!(role = %role, "Created role");
        Ok(role)
    }

    /// Grant a stored role; `(role, grantee)` must be unique
    pub fn grant(&self, role: &Role, grantee: Grantee) -> RoleResult<Grant> {
        let mut inner = self.inner.write();
        let stored = inner.role(role.id).cloned().ok_or(RoleError::UnknownRole(role.id))?;

        if inner
            .grants
            .iter()
            .any(|(id, g)| *id == stored.id && *g == grantee)
        {
            return Err(RoleError::DuplicateGrant {
                role: stored.name,
                grantee: format!("{} {}", grantee.kind, grantee.id),
            });
        }

        inner.grants.push((stored.id, grantee.clone()));
        let grant = Grant {
            role: stored,
            grantee,
        };
        debug!(grant = %grant, "Granted role");
        Ok(grant)
    }

    /// Grant a stored role to a principal
    pub fn grant_to(&self, role: &Role, principal: &Principal) -> RoleResult<Grant> {
        self.grant(role, principal.reference())
    }

    /// Grant a stored role to a group
    pub fn grant_to_group(&self, role: &Role, group_id: impl Into<String>) -> RoleResult<Grant> {
        self.grant(
            role,
            Grantee {
                kind: GROUP_KIND.to_string(),
                id: group_id.into(),
            },
        )
    }

    /// Withdraw a grant; returns whether it existed
    pub fn revoke(&self, role: &Role, grantee: &Grantee) -> bool {
        let mut inner = self.inner.write();
        let before = inner.grants.len();
        inner
            .grants
            .retain(|(id, g)| !(*id == role.id && g == grantee));
        before != inner.grants.len()
    }

    /// Delete a role and its grants; returns whether it existed
    pub fn delete_role(&self, role: &Role) -> bool {
        let mut inner = self.inner.write();
        let before = inner.roles.len();
        inner.roles.retain(|r| r.id != role.id);
        inner.grants.retain(|(id, _)| *id != role.id);
        before != inner.roles.len()
    }

    /// All stored roles
    pub fn roles(&self) -> Vec<Role> {
        self.inner.read().roles.clone()
    }

    /// Make a persisted object findable by `(type, name)` for signatures
    pub fn register_securable(&self, name: impl Into<String>, object: ObjectRef) {
        let key = (object.type_name.clone(), name.into());
        self.inner.write().securables.insert(key, object);
    }

    /// Role finder.
    ///
    /// - type and securable name: roles applicable to that named object
    /// - type and id: roles applicable to that registered object
    /// - type only: roles applicable to the class
    /// - nothing: every role
    ///
    /// The result is then filtered by `name` when given. Unknown objects
    /// yield no roles.
    pub fn find_by_securable(
        &self,
        securable_name: Option<&str>,
        securable_id: Option<&str>,
        securable_type: Option<&str>,
        name: Option<&str>,
    ) -> Vec<Role> {
        let candidates = match (securable_type, securable_name, securable_id) {
            (Some(ty), Some(sname), _) => {
                let object = self
                    .inner
                    .read()
                    .securables
                    .get(&(ty.to_string(), sname.to_string()))
                    .cloned();
                match object {
                    Some(object) => self.roles_applicable_to(&object),
                    None => return Vec::new(),
                }
            }
            (Some(ty), None, Some(id)) => {
                let object = self
                    .inner
                    .read()
                    .securables
                    .values()
                    .find(|o| o.type_name == ty && o.id.as_deref() == Some(id))
                    .cloned();
                match object {
                    Some(object) => self.roles_applicable_to(&object),
                    None => return Vec::new(),
                }
            }
            (Some(ty), None, None) => {
                let base = self.inner.read().base_type_of(ty);
                self.roles_applicable_to_class(ty, &base)
            }
            (None, _, _) => self.roles(),
        };

        match name {
            Some(name) => candidates.into_iter().filter(|r| r.name == name).collect(),
            None => candidates,
        }
    }

    /// Find roles by signature (`name`, `Type:name`, `Type/securable:name`)
    pub fn find_by_signature(&self, signature: &str) -> RoleResult<Vec<Role>> {
        let parsed = RoleSignature::parse(signature)?;
        Ok(self.find_by_securable(
            parsed.securable_name.as_deref(),
            None,
            parsed.securable_type.as_deref(),
            Some(&parsed.name),
        ))
    }
}

impl RoleStore for InMemoryRoleStore {
    fn roles_applicable_to(&self, object: &ObjectRef) -> Vec<Role> {
        self.inner
            .read()
            .roles
            .iter()
            .filter(|r| r.applies_to(object))
            .cloned()
            .collect()
    }

    fn roles_applicable_to_class(&self, type_name: &str, base_type: &str) -> Vec<Role> {
        self.inner
            .read()
            .roles
            .iter()
            .filter(|r| r.scope.applies_to_class(type_name, base_type))
            .cloned()
            .collect()
    }

    fn roles_held_by(&self, principal: &Principal) -> Vec<Role> {
        let direct = principal.reference();
        let inner = self.inner.read();
        let mut held: Vec<Role> = Vec::new();

        for (role_id, grantee) in &inner.grants {
            let via_group = grantee.kind == GROUP_KIND && principal.group_ids.contains(&grantee.id);
            if *grantee != direct && !via_group {
                continue;
            }
            if let Some(role) = inner.role(*role_id) {
                if !held.iter().any(|r| r.id == role.id) {
                    held.push(role.clone());
                }
            }
        }
        held
    }

    fn find_role(&self, name: &str, scope: &RoleScope) -> Option<Role> {
        self.inner
            .read()
            .roles
            .iter()
            .find(|r| r.name == name && r.scope == *scope)
            .cloned()
    }

    fn grants_of(&self, role: &Role) -> Vec<Grant> {
        let inner = self.inner.read();
        inner
            .grants
            .iter()
            .filter(|(id, _)| *id == role.id)
            .map(|(_, grantee)| Grant {
                role: role.clone(),
                grantee: grantee.clone(),
            })
            .collect()
    }
}
