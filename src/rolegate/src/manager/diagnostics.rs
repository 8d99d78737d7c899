//! Denial diagnostics
//!
//! Advisory text for operators: what was attempted, what the principal
//! holds, and which roles could have done it and who holds them.

use std::fmt::Write as _;

use crate::entity::{Entity, Principal};
use crate::role::RoleStore;
use crate::rules::{GrantTable, RuleSet};
use crate::types::{Action, ResourceName};

/// `a new Server`, `Server[7]` or `Server[7] on columns [name, ip]`
pub(super) fn describe_object(object: &dyn Entity) -> String {
    let reference = object.object_ref();
    if !reference.is_persisted() {
        return reference.to_string();
    }
    let changed = object.changed_attributes();
    if changed.is_empty() {
        reference.to_string()
    } else {
        format!("{reference} on columns [{}]", changed.join(", "))
    }
}

fn held_roles(store: &dyn RoleStore, principal: Option<&Principal>) -> String {
    let Some(principal) = principal else {
        return "Not logged in: no roles held.".to_string();
    };
    let held = store.roles_held_by(principal);
    if held.is_empty() {
        return format!("Current user {principal} holds no roles.");
    }
    let mut out = format!("Current user {principal} holds roles:");
    for role in held {
        let _ = write!(out, "\n  {role}");
    }
    out
}

/// Roles in the action's table whose option sets allow the changed
/// attributes. Create and delete list only the resource's own roles.
fn roles_permitted(rules: &RuleSet, resource: &ResourceName, action: Action, changed: &[&str]) -> GrantTable {
    let Some(rule) = rules.resource(resource.as_str()) else {
        return GrantTable::new();
    };
    let table = match action {
        Action::Update => rules.effective_table(rule, action),
        _ => rule.table(action).clone(),
    };

    let mut permitted = GrantTable::new();
    for (role, sets) in table.iter() {
        for set in sets.iter().filter(|set| set.covers(changed)) {
            permitted.add(role.clone(), set.clone());
        }
    }
    permitted
}

fn permitted_roles(
    store: &dyn RoleStore,
    rules: &RuleSet,
    action: Action,
    object: &dyn Entity,
    explain_grantees: bool,
) -> String {
    let reference = object.object_ref();
    let resource = ResourceName::for_type(&reference.type_name);
    let changed = object.changed_attributes();
    let changed: Vec<&str> = changed.iter().map(String::as_str).collect();

    let permitted = roles_permitted(rules, &resource, action, &changed);
    if permitted.is_empty() {
        return "No roles can perform this action.".to_string();
    }

    let mut out = String::new();
    for name in permitted.roles() {
        if name.is_all() {
            let _ = writeln!(out, "Any logged-in user can perform this action.");
            continue;
        }
        let Some(role) = store.find_applicable(&reference, name.as_str()) else {
            let _ = writeln!(out, "{name} can perform this action, but no such role applies here.");
            continue;
        };
        if !explain_grantees {
            let _ = writeln!(out, "{role} can perform this action.");
            continue;
        }
        let _ = writeln!(out, "{role} can perform this action, and is held by:");
        for grant in store.grants_of(&role) {
            let _ = writeln!(out, "  {} {}", grant.grantee.kind, grant.grantee.id);
        }
    }
    out
}

/// Full denial message
pub(super) fn explain(
    store: &dyn RoleStore,
    rules: &RuleSet,
    principal: Option<&Principal>,
    action: Action,
    object: &dyn Entity,
    explain_grantees: bool,
) -> String {
    let mut message = String::new();
    let _ = writeln!(message, "Not permitted to {action} {}.", describe_object(object));
    let _ = writeln!(message, "{}", held_roles(store, principal));
    let _ = writeln!(
        message,
        "{}",
        permitted_roles(store, rules, action, object, explain_grantees).trim_end()
    );
    message.push_str("Please refer to the authorization policy for role authorizations.");
    message
}
