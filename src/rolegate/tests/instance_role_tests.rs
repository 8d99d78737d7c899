//! Instance and global roles

mod common;

use common::{grant, setup, user, Record};
use rolegate::role::RoleScope;
use rolegate::types::Action;

// ============================================================================
// Instance roles
// ============================================================================

#[test]
fn test_instance_role_applies_to_its_object_only() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :@owner\n  destroyable_by :@owner\nend");
    let owner = user("1");
    grant(&store, "@owner", RoleScope::instance("Server", "1"), &owner);

    let owned = Record::new("Server", "1");
    let other = Record::new("Server", "2");

    assert!(manager.permit(Some(&owner), &owned, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&owner), &other, Action::Update, &["name"]).unwrap());
    assert!(manager.permit(Some(&owner), &owned, Action::Delete, &[]).unwrap());
    assert!(!manager.permit(Some(&user("2")), &owned, Action::Update, &["name"]).unwrap());
}

#[test]
fn test_instance_role_never_applies_to_unsaved_object() {
    let (manager, store) = setup("secure :servers do\n  creatable_by :@owner\nend");
    let owner = user("1");
    grant(&store, "@owner", RoleScope::instance("Server", "1"), &owner);

    assert!(!manager
        .permit(Some(&owner), &Record::unsaved("Server"), Action::Create, &[])
        .unwrap());
}

#[test]
fn test_instance_role_on_same_id_of_other_type_does_not_apply() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :@owner\nend");
    let owner = user("1");
    grant(&store, "@owner", RoleScope::instance("User", "1"), &owner);

    assert!(!manager
        .permit(Some(&owner), &Record::new("Server", "1"), Action::Update, &["name"])
        .unwrap());
}

#[test]
fn test_held_role_with_other_name_does_not_apply() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :@owner\nend");
    let operator = user("1");
    grant(&store, "@operator", RoleScope::instance("Server", "1"), &operator);

    assert!(!manager
        .permit(Some(&operator), &Record::new("Server", "1"), Action::Update, &["name"])
        .unwrap());
}

#[test]
fn test_role_granted_to_group_is_held_by_members() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :@owner\nend");
    let role = store
        .create_role("@owner", RoleScope::instance("Server", "1"))
        .unwrap();
    store.grant_to_group(&role, "ops").unwrap();

    let member = user("1").in_group("ops");
    let outsider = user("2").in_group("dev");
    let server = Record::new("Server", "1");

    assert!(manager.permit(Some(&member), &server, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&outsider), &server, Action::Update, &["name"]).unwrap());
}

#[test]
fn test_revoked_grant_stops_permitting() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :@owner\nend");
    let owner = user("1");
    let role = grant(&store, "@owner", RoleScope::instance("Server", "1"), &owner);
    let server = Record::new("Server", "1");

    assert!(manager.permit(Some(&owner), &server, Action::Update, &["name"]).unwrap());
    assert!(store.revoke(&role, &owner.reference()));
    assert!(!manager.permit(Some(&owner), &server, Action::Update, &["name"]).unwrap());
}

// ============================================================================
// Global roles
// ============================================================================

#[test]
fn test_global_role_applies_everywhere() {
    let (manager, store) = setup(
        r#"
        secure :servers do
          manageable_by :$root
        end
        secure :users do
          updatable_by :$root
        end
        "#,
    );
    let root = user("1");
    grant(&store, "$root", RoleScope::Global, &root);

    assert!(manager
        .permit(Some(&root), &Record::unsaved("Server"), Action::Create, &[])
        .unwrap());
    assert!(manager
        .permit(Some(&root), &Record::new("Server", "5"), Action::Update, &["ip"])
        .unwrap());
    assert!(manager
        .permit(Some(&root), &Record::new("User", "7"), Action::Update, &["name"])
        .unwrap());
    assert!(!manager
        .permit(Some(&user("2")), &Record::new("User", "7"), Action::Update, &["name"])
        .unwrap());
}

#[test]
fn test_global_role_only_where_declared() {
    let (manager, store) = setup("secure :servers do\n  updatable_by :$root\nend");
    let root = user("1");
    grant(&store, "$root", RoleScope::Global, &root);

    assert!(!manager
        .permit(Some(&root), &Record::new("User", "1"), Action::Update, &["name"])
        .unwrap());
}

#[test]
fn test_role_lists_fan_out() {
    let (manager, store) = setup("secure :servers do\n  updatable_by [:@@manager, :$root, :@owner]\nend");
    let manager_user = user("1");
    let root = user("2");
    let owner = user("3");
    grant(&store, "@@manager", RoleScope::class("Server"), &manager_user);
    grant(&store, "$root", RoleScope::Global, &root);
    grant(&store, "@owner", RoleScope::instance("Server", "1"), &owner);

    let server = Record::new("Server", "1");
    for principal in [&manager_user, &root, &owner] {
        assert!(manager.permit(Some(principal), &server, Action::Update, &["name"]).unwrap());
    }
}
