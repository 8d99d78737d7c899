//! Universal rules and exclusive roles

mod common;

use common::{grant, setup, user, Record};
use rolegate::role::RoleScope;
use rolegate::types::Action;

// ============================================================================
// Universal rules
// ============================================================================

#[test]
fn test_universal_column_updates_on_secured_and_unsecured_types() {
    let (manager, store) = setup(
        r#"
        authorization do
          column [:name], :updatable_by => :$editor
          secure :servers do
            updatable_by :@@manager, :only => [:ip]
          end
        end
        "#,
    );
    let editor = user("1");
    let manager_user = user("2");
    grant(&store, "$editor", RoleScope::Global, &editor);
    grant(&store, "@@manager", RoleScope::class("Server"), &manager_user);

    let server = Record::new("Server", "1");
    // Universal updaters join the resource's own updaters
    assert!(manager.permit(Some(&editor), &server, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&editor), &server, Action::Update, &["ip"]).unwrap());
    assert!(manager.permit(Some(&manager_user), &server, Action::Update, &["ip"]).unwrap());

    // No rule for users: only universal updaters apply
    let account = Record::new("User", "3");
    assert!(manager.permit(Some(&editor), &account, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&editor), &account, Action::Update, &["email"]).unwrap());
    assert!(!manager.permit(Some(&manager_user), &account, Action::Update, &["name"]).unwrap());
}

#[test]
fn test_universal_role_shared_with_resource_keeps_both_option_sets() {
    let (manager, store) = setup(
        r#"
        updatable_by :$staff, :only => [:name]
        secure :servers do
          updatable_by :$staff, :only => [:ip]
        end
        "#,
    );
    let staff = user("1");
    grant(&store, "$staff", RoleScope::Global, &staff);

    let server = Record::new("Server", "1");
    assert!(manager.permit(Some(&staff), &server, Action::Update, &["name"]).unwrap());
    assert!(manager.permit(Some(&staff), &server, Action::Update, &["ip"]).unwrap());
}

#[test]
fn test_universal_creators_and_deleters() {
    let (manager, store) = setup(
        r#"
        creatable_by :$root
        destroyable_by :$root
        secure :servers do
        end
        "#,
    );
    let root = user("1");
    grant(&store, "$root", RoleScope::Global, &root);

    assert!(manager
        .permit(Some(&root), &Record::unsaved("Server"), Action::Create, &[])
        .unwrap());
    assert!(manager
        .permit(Some(&root), &Record::unsaved("User"), Action::Create, &[])
        .unwrap());
    assert!(manager
        .permit(Some(&root), &Record::new("User", "2"), Action::Delete, &[])
        .unwrap());
    assert!(!manager
        .permit(Some(&user("2")), &Record::new("User", "2"), Action::Delete, &[])
        .unwrap());
}

#[test]
fn test_universal_rules_do_not_cover_add_and_remove() {
    let (manager, store) = setup("manageable_by :$root\nsecure :servers do\nend");
    let root = user("1");
    grant(&store, "$root", RoleScope::Global, &root);

    let server = Record::new("Server", "1");
    assert!(!manager.permit(Some(&root), &server, Action::Add, &["user"]).unwrap());
    assert!(!manager.permit(Some(&root), &server, Action::Remove, &["user"]).unwrap());
}

// ============================================================================
// Exclusive roles
// ============================================================================

fn lockdown_setup(
    source: &str,
) -> (
    std::sync::Arc<rolegate::Manager>,
    std::sync::Arc<rolegate::InMemoryRoleStore>,
    rolegate::Principal,
) {
    let (manager, store) = setup(source);
    let manager_user = user("1");
    grant(&store, "@@manager", RoleScope::class("Server"), &manager_user);
    (manager, store, manager_user)
}

#[test]
fn test_exclusive_role_locks_out_other_roles() {
    let (manager, store, manager_user) = lockdown_setup(
        r#"
        secure :servers do
          exclusive_role :@lockdown_manager
          updatable_by [:@@manager, :@lockdown_manager]
        end
        "#,
    );
    let lockdown_user = user("2");
    grant(
        &store,
        "@lockdown_manager",
        RoleScope::instance("Server", "2"),
        &lockdown_user,
    );

    let open = Record::new("Server", "1");
    let locked = Record::new("Server", "2");

    assert!(manager.permit(Some(&manager_user), &open, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&manager_user), &locked, Action::Update, &["name"]).unwrap());
    assert!(manager.permit(Some(&lockdown_user), &locked, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&lockdown_user), &open, Action::Update, &["name"]).unwrap());
}

#[test]
fn test_unheld_exclusive_role_still_locks_down() {
    let (manager, store, manager_user) = lockdown_setup(
        r#"
        secure :servers do
          exclusive_role :@lockdown_manager
          updatable_by [:@@manager, :@lockdown_manager]
        end
        "#,
    );
    // The role exists on the server even though nobody holds it
    store
        .create_role("@lockdown_manager", RoleScope::instance("Server", "2"))
        .unwrap();

    assert!(!manager
        .permit(Some(&manager_user), &Record::new("Server", "2"), Action::Update, &["name"])
        .unwrap());
}

#[test]
fn test_multiple_exclusive_roles_compose_by_union() {
    let (manager, store, manager_user) = lockdown_setup(
        r#"
        secure :servers do
          exclusive_role :@lockdown_manager_1
          exclusive_role :@lockdown_manager_2
          updatable_by [:@@manager, :@lockdown_manager_1, :@lockdown_manager_2]
        end
        "#,
    );
    let first = user("2");
    let second = user("3");
    grant(&store, "@lockdown_manager_1", RoleScope::instance("Server", "2"), &first);
    grant(&store, "@lockdown_manager_2", RoleScope::instance("Server", "2"), &second);
    grant(&store, "@lockdown_manager_1", RoleScope::instance("Server", "3"), &first);

    let both = Record::new("Server", "2");
    let only_first = Record::new("Server", "3");

    assert!(manager.permit(Some(&first), &both, Action::Update, &["name"]).unwrap());
    assert!(manager.permit(Some(&second), &both, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&manager_user), &both, Action::Update, &["name"]).unwrap());

    assert!(manager.permit(Some(&first), &only_first, Action::Update, &["name"]).unwrap());
    assert!(!manager.permit(Some(&second), &only_first, Action::Update, &["name"]).unwrap());
}

#[test]
fn test_exclusive_role_without_grant_in_action_table_denies_all() {
    let (manager, store, manager_user) = lockdown_setup(
        r#"
        secure :servers do
          exclusive_role :@frozen
          updatable_by :@@manager
        end
        "#,
    );
    store
        .create_role("@frozen", RoleScope::instance("Server", "1"))
        .unwrap();

    assert!(!manager
        .permit(Some(&manager_user), &Record::new("Server", "1"), Action::Update, &["name"])
        .unwrap());
    assert!(manager
        .permit(Some(&manager_user), &Record::new("Server", "2"), Action::Update, &["name"])
        .unwrap());
}
