/// Test suite for the policy compiler
///
/// Tests cover:
/// - Resource, column and association declarations
/// - Universal rules and their ordering constraint
/// - Delegation and condition option shapes
/// - Malformed input

use super::*;

fn role(name: &str) -> RoleName {
    RoleName::parse(name).unwrap()
}

fn servers(rules: &RuleSet) -> &ResourceRule {
    rules.resource("servers").expect("servers rule")
}

// ============================================================================
// Resource Declarations
// ============================================================================

#[test]
fn test_empty_authorization_block() {
    let rules = compile("authorization do\nend\n").unwrap();
    assert!(rules.is_empty());
}

#[test]
fn test_single_resource_single_role() {
    let rules = compile(
        r#"
        authorization do
          secure :servers do
            creatable_by :@@manager
            destroyable_by :@@manager
            updatable_by :@@manager
          end
        end
        "#,
    )
    .unwrap();

    assert_eq!(rules.len(), 1);
    let rule = servers(&rules);
    assert_eq!(rule.creators.len(), 1);
    assert_eq!(rule.deleters.len(), 1);
    assert_eq!(rule.updaters.len(), 1);
}

#[test]
fn test_column_rule_restricts_updaters() {
    let rules = compile(
        r#"
        secure :servers do
          column [:name], :updatable_by => :@@manager
        end
        "#,
    )
    .unwrap();

    let rule = servers(&rules);
    assert_eq!(rule.updaters.roles().collect::<Vec<_>>(), vec![&role("@@manager")]);
    assert_eq!(
        rule.updaters.get(&role("@@manager")).unwrap(),
        &[OptionSet::only(["name"])]
    );
}

#[test]
fn test_role_lists_fan_out() {
    let rules = compile(
        r#"
        secure :servers do
          creatable_by [:@@manager, :$admin]
          column [:name], updatable_by: [:@@manager, :$admin]
        end
        "#,
    )
    .unwrap();

    let rule = servers(&rules);
    assert_eq!(rule.creators.len(), 2);
    for name in ["@@manager", "$admin"] {
        assert_eq!(
            rule.updaters.get(&role(name)).unwrap(),
            &[OptionSet::only(["name"])]
        );
    }
}

#[test]
fn test_manageable_by_covers_three_tables() {
    let rules = compile("secure :servers do\n manageable_by :@@manager\nend").unwrap();
    let rule = servers(&rules);
    assert_eq!(rule.creators.len(), 1);
    assert_eq!(rule.updaters.len(), 1);
    assert_eq!(rule.deleters.len(), 1);
    assert!(rule.resource_adders.is_empty());
}

#[test]
fn test_association_rules() {
    let rules = compile(
        r#"
        secure :servers do
          resource [:users], :addable_by => [:@@manager]
          resource [:users, :devices], :removable_by => [:$admin]
        end
        "#,
    )
    .unwrap();

    let rule = servers(&rules);
    assert_eq!(
        rule.resource_adders.get(&role("@@manager")).unwrap(),
        &[OptionSet::only(["users"])]
    );
    let removers = rule.resource_removers.get(&role("$admin")).unwrap();
    let only = removers[0].only.as_ref().unwrap();
    assert!(only.contains("users") && only.contains("devices"));
}

#[test]
fn test_exclusive_roles_and_dependencies() {
    let rules = compile(
        r#"
        secure :servers do
          exclusive_role :@operator
          updatable_by :@operator
          destroyable_if_destroying_associated :foo
          destroyable_if_destroying_associated :foo => :bar
          destroyable_if_destroying_associated [:baz, {:qux => :quux}]
        end
        "#,
    )
    .unwrap();

    let rule = servers(&rules);
    assert_eq!(rule.exclusive_roles.iter().collect::<Vec<_>>(), vec![&role("@operator")]);
    let deps: Vec<String> = rule.dependencies.iter().map(|d| d.to_string()).collect();
    assert_eq!(deps, vec!["foo", "foo.bar", "baz", "qux.quux"]);
}

#[test]
fn test_brace_blocks_and_parentheses() {
    let rules = compile("secure(:servers) { creatable_by(:all) }").unwrap();
    assert!(servers(&rules).creators.contains(&role("all")));
}

#[test]
fn test_reader_accumulates_sources() {
    let mut reader = Reader::new();
    reader.parse("secure :servers do\nend").unwrap();
    reader.parse("secure :devices do\nend").unwrap();
    assert_eq!(reader.rules().len(), 2);

    let err = reader.parse("creatable_by :all").unwrap_err();
    assert!(matches!(err, DslError::UniversalAfterSecure));
}

#[test]
fn test_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("authorization.rb");
    std::fs::write(&path, "authorization do\n  secure :servers do\n  end\nend\n").unwrap();

    let mut reader = Reader::new();
    reader.parse_file(&path).unwrap();
    assert_eq!(reader.rules().len(), 1);

    let missing = Reader::new().parse_file(dir.path().join("missing.rb"));
    assert!(matches!(missing, Err(DslError::Io(_))));
}

// ============================================================================
// Universal Rules
// ============================================================================

#[test]
fn test_universal_rules_before_secure() {
    let rules = compile(
        r#"
        authorization do
          column [:updated_at], :updatable_by => :@@manager
          creatable_by :$root
          destroyable_by :$root
          secure :servers do
          end
        end
        "#,
    )
    .unwrap();

    assert_eq!(rules.universal_updaters.roles().collect::<Vec<_>>(), vec![&role("@@manager")]);
    assert_eq!(rules.universal_creators.len(), 1);
    assert_eq!(rules.universal_deleters.len(), 1);
}

#[test]
fn test_universal_after_secure_fails() {
    let err = compile(
        r#"
        authorization do
          secure :servers do
          end
          column [:updated_at], :updatable_by => :@@manager
        end
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, DslError::UniversalAfterSecure));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_duplicate_resource_fails() {
    let err = compile("secure :servers do\nend\nsecure :servers do\nend").unwrap_err();
    assert!(matches!(err, DslError::DuplicateResource(name) if name == "servers"));
}

#[test]
fn test_singular_resource_fails() {
    let err = compile("secure :server do\nend").unwrap_err();
    assert!(matches!(err, DslError::NotPlural(_)));
}

#[test]
fn test_only_must_be_a_list() {
    let err = compile("secure :servers do\n column :updated_at, :updatable_by => :@@manager\nend")
        .unwrap_err();
    assert!(matches!(err, DslError::OnlyNotSequence));

    let err = compile("secure :servers do\n updatable_by :@@manager, :only => :name\nend")
        .unwrap_err();
    assert!(matches!(err, DslError::OnlyNotSequence));
}

#[test]
fn test_delegation_shapes() {
    for ok in [
        "creatable_by :@@manager, :of_associated => :foo",
        "creatable_by :@@manager, :of_associated => {:foo => :bar}",
        "creatable_by :@@manager, :of_associated => {:a => {:b => :c}}",
        "creatable_by :@@manager, :if_user_in_associated => :root_users",
        "creatable_by :@@manager, :if_user_in_associated =>\n    {:device => :root_users}",
        "creatable_by :@@manager, of_class: :kind, if_no: :parent",
    ] {
        let src = format!("secure :servers do\n  {ok}\nend");
        assert!(compile(&src).is_ok(), "expected `{ok}` to compile");
    }

    for bad in [
        "creatable_by :@@manager, :of_associated => 'Foo'",
        "creatable_by :@@manager, :of_associated => [:foo]",
        "creatable_by :@@manager, :if_user_in_associated => 'root_users'",
        "creatable_by :@@manager, :if_user_in_associated => [:root_users]",
        "creatable_by :@@manager, :of_associated => {:a => :b, :c => :d}",
    ] {
        let src = format!("secure :servers do\n  {bad}\nend");
        assert!(
            matches!(compile(&src), Err(DslError::InvalidDelegation(_))),
            "expected `{bad}` to be rejected"
        );
    }
}

#[test]
fn test_nested_delegation_is_a_chain() {
    let rules = compile(
        "secure :servers do\n updatable_by :@manager, :of_associated => {:server_item => :owner}\nend",
    )
    .unwrap();
    let sets = servers(&rules).updaters.get(&role("@manager")).unwrap();
    let path = sets[0].of_associated.as_ref().unwrap();
    assert_eq!(path.segments(), vec!["server_item", "owner"]);
}

#[test]
fn test_acl_shape_errors() {
    let err = compile("secure :servers do\n resource [:users], :addable_by => :$a, :removable_by => :$a\nend")
        .unwrap_err();
    assert!(matches!(err, DslError::InvalidResourceAcl(_)));

    let err = compile("secure :servers do\n resource [:users], :creatable_by => :$a\nend").unwrap_err();
    assert!(matches!(err, DslError::InvalidResourceAcl(_)));

    let err = compile("column [:name], :creatable_by => :$a").unwrap_err();
    assert!(matches!(err, DslError::InvalidColumnAcl(_)));
}

#[test]
fn test_role_names_need_sigils() {
    let err = compile("secure :servers do\n creatable_by :manager\nend").unwrap_err();
    assert!(matches!(err, DslError::InvalidRoleName(name) if name == "manager"));
}

#[test]
fn test_declaration_placement() {
    assert!(matches!(
        compile("exclusive_role :@lockdown"),
        Err(DslError::OutsideResource(_))
    ));
    assert!(matches!(
        compile("secure :servers do\n secure :devices do\n end\nend"),
        Err(DslError::NestedSecure(_))
    ));
    assert!(matches!(
        compile("secure :servers do\n launch_missiles :now\nend"),
        Err(DslError::UnknownDeclaration(name)) if name == "launch_missiles"
    ));
}

#[test]
fn test_malformed_syntax() {
    assert!(matches!(
        compile("authorization\nend\n"),
        Err(DslError::Syntax { .. })
    ));
    assert!(matches!(
        compile("authorization do\n"),
        Err(DslError::Syntax { .. })
    ));
    match compile("secure :servers do\n  creatable_by [:$a\nend") {
        Err(DslError::Syntax { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected syntax error, got {other:?}"),
    }
}

#[test]
fn test_recompilation_is_deterministic() {
    let src = r#"
        column [:name], :updatable_by => :all
        secure :servers do
          creatable_by [:@@manager, :$root]
          updatable_by :@manager, :of_associated => :owner
          exclusive_role :@lockdown
        end
    "#;
    assert_eq!(compile(src).unwrap(), compile(src).unwrap());
}
