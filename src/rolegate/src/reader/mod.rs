//! Policy compiler
//!
//! Reads the declarative policy language into a [`RuleSet`].
//!
//! # Examples
//!
//! ```
//! use rolegate::reader::compile;
//!
//! let rules = compile(r#"
//!     authorization do
//!       column [:name], :updatable_by => :all
//!
//!       secure :servers do
//!         creatable_by [:@@manager, :$root]
//!         updatable_by :@manager, :of_associated => :owner
//!         exclusive_role :@lockdown
//!       end
//!     end
//! "#).unwrap();
//!
//! assert_eq!(rules.len(), 1);
//! assert!(rules.resource("servers").is_some());
//! ```

mod error;
mod lexer;
mod parser;

#[cfg(test)]
mod tests;

pub use error::{DslError, DslResult};

use indexmap::IndexSet;
use std::path::Path;
use tracing::{debug, info};

use crate::path::AccessPath;
use crate::rules::{GrantTable, OptionSet, ResourceRule, RuleSet};
use crate::types::{Action, ResourceName, RoleName};
use parser::{Call, Expr};

/// Compile policy text into a rule set
pub fn compile(source: &str) -> DslResult<RuleSet> {
    let mut reader = Reader::new();
    reader.parse(source)?;
    Ok(reader.into_rules())
}

/// Incremental policy reader.
///
/// Several sources may be fed to one reader; they behave as if concatenated,
/// so a universal rule in a later source still fails once any earlier source
/// opened a `secure` block.
#[derive(Debug, Default)]
pub struct Reader {
    rules: RuleSet,
    secure_block_entered: bool,
}

impl Reader {
    /// Reader with an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and apply policy text.
    ///
    /// On error the reader may hold the declarations that preceded the
    /// failing one; discard it.
    pub fn parse(&mut self, source: &str) -> DslResult<()> {
        let tokens = lexer::tokenize(source)?;
        let calls = parser::parse(tokens)?;
        for call in &calls {
            self.top_level(call)?;
        }

        info!(
            resources = self.rules.len(),
            universal_creators = self.rules.universal_creators.len(),
            universal_updaters = self.rules.universal_updaters.len(),
            universal_deleters = self.rules.universal_deleters.len(),
            "Compiled authorization policy"
        );
        Ok(())
    }

    /// Read and parse a policy file
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> DslResult<()> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), bytes = source.len(), "Read policy file");
        self.parse(&source)
    }

    /// Rules compiled so far
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Finish reading
    pub fn into_rules(self) -> RuleSet {
        self.rules
    }

    fn top_level(&mut self, call: &Call) -> DslResult<()> {
        match call.name.as_str() {
            "authorization" => {
                expect_no_args(call)?;
                let body = call
                    .block
                    .as_ref()
                    .ok_or_else(|| DslError::args("authorization", "a block is required"))?;
                for inner in body {
                    self.top_level(inner)?;
                }
                Ok(())
            }
            "secure" => self.secure(call),
            _ => self.declaration(call, None),
        }
    }

    fn secure(&mut self, call: &Call) -> DslResult<()> {
        let [target] = call.args.as_slice() else {
            return Err(DslError::args("secure", "expected exactly one resource name"));
        };
        if !call.options.is_empty() {
            return Err(DslError::args("secure", "options are not allowed"));
        }
        let raw = target
            .as_name()
            .ok_or_else(|| DslError::args("secure", format!("expected a name, got {}", target.describe())))?;

        let name = ResourceName::parse(raw)?;
        self.secure_block_entered = true;

        if self.rules.resources.contains_key(&name) {
            return Err(DslError::DuplicateResource(name.to_string()));
        }

        let body = call
            .block
            .as_ref()
            .ok_or_else(|| DslError::args("secure", "a block is required"))?;

        let mut rule = ResourceRule::new(name.clone());
        for inner in body {
            if inner.name == "secure" {
                return Err(DslError::NestedSecure(name.to_string()));
            }
            self.declaration(inner, Some(&mut rule))?;
        }

        debug!(resource = %name, line = call.line, "Secured resource");
        self.rules.resources.insert(name, rule);
        Ok(())
    }

    fn declaration(&mut self, call: &Call, rule: Option<&mut ResourceRule>) -> DslResult<()> {
        if call.block.is_some() {
            return Err(DslError::args(&call.name, "unexpected block"));
        }

        match call.name.as_str() {
            "creatable_by" => self.grant(call, rule, &[Action::Create]),
            "updatable_by" => self.grant(call, rule, &[Action::Update]),
            "destroyable_by" => self.grant(call, rule, &[Action::Delete]),
            "manageable_by" => {
                self.grant(call, rule, &[Action::Create, Action::Delete, Action::Update])
            }
            "column" => self.column(call, rule),
            "resource" => {
                let rule = rule.ok_or_else(|| DslError::OutsideResource(call.name.clone()))?;
                resource_acl(call, rule)
            }
            "exclusive_role" => {
                let rule = rule.ok_or_else(|| DslError::OutsideResource(call.name.clone()))?;
                exclusive_role(call, rule)
            }
            "destroyable_if_destroying_associated" => {
                let rule = rule.ok_or_else(|| DslError::OutsideResource(call.name.clone()))?;
                dependencies(call, rule)
            }
            "authorization" => Err(DslError::args("authorization", "must be the outermost block")),
            other => Err(DslError::UnknownDeclaration(other.to_string())),
        }
    }

    /// `creatable_by roles, options` and friends
    fn grant(
        &mut self,
        call: &Call,
        rule: Option<&mut ResourceRule>,
        actions: &[Action],
    ) -> DslResult<()> {
        let (roles, options) = match call.args.as_slice() {
            [roles] => (roles, call.options.clone()),
            [roles, Expr::Hash(pairs)] if call.options.is_empty() => (roles, pairs.clone()),
            _ => {
                return Err(DslError::args(
                    &call.name,
                    "expected a role (or list of roles) and options",
                ))
            }
        };

        let roles = role_names(&call.name, roles)?;
        let options = option_set(&options)?;
        self.add_grants(rule, actions, &roles, &options)
    }

    /// `column [names], updatable_by: roles`
    fn column(&mut self, call: &Call, rule: Option<&mut ResourceRule>) -> DslResult<()> {
        let [names] = call.args.as_slice() else {
            return Err(DslError::InvalidColumnAcl("expected a list of column names".into()));
        };
        let roles = match call.options.as_slice() {
            [(key, roles)] if key.as_name() == Some("updatable_by") => roles,
            _ => {
                return Err(DslError::InvalidColumnAcl(
                    "expected exactly `updatable_by`".into(),
                ))
            }
        };

        let roles = role_names(&call.name, roles)?;
        let options = OptionSet {
            only: Some(name_list(names)?),
            ..OptionSet::default()
        };
        self.add_grants(rule, &[Action::Update], &roles, &options)
    }

    fn add_grants(
        &mut self,
        rule: Option<&mut ResourceRule>,
        actions: &[Action],
        roles: &[RoleName],
        options: &OptionSet,
    ) -> DslResult<()> {
        match rule {
            Some(rule) => {
                for &action in actions {
                    fan_out(rule.table_mut(action), roles, options);
                }
            }
            None => {
                if self.secure_block_entered {
                    return Err(DslError::UniversalAfterSecure);
                }
                for &action in actions {
                    if let Some(table) = self.rules.universal_mut(action) {
                        fan_out(table, roles, options);
                    }
                }
            }
        }
        Ok(())
    }
}

fn fan_out(table: &mut GrantTable, roles: &[RoleName], options: &OptionSet) {
    for role in roles {
        table.add(role.clone(), options.clone());
    }
}

fn expect_no_args(call: &Call) -> DslResult<()> {
    if call.args.is_empty() && call.options.is_empty() {
        Ok(())
    } else {
        Err(DslError::args(&call.name, "takes no arguments"))
    }
}

/// A single role name or a list of them
fn role_names(declaration: &str, expr: &Expr) -> DslResult<Vec<RoleName>> {
    let one = |e: &Expr| -> DslResult<RoleName> {
        let name = e.as_name().ok_or_else(|| {
            DslError::args(declaration, format!("expected a role name, got {}", e.describe()))
        })?;
        RoleName::parse(name)
    };

    match expr {
        Expr::Array(items) if items.is_empty() => {
            Err(DslError::args(declaration, "role list is empty"))
        }
        Expr::Array(items) => items.iter().map(one).collect(),
        single => Ok(vec![one(single)?]),
    }
}

/// A list of attribute or association names
fn name_list(expr: &Expr) -> DslResult<IndexSet<String>> {
    let Expr::Array(items) = expr else {
        return Err(DslError::OnlyNotSequence);
    };
    items
        .iter()
        .map(|item| {
            item.as_name()
                .map(str::to_string)
                .ok_or(DslError::OnlyNotSequence)
        })
        .collect()
}

/// A name or a nested single-key mapping, read as an association chain.
/// Strings and lists are rejected.
fn access_path(option: &str, expr: &Expr) -> DslResult<AccessPath> {
    let invalid = || DslError::InvalidDelegation(option.to_string());
    let mut segments = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Symbol(name) => {
                segments.push(name.clone());
                break;
            }
            Expr::Hash(pairs) => {
                let [(Expr::Symbol(key), value)] = pairs.as_slice() else {
                    return Err(invalid());
                };
                segments.push(key.clone());
                current = value;
            }
            _ => return Err(invalid()),
        }
    }
    AccessPath::from_segments(&segments).ok_or_else(invalid)
}

fn option_set(pairs: &[(Expr, Expr)]) -> DslResult<OptionSet> {
    let mut options = OptionSet::default();
    for (key, value) in pairs {
        let key = key
            .as_name()
            .ok_or_else(|| DslError::args("options", format!("invalid key {}", key.describe())))?;
        match key {
            "only" => options.only = Some(name_list(value)?),
            "of_associated" => options.of_associated = Some(access_path(key, value)?),
            "of_class" => options.of_class = Some(access_path(key, value)?),
            "if_user_in_associated" => {
                options.if_user_in_associated = Some(access_path(key, value)?)
            }
            "if_no" => options.if_no = Some(access_path(key, value)?),
            other => {
                return Err(DslError::args("options", format!("unknown option `{other}`")))
            }
        }
    }
    if options.of_associated.is_some() && options.of_class.is_some() {
        return Err(DslError::args(
            "options",
            "`of_associated` and `of_class` are mutually exclusive",
        ));
    }
    Ok(options)
}

/// `resource [names], addable_by: roles` / `removable_by: roles`
fn resource_acl(call: &Call, rule: &mut ResourceRule) -> DslResult<()> {
    let [names] = call.args.as_slice() else {
        return Err(DslError::InvalidResourceAcl(
            "expected a list of resource names".into(),
        ));
    };
    let (action, roles) = match call.options.as_slice() {
        [(key, roles)] => match key.as_name() {
            Some("addable_by") => (Action::Add, roles),
            Some("removable_by") => (Action::Remove, roles),
            _ => {
                return Err(DslError::InvalidResourceAcl(format!(
                    "unexpected option {}",
                    key.describe()
                )))
            }
        },
        _ => {
            return Err(DslError::InvalidResourceAcl(
                "expected exactly one of `addable_by` or `removable_by`".into(),
            ))
        }
    };

    let roles = role_names(&call.name, roles)?;
    let options = OptionSet {
        only: Some(name_list(names)?),
        ..OptionSet::default()
    };
    fan_out(rule.table_mut(action), &roles, &options);
    Ok(())
}

fn exclusive_role(call: &Call, rule: &mut ResourceRule) -> DslResult<()> {
    let [roles] = call.args.as_slice() else {
        return Err(DslError::args(&call.name, "expected a role name"));
    };
    if !call.options.is_empty() {
        return Err(DslError::args(&call.name, "options are not allowed"));
    }
    for role in role_names(&call.name, roles)? {
        rule.exclusive_roles.insert(role);
    }
    Ok(())
}

fn dependencies(call: &Call, rule: &mut ResourceRule) -> DslResult<()> {
    // `destroyable_if_destroying_associated :server => :owner` arrives as
    // trailing options
    let mut args = call.args.clone();
    if !call.options.is_empty() {
        args.push(Expr::Hash(call.options.clone()));
    }
    if args.is_empty() {
        return Err(DslError::args(&call.name, "expected an association path"));
    }
    for arg in &args {
        match arg {
            Expr::Array(items) => {
                for item in items {
                    rule.dependencies.push(access_path(&call.name, item)?);
                }
            }
            single => rule.dependencies.push(access_path(&call.name, single)?),
        }
    }
    Ok(())
}
