//! Decision engine
//!
//! The [`Manager`] holds a compiled [`RuleSet`] and answers
//! `permit(principal, object, action, changed_attributes)`.
//!
//! # Architecture
//!
//! ```text
//! permit → resource rule? ─no──→ fallback (universal tables, owning associations)
//!              │yes
//!              ↓
//!          action table ∪ universal table
//!              ↓                (delete: destroy pool, cascade short-circuit)
//!          exclusive-role filter
//!              ↓
//!          any role: held ∧ applicable ∧ option set satisfied
//! ```
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use rolegate::entity::{Entity, ObjectRef, Principal, Value};
//! use rolegate::manager::Manager;
//! use rolegate::role::{InMemoryRoleStore, RoleScope};
//! use rolegate::schema::Schema;
//! use rolegate::types::Action;
//!
//! struct Server;
//! impl Entity for Server {
//!     fn object_ref(&self) -> ObjectRef { ObjectRef::new("Server", "1") }
//!     fn member(&self, _name: &str) -> Option<Value> { None }
//! }
//!
//! let store = Arc::new(InMemoryRoleStore::new());
//! let manager_role = store.create_role("@@manager", RoleScope::class("Server")).unwrap();
//! let alice = Principal::new("alice");
//! store.grant_to(&manager_role, &alice).unwrap();
//!
//! let manager = Manager::from_source(
//!     "secure :servers do\n  updatable_by :@@manager\nend",
//!     store,
//!     Schema::new(),
//! ).unwrap();
//!
//! assert!(manager.permit(Some(&alice), &Server, Action::Update, &["name"]).unwrap());
//! assert!(!manager.permit(None, &Server, Action::Update, &["name"]).unwrap());
//! ```

mod config;
mod diagnostics;
mod guard;
mod pool;

pub use config::ManagerConfig;
pub use guard::DisableGuard;
pub use pool::DestroyPool;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::entity::{Entity, ObjectRef, Principal, Value};
use crate::error::{AclError, Result};
use crate::reader::{self, Reader};
use crate::role::RoleStore;
use crate::rules::{GrantTable, OptionSet, ResourceRule, RuleSet};
use crate::schema::Schema;
use crate::types::{Action, ResourceName, RoleName};
use guard::BypassDepths;
use pool::DestroyPools;

/// Access-control decision engine
pub struct Manager {
    rules: RwLock<Arc<RuleSet>>,
    store: Arc<dyn RoleStore>,
    schema: Schema,
    config: ManagerConfig,

    /// Live `DisableGuard`s per thread
    bypass: BypassDepths,
    /// Bypass requested by `start_disabled`, lifted by `enable`
    start_disabled: AtomicBool,

    pools: DestroyPools,
}

impl Manager {
    /// Create a manager with the default configuration
    pub fn new(rules: RuleSet, store: Arc<dyn RoleStore>, schema: Schema) -> Self {
        Self::with_config(rules, store, schema, ManagerConfig::default())
    }

    /// Create a manager with an explicit configuration
    pub fn with_config(
        rules: RuleSet,
        store: Arc<dyn RoleStore>,
        schema: Schema,
        config: ManagerConfig,
    ) -> Self {
        info!(
            resources = rules.len(),
            entity_types = schema.len(),
            start_disabled = config.start_disabled,
            "Initializing ACL manager"
        );
        if config.start_disabled {
            warn!("ACL manager is disabled - skipping authorization checks");
        }

        Self {
            rules: RwLock::new(Arc::new(rules)),
            store,
            schema,
            start_disabled: AtomicBool::new(config.start_disabled),
            config,
            bypass: BypassDepths::default(),
            pools: DestroyPools::default(),
        }
    }

    /// Compile `source` and create a manager for it
    pub fn from_source(source: &str, store: Arc<dyn RoleStore>, schema: Schema) -> Result<Self> {
        let rules = reader::compile(source)?;
        Ok(Self::new(rules, store, schema))
    }

    /// Create a manager from configuration, compiling `policy_path` if set
    pub fn from_config(
        config: ManagerConfig,
        store: Arc<dyn RoleStore>,
        schema: Schema,
    ) -> Result<Self> {
        let rules = match &config.policy_path {
            Some(path) => {
                let source = std::fs::read_to_string(path)?;
                let mut reader = Reader::new();
                reader.parse(&source)?;
                reader.into_rules()
            }
            None => RuleSet::new(),
        };
        Ok(Self::with_config(rules, store, schema, config))
    }

    /// Current rule set
    pub fn rules(&self) -> Arc<RuleSet> {
        Arc::clone(&self.rules.read())
    }

    /// Replace the rule set atomically
    pub fn replace_rules(&self, rules: RuleSet) {
        info!(resources = rules.len(), "Replacing authorization rules");
        *self.rules.write() = Arc::new(rules);
    }

    /// Recompile from `source`; on error the current rules stay in place
    pub fn reload(&self, source: &str) -> Result<()> {
        let rules = reader::compile(source)?;
        self.replace_rules(rules);
        Ok(())
    }

    /// Role store in use
    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    /// Entity schema in use
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Configuration in use
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Bypass
    // ------------------------------------------------------------------

    /// Bypass checks on the calling thread until the returned guard is dropped
    pub fn disable(&self) -> DisableGuard<'_> {
        DisableGuard::acquire(self)
    }

    /// Lift the bypass requested by `start_disabled`. Live guards still apply.
    pub fn enable(&self) {
        if self.start_disabled.swap(false, Ordering::SeqCst) {
            warn!("ACL manager is enabled");
        }
    }

    /// Whether checks are currently bypassed for the calling thread
    pub fn is_disabled(&self) -> bool {
        self.start_disabled.load(Ordering::SeqCst) || self.bypass.is_active()
    }

    /// Run `f` with checks bypassed; they resume even if `f` panics
    pub fn without_authorization<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.disable();
        f()
    }

    // ------------------------------------------------------------------
    // Destroy pool
    // ------------------------------------------------------------------

    /// Snapshot of the calling thread's destroy pool
    pub fn destroy_pool(&self) -> DestroyPool {
        self.pools.snapshot()
    }

    /// Clear the calling thread's destroy pool
    pub fn clear_destroy_pool(&self) {
        self.pools.clear();
    }

    /// Post-delete cleanup: clears the pool when `object` is the delete
    /// that started the cascade. Returns whether the pool was cleared.
    pub fn finish_delete(&self, object: &ObjectRef) -> bool {
        let cleared = self.pools.finish(object);
        if cleared {
            debug!(object = %object, "Cascade finished, destroy pool cleared");
        }
        cleared
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Whether `principal` may perform `action` on `object`.
    ///
    /// `None` is a principal that is not logged in. `changed` lists the
    /// attributes (or, for add/remove, association names) being modified.
    ///
    /// # Errors
    ///
    /// - [`AclError::UnsupportedAction`] when `object`'s type has no rule and
    ///   is not a registered entity type
    /// - [`AclError::MissingAssociation`] when a delegation, membership or
    ///   nil-check path names an accessor the object lacks
    pub fn permit(
        &self,
        principal: Option<&Principal>,
        object: &dyn Entity,
        action: Action,
        changed: &[&str],
    ) -> Result<bool> {
        if self.is_disabled() {
            debug!(action = %action, "ACL manager disabled, permitting");
            return Ok(true);
        }
        let rules = self.rules();
        let permitted = self.decide(&rules, principal, object, action, changed)?;
        debug!(
            action = %action,
            object = %object.object_ref(),
            permitted,
            "Authorization decision"
        );
        Ok(permitted)
    }

    /// [`permit`](Self::permit), turning a refusal into [`AclError::Denied`]
    /// carrying the diagnostic message. A refusal clears the destroy pool.
    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        object: &dyn Entity,
        action: Action,
        changed: &[&str],
    ) -> Result<()> {
        match self.permit(principal, object, action, changed) {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.deny(principal, action, object)),
            Err(err) => {
                self.pools.clear();
                Err(err)
            }
        }
    }

    /// Human-readable explanation of why `action` on `object` is refused
    pub fn explain_denial(
        &self,
        principal: Option<&Principal>,
        action: Action,
        object: &dyn Entity,
    ) -> String {
        diagnostics::explain(
            self.store.as_ref(),
            &self.rules(),
            principal,
            action,
            object,
            self.config.explain_grantees,
        )
    }

    /// Build the denial error and abandon the current cascade
    pub fn deny(&self, principal: Option<&Principal>, action: Action, object: &dyn Entity) -> AclError {
        let message = self.explain_denial(principal, action, object);
        self.pools.clear();
        warn!(
            action = %action,
            object = %diagnostics::describe_object(object),
            "Authorization denied"
        );
        AclError::Denied(message)
    }

    fn decide(
        &self,
        rules: &RuleSet,
        principal: Option<&Principal>,
        object: &dyn Entity,
        action: Action,
        changed: &[&str],
    ) -> Result<bool> {
        let reference = object.object_ref();
        let resource = ResourceName::for_type(&reference.type_name);

        let Some(rule) = rules.resource(resource.as_str()) else {
            debug!(resource = %resource, action = %action, "No rule declared, using fallback");
            return self.rule_missing(rules, principal, object, action, changed);
        };

        if action == Action::Delete {
            self.pools.record(reference.clone());
            if self.destroy_is_dependent(rule, object)? {
                debug!(resource = %resource, object = %reference, "Dependent of a cascading delete");
                return Ok(true);
            }
        }

        let table = rules.effective_table(rule, action);
        let table = self.filter_exclusives(rule, &reference, table);
        self.check_permissions(principal, &table, object, changed)
    }

    /// Fallback for types without a rule of their own
    fn rule_missing(
        &self,
        rules: &RuleSet,
        principal: Option<&Principal>,
        object: &dyn Entity,
        action: Action,
        changed: &[&str],
    ) -> Result<bool> {
        let reference = object.object_ref();
        let Some(entity_type) = self.schema.get(&reference.type_name) else {
            return Err(AclError::UnsupportedAction(format!(
                "can't secure non-entity type `{}`",
                reference.type_name
            )));
        };

        let association_action = match action {
            Action::Update => {
                return self.check_permissions(principal, &rules.universal_updaters, object, changed)
            }
            Action::Create => {
                if self.check_permissions(principal, &rules.universal_creators, object, changed)? {
                    return Ok(true);
                }
                Action::Add
            }
            Action::Delete => {
                if self.check_permissions(principal, &rules.universal_deleters, object, changed)? {
                    return Ok(true);
                }
                Action::Remove
            }
            Action::Add | Action::Remove => return Ok(false),
        };

        // Join records: permitted when the principal may add/remove this
        // association on any owning record.
        let owners = &entity_type.belongs_to;
        for from in owners.iter().filter(|a| !a.polymorphic) {
            let owner_resource = ResourceName::for_type(&from.target_type);
            if rules.resource(owner_resource.as_str()).is_none() {
                continue;
            }
            let owner = self.schema.transient(&from.target_type);
            for to in owners {
                if self.decide(rules, principal, &owner, association_action, &[to.name.as_str()])? {
                    debug!(
                        owner = %from.target_type,
                        association = %to.name,
                        action = %association_action,
                        "Permitted through owning association"
                    );
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn destroy_is_dependent(&self, rule: &ResourceRule, object: &dyn Entity) -> Result<bool> {
        for dependency in &rule.dependencies {
            if let Value::Entity(owner) = dependency.resolve(object)? {
                if self.pools.contains(&owner.object_ref()) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Narrow the table to exclusive roles that exist on this object
    fn filter_exclusives(&self, rule: &ResourceRule, object: &ObjectRef, table: GrantTable) -> GrantTable {
        if rule.exclusive_roles.is_empty() {
            return table;
        }
        let applicable: Vec<RoleName> = rule
            .exclusive_roles
            .iter()
            .filter(|name| self.store.find_applicable(object, name.as_str()).is_some())
            .cloned()
            .collect();

        if applicable.is_empty() {
            return table;
        }
        debug!(object = %object, exclusive = ?applicable, "Exclusive roles apply");
        table.retain_roles(&applicable)
    }

    fn check_permissions(
        &self,
        principal: Option<&Principal>,
        table: &GrantTable,
        object: &dyn Entity,
        changed: &[&str],
    ) -> Result<bool> {
        'roles: for (role, sets) in table.iter() {
            for options in sets {
                match self.satisfies(principal, role, options, object, changed)? {
                    Verdict::Satisfied => return Ok(true),
                    Verdict::Unsatisfied => {}
                    // An absent delegation target rules out the role entirely
                    Verdict::NoTarget => {
                        debug!(role = %role, "Delegation target is absent");
                        continue 'roles;
                    }
                }
            }
        }
        Ok(false)
    }

    /// One option set for one role. Conditions are checked in order and
    /// stop at the first failure, so later paths are only traversed when
    /// the earlier conditions hold.
    fn satisfies(
        &self,
        principal: Option<&Principal>,
        role: &RoleName,
        options: &OptionSet,
        object: &dyn Entity,
        changed: &[&str],
    ) -> Result<Verdict> {
        let Some(target) = self.role_target(options, object)? else {
            return Ok(Verdict::NoTarget);
        };

        let Some(principal) = principal else {
            return Ok(Verdict::Unsatisfied);
        };
        if !role.is_all() && !self.store.holds_applicable(principal, &target, role.as_str()) {
            return Ok(Verdict::Unsatisfied);
        }
        if !options.covers(changed) {
            return Ok(Verdict::Unsatisfied);
        }
        if let Some(path) = &options.if_user_in_associated {
            let members = path.resolve(object)?;
            if members.is_nil() {
                return Err(AclError::missing("nil", "members"));
            }
            if !members.includes(principal) {
                return Ok(Verdict::Unsatisfied);
            }
        }
        if let Some(path) = &options.if_no {
            if !path.resolve(object)?.is_nil() {
                return Ok(Verdict::Unsatisfied);
            }
        }
        Ok(Verdict::Satisfied)
    }

    /// The object whose scope the role is checked against; `None` when a
    /// delegation path resolves to nothing.
    fn role_target(&self, options: &OptionSet, object: &dyn Entity) -> Result<Option<ObjectRef>> {
        if let Some(path) = &options.of_associated {
            return Ok(match path.resolve(object)? {
                Value::Entity(target) => Some(target.object_ref()),
                _ => None,
            });
        }
        if let Some(path) = &options.of_class {
            let type_name = match path.resolve(object)? {
                Value::Text(type_name) => type_name,
                Value::Entity(target) => target.object_ref().type_name,
                _ => return Ok(None),
            };
            return Ok(Some(self.schema.transient(&type_name).object_ref()));
        }
        Ok(Some(object.object_ref()))
    }
}

/// Outcome of checking one option set
enum Verdict {
    Satisfied,
    Unsatisfied,
    NoTarget,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("resources", &self.rules.read().len())
            .field("disabled", &self.is_disabled())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
