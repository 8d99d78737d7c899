//! Compiled rule model
//!
//! A [`RuleSet`] is built once by the reader and read-only afterwards.
//! Grant tables keep declaration order so decisions and diagnostics are
//! reproducible between compilations of the same text.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::path::AccessPath;
use crate::types::{Action, ResourceName, RoleName};

/// Conditions attached to one role entry. All set conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptionSet {
    /// Attributes (or association names) the role may touch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only: Option<IndexSet<String>>,

    /// Check the role on a related object instead of the target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_associated: Option<AccessPath>,

    /// Check the role on a new instance of the type named by this path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_class: Option<AccessPath>,

    /// Principal must be a member of the collection at this path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_user_in_associated: Option<AccessPath>,

    /// Value at this path must be absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_no: Option<AccessPath>,
}

impl OptionSet {
    /// Option set restricted to `names`
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            only: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Whether every changed attribute is allowed by `only`.
    /// No restriction, or no changes, is always covered.
    pub fn covers<S: AsRef<str>>(&self, changed: &[S]) -> bool {
        match &self.only {
            Some(only) => changed.iter().all(|attr| only.contains(attr.as_ref())),
            None => true,
        }
    }

    /// The path whose resolution becomes the role-check target, if any
    pub fn delegation(&self) -> Option<&AccessPath> {
        self.of_associated.as_ref().or(self.of_class.as_ref())
    }
}

/// Role name → option sets. Several option sets for one role are OR'd.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GrantTable {
    entries: IndexMap<RoleName, Vec<OptionSet>>,
}

impl GrantTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an option set for `role`
    pub fn add(&mut self, role: RoleName, options: OptionSet) {
        self.entries.entry(role).or_default().push(options);
    }

    /// Option sets declared for `role`
    pub fn get(&self, role: &RoleName) -> Option<&[OptionSet]> {
        self.entries.get(role).map(Vec::as_slice)
    }

    /// Whether `role` has an entry
    pub fn contains(&self, role: &RoleName) -> bool {
        self.entries.contains_key(role)
    }

    /// Roles in declaration order
    pub fn roles(&self) -> impl Iterator<Item = &RoleName> {
        self.entries.keys()
    }

    /// `(role, option sets)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&RoleName, &[OptionSet])> {
        self.entries.iter().map(|(role, sets)| (role, sets.as_slice()))
    }

    /// Number of roles
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no roles
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of two tables: every role of either, with the option sets of
    /// both for roles present in both. Duplicate option sets are kept once.
    pub fn union(&self, other: &GrantTable) -> GrantTable {
        let mut merged = self.clone();
        for (role, sets) in &other.entries {
            let target = merged.entries.entry(role.clone()).or_default();
            for set in sets {
                if !target.contains(set) {
                    target.push(set.clone());
                }
            }
        }
        merged
    }

    /// Keep only the roles in `keep`
    pub fn retain_roles(&self, keep: &[RoleName]) -> GrantTable {
        GrantTable {
            entries: self
                .entries
                .iter()
                .filter(|(role, _)| keep.contains(role))
                .map(|(role, sets)| (role.clone(), sets.clone()))
                .collect(),
        }
    }
}

/// Rules for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRule {
    /// Resource this rule secures
    pub name: ResourceName,
    /// Roles that may create
    pub creators: GrantTable,
    /// Roles that may update (optionally restricted to columns)
    pub updaters: GrantTable,
    /// Roles that may delete
    pub deleters: GrantTable,
    /// Roles that may attach associated resources
    pub resource_adders: GrantTable,
    /// Roles that may detach associated resources
    pub resource_removers: GrantTable,
    /// Roles that, when applicable to an object, shadow all others
    pub exclusive_roles: IndexSet<RoleName>,
    /// Paths to owners whose cascading delete permits this delete
    pub dependencies: Vec<AccessPath>,
}

impl ResourceRule {
    /// Rule with empty tables
    pub fn new(name: ResourceName) -> Self {
        Self {
            name,
            creators: GrantTable::new(),
            updaters: GrantTable::new(),
            deleters: GrantTable::new(),
            resource_adders: GrantTable::new(),
            resource_removers: GrantTable::new(),
            exclusive_roles: IndexSet::new(),
            dependencies: Vec::new(),
        }
    }

    /// The resource-specific table for `action`
    pub fn table(&self, action: Action) -> &GrantTable {
        match action {
            Action::Create => &self.creators,
            Action::Update => &self.updaters,
            Action::Delete => &self.deleters,
            Action::Add => &self.resource_adders,
            Action::Remove => &self.resource_removers,
        }
    }

    pub(crate) fn table_mut(&mut self, action: Action) -> &mut GrantTable {
        match action {
            Action::Create => &mut self.creators,
            Action::Update => &mut self.updaters,
            Action::Delete => &mut self.deleters,
            Action::Add => &mut self.resource_adders,
            Action::Remove => &mut self.resource_removers,
        }
    }
}

/// Compiled policy: per-resource rules plus universal tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    /// Rules keyed by resource name, in declaration order
    pub resources: IndexMap<ResourceName, ResourceRule>,
    /// Creators for every resource
    pub universal_creators: GrantTable,
    /// Updaters for every resource
    pub universal_updaters: GrantTable,
    /// Deleters for every resource
    pub universal_deleters: GrantTable,
}

impl RuleSet {
    /// Empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule for `resource`, if declared
    pub fn resource(&self, resource: &str) -> Option<&ResourceRule> {
        self.resources.get(resource)
    }

    /// Universal table for `action`; add/remove have none
    pub fn universal(&self, action: Action) -> Option<&GrantTable> {
        match action {
            Action::Create => Some(&self.universal_creators),
            Action::Update => Some(&self.universal_updaters),
            Action::Delete => Some(&self.universal_deleters),
            Action::Add | Action::Remove => None,
        }
    }

    pub(crate) fn universal_mut(&mut self, action: Action) -> Option<&mut GrantTable> {
        match action {
            Action::Create => Some(&mut self.universal_creators),
            Action::Update => Some(&mut self.universal_updaters),
            Action::Delete => Some(&mut self.universal_deleters),
            Action::Add | Action::Remove => None,
        }
    }

    /// Effective table for `action` on a declared resource: the resource
    /// table joined with the universal table of the same action.
    pub fn effective_table(&self, rule: &ResourceRule, action: Action) -> GrantTable {
        match self.universal(action) {
            Some(universal) => rule.table(action).union(universal),
            None => rule.table(action).clone(),
        }
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources are declared
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
