//! Manager configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Decision engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Start with authorization checks bypassed until `enable` is called
    #[serde(default)]
    pub start_disabled: bool,

    /// List who holds each permitted role in denial diagnostics
    #[serde(default = "default_explain_grantees")]
    pub explain_grantees: bool,

    /// Policy file compiled by `Manager::from_config`
    #[serde(default)]
    pub policy_path: Option<PathBuf>,
}

fn default_explain_grantees() -> bool {
    true
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            start_disabled: false,
            explain_grantees: default_explain_grantees(),
            policy_path: None,
        }
    }
}
