//! Configuration for the task tree

use crate::models::DEFAULT_ROOT_ID;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest usable depth bound: the sentinel plus one level of tasks
const MIN_MAX_DEPTH: usize = 2;

/// What happens to the descendants of a deleted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletePolicy {
    /// Delete the task together with its whole subtree
    #[default]
    Cascade,
    /// Refuse to delete a task that still has children
    Reject,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown delete policy '{}' (expected 'cascade' or 'reject')",
                other
            )),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cascade => write!(f, "cascade"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Tree configuration shared by the service and the history engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Id of the root sentinel
    pub root_id: String,

    /// Maximum `path.len()` of any task, sentinel included
    pub max_depth: usize,

    pub delete_policy: DeletePolicy,

    /// Maximum number of undoable operations kept per session
    pub history_capacity: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID.to_string(),
            max_depth: 4,
            delete_policy: DeletePolicy::Cascade,
            history_capacity: 100,
        }
    }
}

impl TreeConfig {
    /// Build configuration from `TASKTREE_*` environment variables.
    ///
    /// Unset variables keep their default. The result is validated.
    ///
    /// - `TASKTREE_ROOT_ID`
    /// - `TASKTREE_MAX_DEPTH`
    /// - `TASKTREE_DELETE_POLICY` (`cascade` | `reject`)
    /// - `TASKTREE_HISTORY_CAPACITY`
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root_id) = lookup("TASKTREE_ROOT_ID") {
            config.root_id = root_id;
        }
        if let Some(raw) = lookup("TASKTREE_MAX_DEPTH") {
            config.max_depth = raw
                .parse()
                .map_err(|_| format!("TASKTREE_MAX_DEPTH must be a number, got '{}'", raw))?;
        }
        if let Some(raw) = lookup("TASKTREE_DELETE_POLICY") {
            config.delete_policy = raw.parse()?;
        }
        if let Some(raw) = lookup("TASKTREE_HISTORY_CAPACITY") {
            config.history_capacity = raw.parse().map_err(|_| {
                format!("TASKTREE_HISTORY_CAPACITY must be a number, got '{}'", raw)
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.root_id.trim().is_empty() {
            return Err("root_id cannot be empty".to_string());
        }

        if self.max_depth < MIN_MAX_DEPTH {
            return Err(format!(
                "max_depth must be at least {} (sentinel plus one level)",
                MIN_MAX_DEPTH
            ));
        }

        if self.history_capacity == 0 {
            return Err("history_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = TreeConfig::default();
        assert_eq!(config.root_id, DEFAULT_ROOT_ID);
        assert_eq!(config.max_depth, 4);
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = TreeConfig::default().with_max_depth(1);
        assert!(config.validate().is_err());

        let config = TreeConfig::default().with_history_capacity(0);
        assert!(config.validate().is_err());

        let config = TreeConfig {
            root_id: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let config = TreeConfig::from_lookup(lookup(&[
            ("TASKTREE_ROOT_ID", "root"),
            ("TASKTREE_MAX_DEPTH", "6"),
            ("TASKTREE_DELETE_POLICY", "Reject"),
        ]))
        .unwrap();

        assert_eq!(config.root_id, "root");
        assert_eq!(config.max_depth, 6);
        assert_eq!(config.delete_policy, DeletePolicy::Reject);
        assert_eq!(config.history_capacity, 100);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        assert!(TreeConfig::from_lookup(lookup(&[("TASKTREE_MAX_DEPTH", "deep")])).is_err());
        assert!(TreeConfig::from_lookup(lookup(&[("TASKTREE_DELETE_POLICY", "orphan")])).is_err());
        assert!(TreeConfig::from_lookup(lookup(&[("TASKTREE_HISTORY_CAPACITY", "0")])).is_err());
    }
}
