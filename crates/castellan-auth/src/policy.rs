//! Group mapping policy.
//!
//! Maps remote directory groups onto local groups and permissions.
//! Read-only at runtime; permission references are parsed and validated
//! when the policy is built, so a malformed `"scope.codename"` string is
//! a startup error rather than a per-login surprise.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A permission reference is not of the form `scope.codename`.
    #[error("malformed permission reference {reference:?}: expected \"scope.codename\"")]
    MalformedPermission { reference: String },
}

/// A permission reference: `scope.codename`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionRef {
    pub scope: String,
    pub codename: String,
}

impl PermissionRef {
    /// Parse a `"scope.codename"` string. The codename may itself contain
    /// dots; the split is on the first one.
    pub fn parse(reference: &str) -> Result<Self, PolicyError> {
        match reference.split_once('.') {
            Some((scope, codename)) if !scope.is_empty() && !codename.is_empty() => Ok(Self {
                scope: scope.to_string(),
                codename: codename.to_string(),
            }),
            _ => Err(PolicyError::MalformedPermission {
                reference: reference.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for PermissionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.scope, self.codename)
    }
}

impl TryFrom<String> for PermissionRef {
    type Error = PolicyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionRef> for String {
    fn from(value: PermissionRef) -> Self {
        value.to_string()
    }
}

/// Maps one remote group onto a local group with optional permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMappingRule {
    /// Name of the local group to assign.
    pub local_group: String,

    /// Permissions attached to the local group on assignment.
    #[serde(default)]
    pub permissions: Vec<PermissionRef>,
}

impl GroupMappingRule {
    pub fn new(local_group: impl Into<String>) -> Self {
        Self {
            local_group: local_group.into(),
            permissions: Vec::new(),
        }
    }

    /// Attach a permission reference.
    pub fn with_permission(mut self, reference: &str) -> Result<Self, PolicyError> {
        self.permissions.push(PermissionRef::parse(reference)?);
        Ok(self)
    }
}

/// The reconciliation policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Remote group CN (exact, case-sensitive) to mapping rule.
    #[serde(default)]
    pub mappings: HashMap<String, GroupMappingRule>,

    /// Create a same-named local group for unmapped remote groups.
    #[serde(default)]
    pub auto_create_unmapped: bool,

    /// Remove local memberships absent from the reconciled set.
    #[serde(default)]
    pub prune_memberships: bool,

    /// Groups the pruning pass never removes.
    #[serde(default)]
    pub exempt_groups: HashSet<String>,
}

impl SyncPolicy {
    /// Add a mapping rule for a remote group.
    #[must_use]
    pub fn with_mapping(mut self, remote_group: impl Into<String>, rule: GroupMappingRule) -> Self {
        self.mappings.insert(remote_group.into(), rule);
        self
    }

    /// Enable auto-creation of unmapped groups.
    #[must_use]
    pub fn with_auto_create(mut self) -> Self {
        self.auto_create_unmapped = true;
        self
    }

    /// Enable removal of memberships absent from the reconciled set.
    #[must_use]
    pub fn with_pruning(mut self) -> Self {
        self.prune_memberships = true;
        self
    }

    /// Exempt a group from pruning.
    #[must_use]
    pub fn with_exempt_group(mut self, name: impl Into<String>) -> Self {
        self.exempt_groups.insert(name.into());
        self
    }
}
