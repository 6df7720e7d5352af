//! Role catalog entries.

use serde::{Deserialize, Serialize};

/// Status of a role in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    /// Role may be granted and used.
    #[default]
    Active,
    /// Role is retired; grants naming it are not supported.
    Deleted,
}

/// A named, flat set of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Role identifier.
    pub id: String,

    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Permissions conferred by the role.
    #[serde(default)]
    pub sys_permission: Vec<String>,

    /// Catalog status.
    #[serde(default)]
    pub sys_status: RoleStatus,
}

impl Role {
    /// Creates an active role with the given permissions.
    #[must_use]
    pub fn new<I, S>(id: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            label: None,
            sys_permission: permissions.into_iter().map(Into::into).collect(),
            sys_status: RoleStatus::Active,
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Marks the role deleted.
    #[must_use]
    pub const fn deleted(mut self) -> Self {
        self.sys_status = RoleStatus::Deleted;
        self
    }

    /// Returns `true` if the role is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.sys_status, RoleStatus::Active)
    }
}
