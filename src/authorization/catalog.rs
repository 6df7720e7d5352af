//! Role catalog.
//!
//! The catalog maps role ids to permission sets. It is consulted once per
//! authorization pass; the resulting [`RoleSnapshot`] is the per-pass cache
//! and is discarded with the pass.

use std::collections::HashMap;
use std::sync::RwLock;

use super::permissions::{ADMIN_ROLE, ALL, REGULAR_PERMISSIONS, REGULAR_ROLE};
use crate::models::{ResourceRole, Role};
use crate::{Error, Result};

/// Source of role definitions.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait RoleCatalog: Send + Sync {
    /// Returns every known role, including deleted ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    fn get_roles(&self) -> Result<Vec<Role>>;
}

/// In-process catalog backed by configuration.
#[derive(Debug, Default)]
pub struct StaticRoleCatalog {
    roles: RwLock<Vec<Role>>,
}

impl StaticRoleCatalog {
    /// Creates a catalog from the given roles.
    #[must_use]
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: RwLock::new(roles),
        }
    }

    /// Catalog with the built-in `identity.regular` and `identity.admin` roles.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_roles())
    }

    /// Adds or replaces a role.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog lock is poisoned.
    pub fn upsert(&self, role: Role) -> Result<()> {
        let mut roles = self.roles.write().map_err(|e| Error::OperationFailed {
            operation: "lock_role_catalog".to_string(),
            cause: e.to_string(),
        })?;
        roles.retain(|existing| existing.id != role.id);
        roles.push(role);
        Ok(())
    }
}

impl RoleCatalog for StaticRoleCatalog {
    fn get_roles(&self) -> Result<Vec<Role>> {
        let roles = self.roles.read().map_err(|e| Error::OperationFailed {
            operation: "lock_role_catalog".to_string(),
            cause: e.to_string(),
        })?;
        Ok(roles.clone())
    }
}

/// The built-in roles.
#[must_use]
pub fn builtin_roles() -> Vec<Role> {
    vec![
        Role::new(REGULAR_ROLE, REGULAR_PERMISSIONS.iter().copied())
            .with_label("Regular identity"),
        Role::new(ADMIN_ROLE, ALL.iter().copied()).with_label("Identity administrator"),
    ]
}

/// Roles fetched once for a single authorization pass.
#[derive(Debug, Clone, Default)]
pub struct RoleSnapshot {
    roles: HashMap<String, Role>,
}

impl RoleSnapshot {
    /// Loads a snapshot from `catalog`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub fn load(catalog: &dyn RoleCatalog) -> Result<Self> {
        Ok(Self::from_roles(catalog.get_roles()?))
    }

    /// Builds a snapshot from a role list.
    #[must_use]
    pub fn from_roles(roles: Vec<Role>) -> Self {
        Self {
            roles: roles.into_iter().map(|role| (role.id.clone(), role)).collect(),
        }
    }

    /// Returns the permissions of an active role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the role is unknown or deleted.
    pub fn permissions(&self, role_id: &str) -> Result<&[String]> {
        match self.roles.get(role_id) {
            Some(role) if role.is_active() => Ok(&role.sys_permission),
            Some(_) => Err(Error::NotSupported(format!("role '{role_id}' is deleted"))),
            None => Err(Error::NotSupported(format!("role '{role_id}' is not supported"))),
        }
    }

    /// Checks that every entry names an active role.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] for the first unknown or deleted role.
    pub fn ensure_supported(&self, resource_roles: &[ResourceRole]) -> Result<()> {
        resource_roles
            .iter()
            .try_for_each(|entry| self.permissions(&entry.sys_role).map(|_| ()))
    }

    /// Number of roles in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Returns `true` if the snapshot holds no roles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
