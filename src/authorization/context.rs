//! Permission oracle.
//!
//! [`AuthorizationContext`] is built once per call from the acting
//! principal and a [`RoleSnapshot`]; the caller's principal is never
//! mutated or memoized onto.

use std::collections::{HashMap, HashSet};

use super::catalog::RoleSnapshot;
use crate::models::Principal;
use crate::{Error, Result};

/// Answers whether the principal holds a permission over a resource list.
pub trait PermissionOracle: Send + Sync {
    /// The principal this oracle answers for.
    fn principal(&self) -> &Principal;

    /// Checks `permission` over `resource`.
    ///
    /// `resource == None` asks for the permission without restriction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the check fails.
    fn check(&self, permission: &str, resource: Option<&[String]>) -> Result<()>;

    /// Convenience wrapper returning a bool.
    fn has(&self, permission: &str, resource: Option<&[String]>) -> bool {
        self.check(permission, resource).is_ok()
    }
}

/// How a permission is held.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Grant {
    /// Held without resource restriction.
    Unrestricted,
    /// Held over these resources only.
    Resources(HashSet<String>),
}

/// Permission table for one principal, valid for one authorization pass.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    principal: Principal,
    table: HashMap<String, Grant>,
}

impl AuthorizationContext {
    /// Builds the permission table for `principal`.
    ///
    /// Held roles missing from the snapshot confer nothing; they are logged
    /// and skipped so that a retired role cannot lock a principal out.
    #[must_use]
    pub fn build(principal: Principal, roles: &RoleSnapshot) -> Self {
        let mut table: HashMap<String, Grant> = HashMap::new();
        for resource_role in principal.resource_roles() {
            let permissions = match roles.permissions(&resource_role.sys_role) {
                Ok(permissions) => permissions,
                Err(e) => {
                    tracing::debug!(
                        principal = %principal.label(),
                        role = %resource_role.sys_role,
                        error = %e,
                        "Skipping unusable held role"
                    );
                    continue;
                },
            };
            for permission in permissions {
                let entry = table
                    .entry(permission.clone())
                    .or_insert_with(|| Grant::Resources(HashSet::new()));
                match (entry, resource_role.resources()) {
                    (entry @ Grant::Resources(_), None) => *entry = Grant::Unrestricted,
                    (Grant::Resources(held), Some(resources)) => {
                        held.extend(resources.iter().cloned());
                    },
                    (Grant::Unrestricted, _) => {},
                }
            }
        }
        Self { principal, table }
    }

    /// Context for full administrative trust.
    #[must_use]
    pub fn full_trust() -> Self {
        Self {
            principal: Principal::FullTrust,
            table: HashMap::new(),
        }
    }

    fn evaluate(&self, permission: &str, resource: Option<&[String]>) -> bool {
        if self.principal.is_full_trust() {
            return true;
        }
        match (self.table.get(permission), resource) {
            (Some(Grant::Unrestricted), _) => true,
            (Some(Grant::Resources(held)), Some(resource)) => {
                resource.iter().any(|r| held.contains(r))
            },
            _ => false,
        }
    }
}

impl PermissionOracle for AuthorizationContext {
    fn principal(&self) -> &Principal {
        &self.principal
    }

    fn check(&self, permission: &str, resource: Option<&[String]>) -> Result<()> {
        let granted = self.evaluate(permission, resource);
        let outcome = if granted { "granted" } else { "denied" };
        metrics::counter!(
            "authz_checks_total",
            "permission" => permission.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        tracing::debug!(
            principal = %self.principal.label(),
            permission = %permission,
            resource = ?resource,
            outcome,
            "Permission check"
        );
        if granted {
            Ok(())
        } else {
            Err(Error::denied(permission, resource))
        }
    }
}
