//! Capability expansion.
//!
//! Turns resource-role grants into the flat list of
//! (permission, single resource) capabilities the validators check.

use std::collections::HashSet;

use super::catalog::RoleSnapshot;
use crate::models::{Capability, ResourceRole};
use crate::{Error, Result};

/// Expands `resource_roles` into capabilities.
///
/// Every entry yields one capability per (permission, resource) pair; an
/// entry without a resource list yields unrestricted capabilities. The
/// result is deduplicated and keeps first-occurrence order, so validators
/// fail on the first offending entry.
///
/// `generateResource` directives must already be resolved.
///
/// # Errors
///
/// - [`Error::NotSupported`] if an entry names an unknown or deleted role
/// - [`Error::InvalidInput`] if an entry still carries a directive
pub fn expand(resource_roles: &[ResourceRole], roles: &RoleSnapshot) -> Result<Vec<Capability>> {
    let mut seen: HashSet<Capability> = HashSet::new();
    let mut capabilities = Vec::new();

    for resource_role in resource_roles {
        if let Some(directive) = &resource_role.generate_resource {
            return Err(Error::InvalidInput(format!(
                "unresolved generateResource '{directive}' on role '{}'",
                resource_role.sys_role
            )));
        }
        let permissions = roles.permissions(&resource_role.sys_role)?;
        for permission in permissions {
            let expanded: Vec<Capability> = match resource_role.resources() {
                None => vec![Capability::unrestricted(permission.clone())],
                Some(resources) => resources
                    .iter()
                    .map(|resource| Capability::scoped(permission.clone(), [resource.clone()]))
                    .collect(),
            };
            for capability in expanded {
                if seen.insert(capability.clone()) {
                    capabilities.push(capability);
                }
            }
        }
    }

    tracing::trace!(
        grants = resource_roles.len(),
        capabilities = capabilities.len(),
        "Expanded resource roles"
    );
    Ok(capabilities)
}
