//! Delegation validation.

use super::AuthorizationPass;
use super::expand::expand;
use super::permissions::IDENTITY_CAPABILITY_DELEGATE;
use crate::Result;
use crate::models::{Capability, ResourceRole};

/// Validates that the acting principal may grant `resource_roles`.
///
/// Every expanded capability is translated, then the actor must hold both
/// the capability's own permission and [`IDENTITY_CAPABILITY_DELEGATE`]
/// over the translated resource list. Full trust passes without expansion.
///
/// Read-only: the caller persists the grant only after this returns `Ok`.
///
/// # Errors
///
/// - [`crate::Error::NotSupported`] if an entry names an unknown role
/// - [`crate::Error::PermissionDenied`] on the first failing check
pub fn validate_capability_delegation(
    pass: &AuthorizationPass<'_>,
    resource_roles: &[ResourceRole],
) -> Result<()> {
    if pass.principal().is_full_trust() {
        return Ok(());
    }

    for capability in expand(resource_roles, pass.roles())? {
        let capability = pass.translate(capability)?;
        pass.check_capability(&capability)?;
        pass.check_capability(&Capability {
            permission: IDENTITY_CAPABILITY_DELEGATE.to_string(),
            resource: capability.resource.clone(),
        })?;
    }

    tracing::debug!(
        principal = %pass.principal().label(),
        grants = resource_roles.len(),
        "Delegation validated"
    );
    Ok(())
}
