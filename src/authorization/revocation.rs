//! Revocation validation.

use super::AuthorizationPass;
use super::permissions::{IDENTITY_CAPABILITY_REVOKE, IDENTITY_META_UPDATE};
use crate::Result;
use crate::models::{Capability, Identity, ResourceRole};

/// Validates that the acting principal may remove `removed` from `target`.
///
/// [`IDENTITY_META_UPDATE`] over the target identity allows any removal and
/// is checked once. Otherwise every resource named by a removed entry
/// needs [`IDENTITY_CAPABILITY_REVOKE`] over that resource alone, and an
/// entry without a resource list needs it unrestricted.
///
/// A revoke capability over a resource permits removing any grant naming
/// that resource, whoever issued it.
///
/// # Errors
///
/// Returns [`crate::Error::PermissionDenied`] on the first failing check.
pub fn validate_capability_revocation(
    pass: &AuthorizationPass<'_>,
    target: &Identity,
    removed: &[ResourceRole],
) -> Result<()> {
    if pass.principal().is_full_trust() || removed.is_empty() {
        return Ok(());
    }

    let blanket = pass.translate(Capability::scoped(
        IDENTITY_META_UPDATE,
        target.resource_list(),
    ))?;
    if pass.oracle().has(&blanket.permission, blanket.resources()) {
        tracing::debug!(
            principal = %pass.principal().label(),
            target = %target.id,
            "Revocation allowed by meta-update"
        );
        return Ok(());
    }

    for entry in removed {
        match entry.resources() {
            None => pass.check(IDENTITY_CAPABILITY_REVOKE, None)?,
            Some(resources) => {
                for resource in resources {
                    pass.check(IDENTITY_CAPABILITY_REVOKE, Some(vec![resource.clone()]))?;
                }
            },
        }
    }

    tracing::debug!(
        principal = %pass.principal().label(),
        target = %target.id,
        entries = removed.len(),
        "Revocation validated"
    );
    Ok(())
}
