//! Group membership validation.

use super::AuthorizationPass;
use super::permissions::IDENTITY_UPDATE_MEMBERSHIP;
use crate::models::Identity;
use crate::storage::IdentityStore;
use crate::{Error, Result};

/// Validates the groups `identity` claims to belong to.
///
/// Every group in the deduplicated `memberOf` list must exist, be typed as
/// a group, and be active; the acting principal must then hold
/// [`IDENTITY_UPDATE_MEMBERSHIP`] over each group, after translation.
/// Groups are checked in `memberOf` order and the first failure is
/// returned. Full trust skips the permission checks but not the lookups.
///
/// # Errors
///
/// - [`Error::NotAllowed`] if a group is missing, inactive, or not a group
/// - [`Error::PermissionDenied`] if a membership check fails
pub fn ensure_membership_valid(
    pass: &AuthorizationPass<'_>,
    store: &dyn IdentityStore,
    identity: &Identity,
) -> Result<()> {
    let groups = identity.normalized_member_of();
    if groups.is_empty() {
        return Ok(());
    }

    let records = store.find_many(&groups)?;
    for group_id in &groups {
        let record = records
            .iter()
            .find(|record| record.id() == group_id)
            .filter(|record| record.identity.is_group() && record.is_active())
            .ok_or_else(|| {
                Error::NotAllowed(format!("'{group_id}' is not an active group"))
            })?;

        if !pass.principal().is_full_trust() {
            pass.check(
                IDENTITY_UPDATE_MEMBERSHIP,
                Some(vec![record.id().to_string()]),
            )?;
        }
    }

    tracing::debug!(
        principal = %pass.principal().label(),
        identity = %identity.id,
        groups = groups.len(),
        "Membership validated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::authorization::permissions::REGULAR_ROLE;
    use crate::authorization::{Authorizer, OwnerTranslator, StaticRoleCatalog};
    use crate::models::{IdentityRecord, IdentityStatus, Meta, Principal, ResourceRole};
    use crate::storage::SqliteIdentityStore;
    use std::sync::Arc;

    fn setup() -> (Arc<dyn IdentityStore>, Authorizer) {
        let store = SqliteIdentityStore::in_memory().unwrap();
        for (identity, status) in [
            (Identity::group("urn:g").with_owner("urn:o"), IdentityStatus::Active),
            (Identity::group("urn:gone"), IdentityStatus::Deleted),
            (Identity::new("urn:person"), IdentityStatus::Active),
        ] {
            store
                .insert(IdentityRecord {
                    identity,
                    meta: Meta::new(status, Vec::new()),
                })
                .unwrap();
        }
        let store: Arc<dyn IdentityStore> = Arc::new(store);
        let authorizer = Authorizer::new(Arc::new(StaticRoleCatalog::builtin()))
            .with_translator(Arc::new(OwnerTranslator::new(Arc::clone(&store))));
        (store, authorizer)
    }

    fn regular(id: &str) -> Principal {
        Principal::identity(id, vec![ResourceRole::new(REGULAR_ROLE).with_resource([id])])
    }

    #[test]
    fn test_owner_may_add_members() {
        let (store, authorizer) = setup();
        let pass = authorizer.begin(regular("urn:o")).unwrap();
        let identity = Identity::new("urn:new").with_member_of("urn:g");
        assert!(ensure_membership_valid(&pass, store.as_ref(), &identity).is_ok());
    }

    #[test]
    fn test_non_owner_denied() {
        let (store, authorizer) = setup();
        let pass = authorizer.begin(regular("urn:stranger")).unwrap();
        let identity = Identity::new("urn:new").with_member_of("urn:g");
        let err = ensure_membership_valid(&pass, store.as_ref(), &identity).unwrap_err();
        assert_eq!(err.name(), "PermissionDenied");
    }

    #[test]
    fn test_missing_deleted_or_non_group_not_allowed() {
        let (store, authorizer) = setup();
        let pass = authorizer.begin(Principal::FullTrust).unwrap();
        for group in ["urn:missing", "urn:gone", "urn:person"] {
            let identity = Identity::new("urn:new").with_member_of(group);
            let err = ensure_membership_valid(&pass, store.as_ref(), &identity).unwrap_err();
            assert_eq!(err.name(), "NotAllowed", "group {group}");
        }
    }

    #[test]
    fn test_no_groups_is_valid() {
        let (store, authorizer) = setup();
        let pass = authorizer.begin(regular("urn:x")).unwrap();
        assert!(ensure_membership_valid(&pass, store.as_ref(), &Identity::new("urn:new")).is_ok());
    }
}
