//! Applying resource-role additions and removals to a held list.

use crate::models::ResourceRole;

/// Returns `current` with `remove` applied, then `add`.
///
/// Removal:
/// - an entry without a resource list drops every held entry of that role
/// - otherwise the named resources are removed from restricted entries of
///   that role, and entries left with no resources are dropped
/// - unrestricted held entries are only dropped by an unrestricted removal
///
/// Addition merges resources into the first held entry of the same role
/// (deduplicated, unrestricted wins) or appends the entry.
#[must_use]
pub fn apply_role_changes(
    mut current: Vec<ResourceRole>,
    add: &[ResourceRole],
    remove: &[ResourceRole],
) -> Vec<ResourceRole> {
    for removal in remove {
        match removal.resources() {
            None => current.retain(|held| held.sys_role != removal.sys_role),
            Some(resources) => {
                for held in current
                    .iter_mut()
                    .filter(|held| held.sys_role == removal.sys_role)
                {
                    if let Some(held_resources) = held.resource.as_mut() {
                        held_resources.retain(|r| !resources.contains(r));
                    }
                }
                current.retain(|held| held.resources().is_none_or(|r| !r.is_empty()));
            },
        }
    }

    for addition in add {
        match current
            .iter_mut()
            .find(|held| held.sys_role == addition.sys_role)
        {
            Some(held) => held.merge_resources(addition.resources()),
            None => current.push(addition.clone()),
        }
    }

    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoped(role: &str, resources: &[&str]) -> ResourceRole {
        ResourceRole::new(role).with_resource(resources.iter().copied())
    }

    #[test]
    fn test_add_merges_same_role() {
        let roles = apply_role_changes(
            vec![scoped("regular", &["urn:b"])],
            &[scoped("regular", &["urn:a", "urn:b"])],
            &[],
        );
        assert_eq!(roles, vec![scoped("regular", &["urn:b", "urn:a"])]);
    }

    #[test]
    fn test_add_appends_new_role() {
        let roles = apply_role_changes(
            vec![scoped("regular", &["urn:b"])],
            &[scoped("admin", &["urn:a"]).with_delegator("urn:a")],
            &[],
        );
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[1].delegator.as_deref(), Some("urn:a"));
    }

    #[test]
    fn test_remove_resources_and_drop_empty_entries() {
        let current = vec![scoped("regular", &["urn:b", "urn:a"]), scoped("admin", &["urn:a"])];
        let roles = apply_role_changes(
            current,
            &[],
            &[scoped("regular", &["urn:a"]), scoped("admin", &["urn:a"])],
        );
        assert_eq!(roles, vec![scoped("regular", &["urn:b"])]);
    }

    #[test]
    fn test_unrestricted_removal_drops_role() {
        let current = vec![scoped("regular", &["urn:b"]), ResourceRole::new("admin")];
        let roles = apply_role_changes(current, &[], &[ResourceRole::new("admin")]);
        assert_eq!(roles, vec![scoped("regular", &["urn:b"])]);
    }

    #[test]
    fn test_scoped_removal_keeps_unrestricted_entry() {
        let current = vec![ResourceRole::new("admin")];
        let roles = apply_role_changes(current.clone(), &[], &[scoped("admin", &["urn:a"])]);
        assert_eq!(roles, current);
    }

    #[test]
    fn test_no_changes_is_identity() {
        let current = vec![scoped("regular", &["urn:b"])];
        assert_eq!(apply_role_changes(current.clone(), &[], &[]), current);
    }
}
