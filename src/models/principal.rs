//! Acting principals.

use super::identity::{IdentityId, IdentityRecord};
use super::resource_role::ResourceRole;

/// The acting party in an authorization decision.
///
/// Resolved once at the API boundary; validators never look the principal
/// up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Full administrative trust: every check passes.
    FullTrust,
    /// An identity acting with the resource roles it holds.
    Identity {
        /// The acting identity.
        id: IdentityId,
        /// Resource roles held by the identity.
        resource_roles: Vec<ResourceRole>,
    },
}

impl Principal {
    /// Creates an identity principal.
    #[must_use]
    pub fn identity(id: impl Into<IdentityId>, resource_roles: Vec<ResourceRole>) -> Self {
        Self::Identity {
            id: id.into(),
            resource_roles,
        }
    }

    /// Creates a principal from a stored record.
    #[must_use]
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self::Identity {
            id: record.identity.id.clone(),
            resource_roles: record.meta.sys_resource_role.clone(),
        }
    }

    /// Returns `true` for [`Principal::FullTrust`].
    #[must_use]
    pub const fn is_full_trust(&self) -> bool {
        matches!(self, Self::FullTrust)
    }

    /// Returns the acting identity id, if any.
    #[must_use]
    pub const fn id(&self) -> Option<&IdentityId> {
        match self {
            Self::FullTrust => None,
            Self::Identity { id, .. } => Some(id),
        }
    }

    /// Returns the held resource roles (empty for full trust).
    #[must_use]
    pub fn resource_roles(&self) -> &[ResourceRole] {
        match self {
            Self::FullTrust => &[],
            Self::Identity { resource_roles, .. } => resource_roles,
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &str {
        self.id().map_or("<full-trust>", IdentityId::as_str)
    }
}
