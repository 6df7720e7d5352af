//! Record query filters.

use serde::{Deserialize, Serialize};

use super::identity::{IdentityId, IdentityRecord};
use super::meta::IdentityStatus;

/// Filter for listing identity records.
///
/// All set fields must match; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFilter {
    /// Only records with this status.
    pub status: Option<IdentityStatus>,
    /// Only identities carrying this type.
    pub kind: Option<String>,
    /// Only identities with this email attribute.
    pub email: Option<String>,
    /// Only identities claiming membership of this group.
    pub member_of: Option<IdentityId>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

impl IdentityFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a status.
    #[must_use]
    pub const fn with_status(mut self, status: IdentityStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restricts to a type.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Restricts to an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Restricts to members of a group.
    #[must_use]
    pub fn with_member_of(mut self, group: impl Into<IdentityId>) -> Self {
        self.member_of = Some(group.into());
        self
    }

    /// Caps the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `record` satisfies every set field.
    #[must_use]
    pub fn matches(&self, record: &IdentityRecord) -> bool {
        let identity = &record.identity;
        self.status.is_none_or(|status| record.meta.status == status)
            && self.kind.as_deref().is_none_or(|kind| identity.has_type(kind))
            && self
                .email
                .as_deref()
                .is_none_or(|email| identity.email() == Some(email))
            && self
                .member_of
                .as_ref()
                .is_none_or(|group| identity.member_of.contains(group))
    }
}
