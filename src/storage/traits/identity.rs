//! Identity record store trait.

use crate::Result;
use crate::models::{
    Identity, IdentityFilter, IdentityId, IdentityRecord, IdentityStatus, ResourceRole,
};

/// A single-record mutation applied by [`IdentityStore::conditional_update`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordMutation {
    /// Replace the identity document.
    Identity(Identity),
    /// Replace the lifecycle status.
    Status(IdentityStatus),
    /// Replace the held resource roles.
    ResourceRoles(Vec<ResourceRole>),
}

impl RecordMutation {
    /// Short operation name for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Identity(_) => "identity",
            Self::Status(_) => "status",
            Self::ResourceRoles(_) => "resource_roles",
        }
    }
}

/// Durable store for identity records.
///
/// The store is the only shared mutable state. Concurrency control is a
/// compare-and-swap on `meta.sequence`; implementations must never block
/// waiting for a competing writer to finish.
pub trait IdentityStore: Send + Sync {
    /// Retrieves a record by identity ID.
    fn find_one(&self, id: &IdentityId) -> Result<Option<IdentityRecord>>;

    /// Retrieves every record whose ID is in `ids`.
    ///
    /// Missing IDs are skipped; order is unspecified.
    fn find_many(&self, ids: &[IdentityId]) -> Result<Vec<IdentityRecord>>;

    /// Lists records matching `filter`.
    fn find(&self, filter: &IdentityFilter) -> Result<Vec<IdentityRecord>>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Duplicate`] if the ID already exists.
    fn insert(&self, record: IdentityRecord) -> Result<IdentityRecord>;

    /// Applies `mutation` only if the stored sequence equals
    /// `expected_sequence`, bumping the sequence by one and refreshing
    /// `meta.updated` in the same write.
    ///
    /// Returns the number of records matched (0 or 1).
    fn conditional_update(
        &self,
        id: &IdentityId,
        expected_sequence: u64,
        mutation: RecordMutation,
    ) -> Result<u64>;

    /// Returns `true` if a record exists for `id`.
    fn exists(&self, id: &IdentityId) -> Result<bool> {
        Ok(self.find_one(id)?.is_some())
    }

    /// Returns the number of records matching `filter`.
    fn count(&self, filter: &IdentityFilter) -> Result<usize> {
        Ok(self.find(filter)?.len())
    }
}
