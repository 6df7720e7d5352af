//! Per-identity bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::resource_role::ResourceRole;

/// Lifecycle status of an identity.
///
/// Both transitions (`active -> deleted`, `deleted -> active`) are allowed
/// any number of times; nothing is ever hard-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    /// Active identity.
    #[default]
    Active,
    /// Soft-deleted identity.
    Deleted,
}

impl IdentityStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// Returns `true` for [`IdentityStatus::Active`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IdentityStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::Error::InvalidInput(format!("unknown status: {s}")))
    }
}

/// Bookkeeping stored alongside an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Lifecycle status.
    pub status: IdentityStatus,

    /// Optimistic-concurrency token; starts at 0, +1 per successful mutation.
    pub sequence: u64,

    /// Resource roles currently held by the identity.
    #[serde(default)]
    pub sys_resource_role: Vec<ResourceRole>,

    /// Creation time.
    pub created: DateTime<Utc>,

    /// Last mutation time.
    pub updated: DateTime<Utc>,
}

impl Meta {
    /// Creates fresh meta for a new identity (sequence 0).
    #[must_use]
    pub fn new(status: IdentityStatus, sys_resource_role: Vec<ResourceRole>) -> Self {
        let now = Utc::now();
        Self {
            status,
            sequence: 0,
            sys_resource_role,
            created: now,
            updated: now,
        }
    }
}

/// Caller-supplied meta for `insert`.
///
/// Sequence and timestamps are always assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInput {
    /// Initial status (defaults to active).
    #[serde(default)]
    pub status: IdentityStatus,

    /// Initial resource roles; `generateResource` directives are resolved
    /// against the new identity's id before storage.
    #[serde(default)]
    pub sys_resource_role: Vec<ResourceRole>,
}

impl MetaInput {
    /// Adds a resource role.
    #[must_use]
    pub fn with_resource_role(mut self, role: ResourceRole) -> Self {
        self.sys_resource_role.push(role);
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: IdentityStatus) -> Self {
        self.status = status;
        self
    }
}
