//! # Warden
//!
//! Capability-based identity and resource-role authorization.
//!
//! Warden stores identity records and expresses access control as
//! delegatable *capabilities* derived from named roles bound to specific
//! resources. It decides who may grant, use, or revoke those capabilities
//! and applies identity mutations under optimistic concurrency.
//!
//! ## Features
//!
//! - Resource roles expanded into flat (permission, resource) capabilities
//! - Delegation and revocation validation against the acting principal
//! - Ownership translation: owning a resource satisfies checks written against it
//! - Group membership validation
//! - Sequence-gated updates (compare-and-swap, never locks)
//! - Pluggable record store (`SQLite` by default) and role catalog
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden::{Identity, IdentityService, Principal, ResourceRole};
//!
//! let service = IdentityService::in_memory()?;
//! let alpha = Identity::new("https://example.com/i/alpha");
//! let meta = MetaInput::default()
//!     .with_resource_role(ResourceRole::new("identity.regular").generating_id());
//! service.insert(&Principal::FullTrust, alpha, meta)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod authorization;
pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use authorization::{AuthorizationContext, Authorizer, PermissionOracle, RoleCatalog};
pub use config::WardenConfig;
pub use models::{
    Capability, Identity, IdentityFilter, IdentityId, IdentityPatch, IdentityRecord,
    IdentityStatus, Meta, MetaInput, Principal, ResourceRole, Role,
};
pub use services::IdentityService;
pub use storage::{IdentityStore, RecordMutation, SqliteIdentityStore};

/// Error type for warden operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `PermissionDenied` | The acting principal lacks a permission over the checked resources |
/// | `NotFound` | A referenced identity does not exist |
/// | `NotAllowed` | A `memberOf` group is missing, deleted, or not a group |
/// | `NotSupported` | Unknown role id or unknown `generateResource` directive |
/// | `Duplicate` | Inserting an identity whose id already exists |
/// | `InvalidState` | Sequence mismatch or a lost compare-and-swap race |
/// | `ValidationError` | A patch produces an invalid identity |
/// | `InvalidInput` | Malformed caller input |
/// | `OperationFailed` | Storage, IO, or serialization failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The principal does not hold `permission` over any of `resource`.
    ///
    /// An empty `resource` list means the check was unrestricted.
    #[error("permission denied: {permission} over [{}]", resource.join(", "))]
    PermissionDenied {
        /// The permission that was checked.
        permission: String,
        /// The resource list the permission was checked against.
        resource: Vec<String>,
    },

    /// A referenced identity was not found.
    #[error("identity not found: {id}")]
    NotFound {
        /// The missing identity id.
        id: String,
    },

    /// A referenced group is missing or inactive.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// A role or directive is not supported by the configuration.
    ///
    /// Raised when:
    /// - A resource role names a role id absent from the catalog
    /// - A role is marked deleted in the catalog
    /// - `generateResource` carries anything other than `"id"`
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Unique-constraint violation on insert.
    #[error("duplicate identity: {id}")]
    Duplicate {
        /// The conflicting identity id.
        id: String,
    },

    /// Optimistic-concurrency conflict.
    ///
    /// The caller must re-read the record and resubmit.
    #[error("invalid state for {id}: expected sequence {expected}, found {actual}")]
    InvalidState {
        /// The identity being mutated.
        id: String,
        /// The sequence the caller supplied.
        expected: u64,
        /// The sequence observed in the store, re-read after a lost
        /// conditional write.
        actual: u64,
    },

    /// The mutated identity failed attribute validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` operations fail
    /// - Records cannot be (de)serialized
    /// - Configuration files cannot be read
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns the stable name of the error category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PermissionDenied { .. } => "PermissionDenied",
            Self::NotFound { .. } => "NotFound",
            Self::NotAllowed(_) => "NotAllowed",
            Self::NotSupported(_) => "NotSupported",
            Self::Duplicate { .. } => "DuplicateError",
            Self::InvalidState { .. } => "InvalidState",
            Self::ValidationError(_) => "ValidationError",
            Self::InvalidInput(_) => "InvalidInput",
            Self::OperationFailed { .. } => "OperationFailed",
        }
    }

    /// Builds a `PermissionDenied` error.
    pub(crate) fn denied(permission: &str, resource: Option<&[String]>) -> Self {
        Self::PermissionDenied {
            permission: permission.to_string(),
            resource: resource.map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    /// Returns `true` for a duplicate-key error.
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result type alias for warden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use warden::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::denied("IDENTITY_ACCESS", Some(&["urn:a".to_string()]));
        assert_eq!(err.to_string(), "permission denied: IDENTITY_ACCESS over [urn:a]");

        let err = Error::InvalidState {
            id: "urn:a".to_string(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "invalid state for urn:a: expected sequence 1, found 2"
        );

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");
    }

    #[test]
    fn test_error_names() {
        assert_eq!(Error::denied("X", None).name(), "PermissionDenied");
        assert_eq!(
            Error::Duplicate {
                id: "a".to_string()
            }
            .name(),
            "DuplicateError"
        );
        assert_eq!(Error::NotAllowed("g".to_string()).name(), "NotAllowed");
    }

    #[test]
    fn test_unrestricted_denial_has_empty_resource() {
        let Error::PermissionDenied { resource, .. } = Error::denied("X", None) else {
            unreachable!()
        };
        assert!(resource.is_empty());
    }
}
