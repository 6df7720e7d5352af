//! Well-known identity permissions.
//!
//! Roles are flat permission sets, so permissions are plain strings; these
//! are the ones the identity operations themselves check.

/// Read an identity.
pub const IDENTITY_ACCESS: &str = "IDENTITY_ACCESS";
/// Insert an identity.
pub const IDENTITY_INSERT: &str = "IDENTITY_INSERT";
/// Patch identity attributes.
pub const IDENTITY_UPDATE: &str = "IDENTITY_UPDATE";
/// Change identity bookkeeping: status and, blanket, any resource role.
pub const IDENTITY_META_UPDATE: &str = "IDENTITY_META_UPDATE";
/// Add or remove members of a group.
pub const IDENTITY_UPDATE_MEMBERSHIP: &str = "IDENTITY_UPDATE_MEMBERSHIP";
/// Delegate capabilities one holds over a resource.
pub const IDENTITY_CAPABILITY_DELEGATE: &str = "IDENTITY_CAPABILITY_DELEGATE";
/// Revoke any grant naming a resource.
pub const IDENTITY_CAPABILITY_REVOKE: &str = "IDENTITY_CAPABILITY_REVOKE";

/// All identity permissions.
pub const ALL: &[&str] = &[
    IDENTITY_ACCESS,
    IDENTITY_INSERT,
    IDENTITY_UPDATE,
    IDENTITY_META_UPDATE,
    IDENTITY_UPDATE_MEMBERSHIP,
    IDENTITY_CAPABILITY_DELEGATE,
    IDENTITY_CAPABILITY_REVOKE,
];

/// Built-in role for ordinary identities, granted over themselves.
pub const REGULAR_ROLE: &str = "identity.regular";
/// Built-in administrator role.
pub const ADMIN_ROLE: &str = "identity.admin";

/// Permissions of [`REGULAR_ROLE`].
pub const REGULAR_PERMISSIONS: &[&str] = &[
    IDENTITY_ACCESS,
    IDENTITY_UPDATE,
    IDENTITY_INSERT,
    IDENTITY_UPDATE_MEMBERSHIP,
    IDENTITY_CAPABILITY_DELEGATE,
    IDENTITY_CAPABILITY_REVOKE,
];
