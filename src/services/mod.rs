//! Business logic services.
//!
//! [`IdentityService`] is the record mutator: it orchestrates the
//! authorization validators and the sequence-gated writes against an
//! [`IdentityStore`](crate::storage::IdentityStore).

mod hooks;
mod identity;
mod role_changes;

pub use hooks::{HookRegistry, InsertDraft, InsertHook};
pub use identity::{
    GetOptions, IdentityService, RoleOperation, UpdateRoleRequest, UpdateRolesRequest,
};
pub use role_changes::apply_role_changes;
