//! Data models for warden.
//!
//! Identities, their bookkeeping, resource-role grants, and the values the
//! authorization engine derives from them.

mod capability;
mod events;
mod filter;
mod identity;
mod meta;
pub(crate) mod one_or_many;
mod patch;
mod principal;
mod resource_role;
mod role;

pub use capability::Capability;
pub use events::{EventMeta, IdentityEvent};
pub use filter::IdentityFilter;
pub use identity::{GROUP_TYPE, Identity, IdentityId, IdentityRecord};
pub use meta::{IdentityStatus, Meta, MetaInput};
pub use patch::{IdentityPatch, PatchOp, PatchOperation};
pub use principal::Principal;
pub use resource_role::{GENERATE_ID, ResourceRole, generate_resource, resolve_directives};
pub use role::{Role, RoleStatus};
