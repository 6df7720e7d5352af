//! Resource-role grants.

use serde::{Deserialize, Serialize};

use super::one_or_many;
use crate::{Error, Result};

/// The only supported `generateResource` directive.
pub const GENERATE_ID: &str = "id";

/// A stored grant binding a role to zero or more resources.
///
/// A missing `resource` list means the grant is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRole {
    /// Role identifier in the role catalog.
    pub sys_role: String,

    /// Resources the grant applies to.
    #[serde(
        default,
        deserialize_with = "one_or_many::option::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource: Option<Vec<String>>,

    /// Assignment-time directive; resolved before storage and never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_resource: Option<String>,

    /// Id of the principal that granted this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegator: Option<String>,
}

impl ResourceRole {
    /// Creates an unrestricted grant of `sys_role`.
    #[must_use]
    pub fn new(sys_role: impl Into<String>) -> Self {
        Self {
            sys_role: sys_role.into(),
            resource: None,
            generate_resource: None,
            delegator: None,
        }
    }

    /// Restricts the grant to the given resources.
    #[must_use]
    pub fn with_resource<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource = Some(resources.into_iter().map(Into::into).collect());
        self
    }

    /// Requests the `"id"` directive: the holder's own id is added to
    /// `resource` at assignment time.
    #[must_use]
    pub fn generating_id(mut self) -> Self {
        self.generate_resource = Some(GENERATE_ID.to_string());
        self
    }

    /// Records the granting principal.
    #[must_use]
    pub fn with_delegator(mut self, delegator: impl Into<String>) -> Self {
        self.delegator = Some(delegator.into());
        self
    }

    /// Returns the resource list, or `None` if unrestricted.
    #[must_use]
    pub fn resources(&self) -> Option<&[String]> {
        self.resource.as_deref()
    }

    /// Resolves the `generateResource` directive against `holder_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] for any directive other than `"id"`.
    pub fn resolve_directive(&self, holder_id: &str) -> Result<Self> {
        match self.generate_resource.as_deref() {
            None => Ok(self.clone()),
            Some(GENERATE_ID) => Ok(generate_resource(self, holder_id)),
            Some(other) => Err(Error::NotSupported(format!(
                "unknown generateResource directive '{other}' on role '{}'",
                self.sys_role
            ))),
        }
    }

    /// Merges `other`'s resources into this entry, deduplicated.
    ///
    /// An unrestricted side makes the merged entry unrestricted.
    pub fn merge_resources(&mut self, other: Option<&[String]>) {
        let Some(extra) = other else {
            self.resource = None;
            return;
        };
        if let Some(existing) = self.resource.as_mut() {
            for resource in extra {
                if !existing.contains(resource) {
                    existing.push(resource.clone());
                }
            }
        }
    }
}

/// Returns a copy of `role` with `id` inserted into its resource list and
/// the directive removed.
#[must_use]
pub fn generate_resource(role: &ResourceRole, id: &str) -> ResourceRole {
    let mut role = role.clone();
    let resources = role.resource.get_or_insert_with(Vec::new);
    if !resources.iter().any(|r| r == id) {
        resources.push(id.to_string());
    }
    role.generate_resource = None;
    role
}

/// Resolves directives on every entry.
///
/// # Errors
///
/// Returns [`Error::NotSupported`] on the first unknown directive.
pub fn resolve_directives(roles: &[ResourceRole], holder_id: &str) -> Result<Vec<ResourceRole>> {
    roles
        .iter()
        .map(|role| role.resolve_directive(holder_id))
        .collect()
}
