//! Derived capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (permission, resource-list) pair derived from a [`ResourceRole`].
///
/// `resource == None` means the capability is unrestricted. Capabilities
/// are values: translation produces a new capability rather than mutating
/// an existing one.
///
/// [`ResourceRole`]: super::ResourceRole
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability {
    /// The permission granted.
    pub permission: String,
    /// The resources the permission applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<String>>,
}

impl Capability {
    /// Creates an unrestricted capability.
    #[must_use]
    pub fn unrestricted(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            resource: None,
        }
    }

    /// Creates a capability over the given resources.
    #[must_use]
    pub fn scoped<I, S>(permission: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permission: permission.into(),
            resource: Some(resources.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns `true` if the capability has no resource restriction.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        self.resource.is_none()
    }

    /// Returns the resource list, or `None` if unrestricted.
    #[must_use]
    pub fn resources(&self) -> Option<&[String]> {
        self.resource.as_deref()
    }

    /// Returns a capability with `extra` appended to the resource list,
    /// skipping resources already present.
    ///
    /// Unrestricted capabilities are returned unchanged.
    #[must_use]
    pub fn with_resources<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(resources) = self.resource.as_mut() {
            for resource in extra {
                let resource = resource.into();
                if !resources.contains(&resource) {
                    resources.push(resource);
                }
            }
        }
        self
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            None => write!(f, "{} (unrestricted)", self.permission),
            Some(resources) => write!(f, "{} over [{}]", self.permission, resources.join(", ")),
        }
    }
}
