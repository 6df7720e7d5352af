//! Identity records.
//!
//! An identity is a user or a group. Besides the handful of fields the
//! authorization engine reasons about (`id`, `type`, `owner`, `memberOf`),
//! an identity carries arbitrary attributes whose mutation is governed by
//! a configured allow-list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::meta::Meta;
use super::one_or_many;

/// Type marker for group identities.
pub const GROUP_TYPE: &str = "Group";

/// Globally unique identity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityId(String);

impl IdentityId {
    /// Creates a new identity ID from the given string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random `urn:uuid:` identity ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("urn:uuid:{}", uuid::Uuid::new_v4()))
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdentityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdentityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for IdentityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user or group identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Globally unique, immutable identifier.
    pub id: IdentityId,

    /// Identity types (`Identity`, `Group`, ...).
    #[serde(
        rename = "type",
        default,
        with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub kind: Vec<String>,

    /// Owning identity; owners satisfy permission checks written against
    /// this identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<IdentityId>,

    /// Groups this identity claims to belong to.
    #[serde(
        default,
        deserialize_with = "one_or_many::deserialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub member_of: Vec<IdentityId>,

    /// Remaining attribute fields.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Identity {
    /// Creates an identity of type `Identity` with no attributes.
    #[must_use]
    pub fn new(id: impl Into<IdentityId>) -> Self {
        Self {
            id: id.into(),
            kind: vec!["Identity".to_string()],
            owner: None,
            member_of: Vec::new(),
            attributes: Map::new(),
        }
    }

    /// Creates a group identity.
    #[must_use]
    pub fn group(id: impl Into<IdentityId>) -> Self {
        let mut identity = Self::new(id);
        identity.kind.push(GROUP_TYPE.to_string());
        identity
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<IdentityId>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Adds a group membership.
    #[must_use]
    pub fn with_member_of(mut self, group: impl Into<IdentityId>) -> Self {
        self.member_of.push(group.into());
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if the identity is typed as a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind.iter().any(|k| k == GROUP_TYPE)
    }

    /// Returns `true` if the identity carries the given type.
    #[must_use]
    pub fn has_type(&self, kind: &str) -> bool {
        self.kind.iter().any(|k| k == kind)
    }

    /// Returns the `email` attribute, if it is a string.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.attributes.get("email").and_then(Value::as_str)
    }

    /// Returns `memberOf` with duplicates removed, first occurrence wins.
    #[must_use]
    pub fn normalized_member_of(&self) -> Vec<IdentityId> {
        let mut seen = std::collections::HashSet::new();
        self.member_of
            .iter()
            .filter(|group| seen.insert(group.as_str()))
            .cloned()
            .collect()
    }

    /// Resource list used when checking permissions over this identity:
    /// its own id plus its owner, if any.
    #[must_use]
    pub fn resource_list(&self) -> Vec<String> {
        let mut resources = vec![self.id.to_string()];
        if let Some(owner) = &self.owner
            && owner != &self.id
        {
            resources.push(owner.to_string());
        }
        resources
    }
}

/// An identity together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// The identity document.
    pub identity: Identity,
    /// Status, sequence, and held resource roles.
    pub meta: Meta,
}

impl IdentityRecord {
    /// Returns the record's identity ID.
    #[must_use]
    pub const fn id(&self) -> &IdentityId {
        &self.identity.id
    }

    /// Returns `true` if the record is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.meta.status.is_active()
    }
}
