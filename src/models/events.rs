//! Identity lifecycle events.

use super::identity::IdentityId;
use super::meta::IdentityStatus;
use crate::current_timestamp;
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Id of the acting principal (`None` for full trust).
    pub actor: Option<String>,
    /// Timestamp (Unix epoch seconds).
    pub timestamp: u64,
}

impl EventMeta {
    /// Creates event metadata using the current timestamp.
    #[must_use]
    pub fn new(actor: Option<String>) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            actor,
            timestamp: current_timestamp(),
        }
    }
}

/// Events emitted after a mutation commits.
#[derive(Debug, Clone)]
pub enum IdentityEvent {
    /// An identity was inserted.
    Inserted {
        /// Event metadata.
        meta: EventMeta,
        /// The new identity.
        id: IdentityId,
    },
    /// Identity attributes were patched.
    Updated {
        /// Event metadata.
        meta: EventMeta,
        /// The identity.
        id: IdentityId,
        /// Sequence after the update.
        sequence: u64,
        /// Top-level fields touched by the patch.
        fields: Vec<String>,
    },
    /// Identity status changed.
    StatusChanged {
        /// Event metadata.
        meta: EventMeta,
        /// The identity.
        id: IdentityId,
        /// New status.
        status: IdentityStatus,
        /// Sequence after the update.
        sequence: u64,
    },
    /// Resource roles were added or removed.
    RolesChanged {
        /// Event metadata.
        meta: EventMeta,
        /// The identity.
        id: IdentityId,
        /// Number of entries added.
        added: usize,
        /// Number of entries removed.
        removed: usize,
        /// Sequence after the update.
        sequence: u64,
    },
}

impl IdentityEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::Updated { .. } => "updated",
            Self::StatusChanged { .. } => "status_changed",
            Self::RolesChanged { .. } => "roles_changed",
        }
    }

    /// Returns the identity the event concerns.
    #[must_use]
    pub const fn id(&self) -> &IdentityId {
        match self {
            Self::Inserted { id, .. }
            | Self::Updated { id, .. }
            | Self::StatusChanged { id, .. }
            | Self::RolesChanged { id, .. } => id,
        }
    }
}
