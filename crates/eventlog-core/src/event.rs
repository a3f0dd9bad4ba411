//! Event model.
//!
//! Callers build a [`NewEvent`], possibly leaving the id, tenant and uid
//! unset. The store completes those fields and persists an [`Event`], which
//! always carries all of them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id::EventId;

/// Owning tenant of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Sentinel tenant for system-level events that belong to no tenant.
    pub const SYSTEM: Self = Self(Uuid::nil());

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Whether this is the system sentinel.
    #[must_use]
    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }
}

impl From<Uuid> for TenantId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Reference to the domain entity an event is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    /// Kind of entity, e.g. `DEVICE`.
    pub entity_type: String,
    /// Entity identifier within its type.
    pub id: Uuid,
}

impl EntityId {
    /// Creates a new entity reference.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, id: Uuid) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// An event as submitted by a caller, before the store completes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Explicit identifier; generated when absent.
    #[serde(default)]
    pub id: Option<EventId>,
    /// Owning tenant; the system tenant when absent.
    #[serde(default)]
    pub tenant_id: Option<TenantId>,
    /// The entity the event describes.
    pub entity_id: EntityId,
    /// Discriminator of what occurred.
    pub event_type: String,
    /// De-duplication key; the string form of the id when absent or empty.
    #[serde(default)]
    pub event_uid: Option<String>,
    /// Opaque payload.
    #[serde(default)]
    pub body: serde_json::Value,
}

impl NewEvent {
    /// Creates an event with only the required fields set.
    #[must_use]
    pub fn new(entity_id: EntityId, event_type: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            id: None,
            tenant_id: None,
            entity_id,
            event_type: event_type.into(),
            event_uid: None,
            body,
        }
    }

    /// Sets an explicit identifier.
    #[must_use]
    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the owning tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the de-duplication key.
    #[must_use]
    pub fn with_uid(mut self, event_uid: impl Into<String>) -> Self {
        self.event_uid = Some(event_uid.into());
        self
    }
}

/// A persisted event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique, time-ordered identifier.
    pub id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The entity the event describes.
    pub entity_id: EntityId,
    /// Discriminator of what occurred.
    pub event_type: String,
    /// De-duplication key.
    pub event_uid: String,
    /// Opaque payload.
    pub body: serde_json::Value,
}

impl Event {
    /// Creation time decoded from the identifier.
    #[must_use]
    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        self.id.created_time()
    }

    /// The natural lookup key of this event.
    #[must_use]
    pub fn key(&self) -> EventKey {
        EventKey {
            tenant_id: self.tenant_id,
            entity_id: self.entity_id.clone(),
            event_type: self.event_type.clone(),
            event_uid: self.event_uid.clone(),
        }
    }
}

/// Five-part natural key: tenant, entity type, entity id, event type and uid.
///
/// Not unique at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The entity the event describes.
    pub entity_id: EntityId,
    /// Event type.
    pub event_type: String,
    /// De-duplication key.
    pub event_uid: String,
}

impl EventKey {
    /// Whether `event` has exactly this key.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        event.tenant_id == self.tenant_id
            && event.entity_id == self.entity_id
            && event.event_type == self.event_type
            && event.event_uid == self.event_uid
    }
}

/// Exact-match key for "most recent N" queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LatestKey {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The entity the event describes.
    pub entity_id: EntityId,
    /// Event type.
    pub event_type: String,
}

impl LatestKey {
    /// Whether `event` falls under this key.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        event.tenant_id == self.tenant_id
            && event.entity_id == self.entity_id
            && event.event_type == self.event_type
    }
}
