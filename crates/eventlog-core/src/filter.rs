//! Conjunctive event filters.
//!
//! A filter is a list of independent predicates over named event fields,
//! combined with logical AND. Callers only add predicates for the fields they
//! care about; an absent field is simply not constrained. Storage adapters
//! either evaluate [`EventFilter::matches`] directly or translate each
//! [`Predicate`] into their own query language.

use crate::event::{EntityId, Event, TenantId};
use crate::id::EventId;

/// A single equality or id-range constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `tenant_id = value`
    TenantIs(TenantId),
    /// `entity_type = value`
    EntityTypeIs(String),
    /// `entity_id = value`
    EntityIdIs(uuid::Uuid),
    /// `event_type = value`
    EventTypeIs(String),
    /// `id >= value`
    IdAtLeast(EventId),
    /// `id <= value`
    IdAtMost(EventId),
    /// `id > value`
    IdAfter(EventId),
    /// `id < value`
    IdBefore(EventId),
}

impl Predicate {
    /// Evaluates the predicate against an event.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::TenantIs(tenant_id) => event.tenant_id == *tenant_id,
            Self::EntityTypeIs(entity_type) => event.entity_id.entity_type == *entity_type,
            Self::EntityIdIs(id) => event.entity_id.id == *id,
            Self::EventTypeIs(event_type) => event.event_type == *event_type,
            Self::IdAtLeast(id) => event.id >= *id,
            Self::IdAtMost(id) => event.id <= *id,
            Self::IdAfter(id) => event.id > *id,
            Self::IdBefore(id) => event.id < *id,
        }
    }
}

/// AND-combination of predicates. The empty filter matches every event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    predicates: Vec<Predicate>,
}

impl EventFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Adds a predicate if present.
    #[must_use]
    pub fn and_maybe(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(predicate) => self.and(predicate),
            None => self,
        }
    }

    /// Adds several predicates.
    #[must_use]
    pub fn and_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Constrains both the entity type and the entity id.
    #[must_use]
    pub fn for_entity(self, entity_id: &EntityId) -> Self {
        self.and(Predicate::EntityTypeIs(entity_id.entity_type.clone()))
            .and(Predicate::EntityIdIs(entity_id.id))
    }

    /// The accumulated predicates, in insertion order.
    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether no predicate has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether `event` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.predicates.iter().all(|p| p.matches(event))
    }
}
