//! Record repository abstraction.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::event::{EntityId, Event, EventKey, LatestKey, TenantId};
use crate::filter::EventFilter;
use crate::page::SortOrder;

/// Physical storage for events, implemented by storage adapters.
///
/// The repository performs no field completion: every `Event` it receives is
/// already complete.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Unconditional write keyed by `event.id`. Returns the stored event.
    async fn upsert(&self, event: Event) -> Result<Event, StoreError>;

    /// Exact match on the five-part natural key. Returns the first match if
    /// several rows share the key.
    async fn find_one(&self, key: &EventKey) -> Result<Option<Event>, StoreError>;

    /// Whether any event exists for the tenant and entity, regardless of
    /// event type or uid.
    async fn exists_by_tenant_entity(
        &self,
        tenant_id: TenantId,
        entity_id: &EntityId,
    ) -> Result<bool, StoreError>;

    /// Events matching `filter`, ordered by id, skipping `offset` and
    /// returning at most `limit`.
    async fn scan(
        &self,
        filter: &EventFilter,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Event>, StoreError>;

    /// The `limit` newest events matching `key`, newest first.
    async fn top_n(&self, key: &LatestKey, limit: usize) -> Result<Vec<Event>, StoreError>;

    /// Inserts `event` unless an event already exists for its tenant and
    /// entity. Returns `None` when the insert was skipped.
    ///
    /// The default implementation is a plain read followed by a write and is
    /// NOT atomic: two concurrent callers can both observe "absent" and both
    /// insert. Adapters that can serialize the check and the write should
    /// override it.
    async fn insert_if_absent(&self, event: Event) -> Result<Option<Event>, StoreError> {
        if self
            .exists_by_tenant_entity(event.tenant_id, &event.entity_id)
            .await?
        {
            return Ok(None);
        }
        self.upsert(event).await.map(Some)
    }
}
