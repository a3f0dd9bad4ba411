//! Test repositories: `RecordRepository` implementations for tests.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use eventlog_core::error::StoreError;
use eventlog_core::event::{EntityId, Event, EventKey, LatestKey, TenantId};
use eventlog_core::filter::EventFilter;
use eventlog_core::id::EventId;
use eventlog_core::page::SortOrder;
use eventlog_core::repository::RecordRepository;

/// A repository holding events in memory, ordered by id.
///
/// `insert_if_absent` checks and writes under a single lock, so it is atomic
/// with respect to concurrent callers.
#[derive(Debug, Default)]
pub struct InMemoryRecordRepository {
    rows: RwLock<BTreeMap<EventId, Event>>,
    upsert_calls: AtomicUsize,
}

impl InMemoryRecordRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `events`. Seeding does not
    /// count towards `upsert_calls`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_events(events: impl IntoIterator<Item = Event>) -> Self {
        let repo = Self::new();
        repo.rows
            .write()
            .unwrap()
            .extend(events.into_iter().map(|e| (e.id, e)));
        repo
    }

    /// Number of stored events.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Whether no event is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of writes performed through `upsert` or `insert_if_absent`.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of all stored events, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn events(&self) -> Vec<Event> {
        self.rows.read().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordRepository {
    async fn upsert(&self, event: Event) -> Result<Event, StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.rows.write().unwrap().insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_one(&self, key: &EventKey) -> Result<Option<Event>, StoreError> {
        let rows = self.rows.read().unwrap();
        Ok(rows.values().find(|e| key.matches(e)).cloned())
    }

    async fn exists_by_tenant_entity(
        &self,
        tenant_id: TenantId,
        entity_id: &EntityId,
    ) -> Result<bool, StoreError> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .any(|e| e.tenant_id == tenant_id && e.entity_id == *entity_id))
    }

    async fn scan(
        &self,
        filter: &EventFilter,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = self.rows.read().unwrap();
        let matching = rows.values().filter(|e| filter.matches(e));
        let page = match order {
            SortOrder::Ascending => matching.skip(offset).take(limit).cloned().collect(),
            SortOrder::Descending => matching.rev().skip(offset).take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn top_n(&self, key: &LatestKey, limit: usize) -> Result<Vec<Event>, StoreError> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .rev()
            .filter(|e| key.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_if_absent(&self, event: Event) -> Result<Option<Event>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        if rows
            .values()
            .any(|e| e.tenant_id == event.tenant_id && e.entity_id == event.entity_id)
        {
            return Ok(None);
        }
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        rows.insert(event.id, event.clone());
        Ok(Some(event))
    }
}

/// A repository that always returns a storage error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingRecordRepository;

fn unavailable() -> StoreError {
    StoreError::StorageUnavailable("connection refused".into())
}

#[async_trait]
impl RecordRepository for FailingRecordRepository {
    async fn upsert(&self, _event: Event) -> Result<Event, StoreError> {
        Err(unavailable())
    }

    async fn find_one(&self, _key: &EventKey) -> Result<Option<Event>, StoreError> {
        Err(unavailable())
    }

    async fn exists_by_tenant_entity(
        &self,
        _tenant_id: TenantId,
        _entity_id: &EntityId,
    ) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn scan(
        &self,
        _filter: &EventFilter,
        _order: SortOrder,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<Event>, StoreError> {
        Err(unavailable())
    }

    async fn top_n(&self, _key: &LatestKey, _limit: usize) -> Result<Vec<Event>, StoreError> {
        Err(unavailable())
    }
}

#[cfg(test)]
mod tests {
    use eventlog_core::filter::Predicate;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::SteppingIdGenerator;
    use eventlog_core::id::IdGenerator;

    fn event(ids: &SteppingIdGenerator, entity_id: &EntityId, event_type: &str) -> Event {
        let id = ids.next_id();
        Event {
            id,
            tenant_id: TenantId::SYSTEM,
            entity_id: entity_id.clone(),
            event_type: event_type.to_owned(),
            event_uid: id.to_string(),
            body: json!({}),
        }
    }

    #[tokio::test]
    async fn test_scan_orders_and_pages_by_id() {
        let ids = SteppingIdGenerator::default();
        let device = EntityId::new("DEVICE", Uuid::new_v4());
        let events: Vec<Event> = (0..5).map(|_| event(&ids, &device, "STATS")).collect();
        let repo = InMemoryRecordRepository::with_events(events.clone());

        let asc = repo
            .scan(&EventFilter::new(), SortOrder::Ascending, 2, 1)
            .await
            .unwrap();
        let desc = repo
            .scan(&EventFilter::new(), SortOrder::Descending, 2, 0)
            .await
            .unwrap();

        assert_eq!(asc, vec![events[1].clone(), events[2].clone()]);
        assert_eq!(desc, vec![events[4].clone(), events[3].clone()]);
    }

    #[tokio::test]
    async fn test_scan_applies_filter() {
        let ids = SteppingIdGenerator::default();
        let device = EntityId::new("DEVICE", Uuid::new_v4());
        let repo = InMemoryRecordRepository::with_events(vec![
            event(&ids, &device, "STATS"),
            event(&ids, &device, "LIFECYCLE"),
        ]);
        let filter = EventFilter::new().and(Predicate::EventTypeIs("LIFECYCLE".into()));

        let found = repo
            .scan(&filter, SortOrder::Ascending, 10, 0)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].event_type, "LIFECYCLE");
    }

    #[tokio::test]
    async fn test_insert_if_absent_skips_existing_entity() {
        let ids = SteppingIdGenerator::default();
        let device = EntityId::new("DEVICE", Uuid::new_v4());
        let repo = InMemoryRecordRepository::new();

        let first = repo
            .insert_if_absent(event(&ids, &device, "LIFECYCLE"))
            .await
            .unwrap();
        let second = repo
            .insert_if_absent(event(&ids, &device, "STATS"))
            .await
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.upsert_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_repository_reports_unavailable() {
        let result = FailingRecordRepository
            .scan(&EventFilter::new(), SortOrder::Ascending, 1, 0)
            .await;

        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
    }
}
