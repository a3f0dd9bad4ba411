//! The event store.
//!
//! `EventStore` completes the fields a caller may leave unset (id, uid and
//! tenant), then delegates to a `RecordRepository`. Queries are expressed as
//! an `EventFilter` built from whichever criteria the caller supplied.

use std::fmt;
use std::sync::Arc;

use eventlog_core::error::StoreError;
use eventlog_core::event::{EntityId, Event, EventKey, LatestKey, NewEvent, TenantId};
use eventlog_core::filter::{EventFilter, Predicate};
use eventlog_core::id::{IdGenerator, TimeUuidGenerator};
use eventlog_core::page::TimePageLink;
use eventlog_core::repository::RecordRepository;
use tokio::runtime::Handle;
use tracing::{Instrument, debug, instrument, trace, warn};

use crate::pending::PendingSave;

/// Stateless coordinator over a shared `RecordRepository`.
#[derive(Clone)]
pub struct EventStore {
    repository: Arc<dyn RecordRepository>,
    ids: Arc<dyn IdGenerator>,
    executor: Option<Handle>,
}

impl fmt::Debug for EventStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStore")
            .field("ids", &self.ids)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl EventStore {
    /// Creates a store generating v7 UUIDs and running asynchronous saves on
    /// the ambient tokio runtime.
    #[must_use]
    pub fn new(repository: Arc<dyn RecordRepository>) -> Self {
        Self {
            repository,
            ids: Arc::new(TimeUuidGenerator),
            executor: None,
        }
    }

    /// Replaces the identifier generator.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Runs asynchronous saves on `executor` instead of the ambient runtime.
    #[must_use]
    pub fn with_executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Fills in id, uid and tenant. Never fails.
    fn complete(&self, event: NewEvent) -> Event {
        let id = event.id.unwrap_or_else(|| self.ids.next_id());
        let event_uid = event
            .event_uid
            .filter(|uid| !uid.is_empty())
            .unwrap_or_else(|| id.to_string());
        let tenant_id = event.tenant_id.unwrap_or_else(|| {
            trace!(tenant_id = %TenantId::SYSTEM, "saving system event");
            TenantId::SYSTEM
        });
        Event {
            id,
            tenant_id,
            entity_id: event.entity_id,
            event_type: event.event_type,
            event_uid,
            body: event.body,
        }
    }

    /// Completes and writes an event unconditionally.
    ///
    /// # Errors
    ///
    /// Returns the repository's `StoreError` if the write fails.
    #[instrument(skip(self, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
    pub async fn save(&self, event: NewEvent) -> Result<Event, StoreError> {
        let event = self.complete(event);
        debug!(event_id = %event.id, tenant_id = %event.tenant_id, "saving event");
        self.repository.upsert(event).await
    }

    /// Completes an event on the caller's task and hands the write to the
    /// executor.
    ///
    /// No ordering is guaranteed between concurrent saves. Without a
    /// configured executor the ambient tokio runtime is used; if there is
    /// none, nothing is written and the returned save resolves to
    /// `StoreError::TaskAborted`.
    pub fn save_async(&self, event: NewEvent) -> PendingSave {
        let event = self.complete(event);
        let event_id = event.id;

        let executor = match &self.executor {
            Some(executor) => Ok(executor.clone()),
            None => Handle::try_current(),
        };
        let executor = match executor {
            Ok(executor) => executor,
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "no runtime to run event save");
                return PendingSave::rejected(event_id, StoreError::TaskAborted(e.to_string()));
            }
        };
        debug!(event_id = %event_id, tenant_id = %event.tenant_id, "dispatching event save");

        let repository = Arc::clone(&self.repository);
        let task = async move { repository.upsert(event).await }.in_current_span();
        PendingSave::new(event_id, executor.spawn(task))
    }

    /// Completes and writes an event unless one already exists for the same
    /// tenant and entity. Returns `None` when the write was skipped.
    ///
    /// The existence check ignores event type and uid. Whether check and
    /// write are atomic depends on the repository's `insert_if_absent`.
    ///
    /// # Errors
    ///
    /// Returns the repository's `StoreError` if the check or the write fails.
    #[instrument(skip(self, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
    pub async fn save_if_not_exists(&self, event: NewEvent) -> Result<Option<Event>, StoreError> {
        let event = self.complete(event);
        debug!(event_id = %event.id, tenant_id = %event.tenant_id, "saving event if absent");
        let saved = self.repository.insert_if_absent(event).await?;
        if saved.is_none() {
            debug!("entity already has an event; skipped");
        }
        Ok(saved)
    }

    /// Looks up an event by its natural key.
    ///
    /// # Errors
    ///
    /// Returns the repository's `StoreError` if the lookup fails.
    #[instrument(skip(self), fields(entity = %entity_id))]
    pub async fn find_event(
        &self,
        tenant_id: TenantId,
        entity_id: &EntityId,
        event_type: &str,
        event_uid: &str,
    ) -> Result<Option<Event>, StoreError> {
        let key = EventKey {
            tenant_id,
            entity_id: entity_id.clone(),
            event_type: event_type.to_owned(),
            event_uid: event_uid.to_owned(),
        };
        self.repository.find_one(&key).await
    }

    /// One page of events matching the supplied criteria, ordered by id.
    ///
    /// Absent criteria are not constrained. A zero `limit` yields an empty
    /// page without querying the repository.
    ///
    /// # Errors
    ///
    /// Returns the repository's `StoreError` if the scan fails.
    #[instrument(skip(self, entity_id), fields(entity = ?entity_id.map(ToString::to_string)))]
    pub async fn find_events(
        &self,
        tenant_id: Option<TenantId>,
        entity_id: Option<&EntityId>,
        event_type: Option<&str>,
        page_link: &TimePageLink,
    ) -> Result<Vec<Event>, StoreError> {
        if page_link.limit == 0 {
            return Ok(Vec::new());
        }
        let filter = events_filter(tenant_id, entity_id, event_type, page_link);
        self.repository
            .scan(&filter, page_link.sort_order(), page_link.limit, 0)
            .await
    }

    /// The `limit` most recent events of one type for an entity, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns the repository's `StoreError` if the query fails.
    #[instrument(skip(self), fields(entity = %entity_id))]
    pub async fn find_latest_events(
        &self,
        tenant_id: TenantId,
        entity_id: &EntityId,
        event_type: &str,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let key = LatestKey {
            tenant_id,
            entity_id: entity_id.clone(),
            event_type: event_type.to_owned(),
        };
        self.repository.top_n(&key, limit).await
    }
}

fn events_filter(
    tenant_id: Option<TenantId>,
    entity_id: Option<&EntityId>,
    event_type: Option<&str>,
    page_link: &TimePageLink,
) -> EventFilter {
    let mut filter = EventFilter::new().and_maybe(tenant_id.map(Predicate::TenantIs));
    if let Some(entity_id) = entity_id {
        filter = filter.for_entity(entity_id);
    }
    filter
        .and_maybe(event_type.map(|t| Predicate::EventTypeIs(t.to_owned())))
        .and_all(page_link.id_predicates())
}
