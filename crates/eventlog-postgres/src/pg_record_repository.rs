//! `PostgreSQL` implementation of the `RecordRepository` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Executor, PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

use eventlog_core::error::StoreError;
use eventlog_core::event::{EntityId, Event, EventKey, LatestKey, TenantId};
use eventlog_core::filter::{EventFilter, Predicate};
use eventlog_core::id::EventId;
use eventlog_core::page::SortOrder;
use eventlog_core::repository::RecordRepository;

use crate::schema::{EXISTS_FOR_ENTITY, LOCK_ENTITY, SELECT_EVENTS, UPSERT_EVENT};

/// PostgreSQL-backed record repository.
///
/// `insert_if_absent` holds a transaction-scoped advisory lock on the
/// tenant and entity, so concurrent idempotent inserts for the same entity
/// are serialized. Plain `upsert` calls are not covered by that lock.
#[derive(Debug, Clone)]
pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    /// Creates a new `PgRecordRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a driver error onto the store's error kinds.
fn storage_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();
    match &err {
        sqlx::Error::Database(db) if db.code().is_some_and(|code| code.starts_with("23")) => {
            StoreError::ConstraintViolation(message)
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. } => StoreError::Decode(message),
        _ => StoreError::StorageUnavailable(message),
    }
}

fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    Ok(Event {
        id: EventId::from_uuid(row.try_get("id")?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id")?),
        entity_id: EntityId {
            entity_type: row.try_get("entity_type")?,
            id: row.try_get("entity_id")?,
        },
        event_type: row.try_get("event_type")?,
        event_uid: row.try_get("event_uid")?,
        body: row
            .try_get::<Option<serde_json::Value>, _>("body")?
            .unwrap_or_default(),
    })
}

fn events_from_rows(rows: &[PgRow]) -> Result<Vec<Event>, StoreError> {
    rows.iter()
        .map(|row| event_from_row(row).map_err(storage_error))
        .collect()
}

fn push_predicate(query: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::TenantIs(tenant_id) => query.push("tenant_id = ").push_bind(tenant_id.as_uuid()),
        Predicate::EntityTypeIs(entity_type) => {
            query.push("entity_type = ").push_bind(entity_type.clone())
        }
        Predicate::EntityIdIs(id) => query.push("entity_id = ").push_bind(*id),
        Predicate::EventTypeIs(event_type) => {
            query.push("event_type = ").push_bind(event_type.clone())
        }
        Predicate::IdAtLeast(id) => query.push("id >= ").push_bind(id.as_uuid()),
        Predicate::IdAtMost(id) => query.push("id <= ").push_bind(id.as_uuid()),
        Predicate::IdAfter(id) => query.push("id > ").push_bind(id.as_uuid()),
        Predicate::IdBefore(id) => query.push("id < ").push_bind(id.as_uuid()),
    };
}

fn push_where(query: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        query.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(query, predicate);
    }
}

fn push_order_and_page(
    query: &mut QueryBuilder<'_, Postgres>,
    order: SortOrder,
    limit: usize,
    offset: usize,
) {
    query.push(match order {
        SortOrder::Ascending => " ORDER BY id ASC",
        SortOrder::Descending => " ORDER BY id DESC",
    });
    query
        .push(" LIMIT ")
        .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    query
        .push(" OFFSET ")
        .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
}

fn latest_predicates(key: &LatestKey) -> [Predicate; 4] {
    [
        Predicate::TenantIs(key.tenant_id),
        Predicate::EntityTypeIs(key.entity_id.entity_type.clone()),
        Predicate::EntityIdIs(key.entity_id.id),
        Predicate::EventTypeIs(key.event_type.clone()),
    ]
}

async fn write_event<'e, E>(executor: E, event: &Event) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(UPSERT_EVENT)
        .bind(event.id.as_uuid())
        .bind(event.tenant_id.as_uuid())
        .bind(event.entity_id.entity_type.clone())
        .bind(event.entity_id.id)
        .bind(event.event_type.clone())
        .bind(event.event_uid.clone())
        .bind(event.body.clone())
        .execute(executor)
        .await?;
    Ok(())
}

async fn entity_exists<'e, E>(
    executor: E,
    tenant_id: TenantId,
    entity_id: &EntityId,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar::<Postgres, bool>(EXISTS_FOR_ENTITY)
        .bind(tenant_id.as_uuid())
        .bind(entity_id.entity_type.clone())
        .bind(entity_id.id)
        .fetch_one(executor)
        .await
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    async fn upsert(&self, event: Event) -> Result<Event, StoreError> {
        write_event(&self.pool, &event)
            .await
            .map_err(storage_error)?;
        Ok(event)
    }

    async fn find_one(&self, key: &EventKey) -> Result<Option<Event>, StoreError> {
        let mut query = QueryBuilder::new(SELECT_EVENTS);
        push_where(
            &mut query,
            &[
                Predicate::TenantIs(key.tenant_id),
                Predicate::EntityTypeIs(key.entity_id.entity_type.clone()),
                Predicate::EntityIdIs(key.entity_id.id),
                Predicate::EventTypeIs(key.event_type.clone()),
            ],
        );
        query
            .push(" AND event_uid = ")
            .push_bind(key.event_uid.clone())
            .push(" ORDER BY id LIMIT 1");

        let row = query
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.as_ref()
            .map(event_from_row)
            .transpose()
            .map_err(storage_error)
    }

    async fn exists_by_tenant_entity(
        &self,
        tenant_id: TenantId,
        entity_id: &EntityId,
    ) -> Result<bool, StoreError> {
        entity_exists(&self.pool, tenant_id, entity_id)
            .await
            .map_err(storage_error)
    }

    #[instrument(skip(self, filter), fields(predicates = filter.predicates().len()))]
    async fn scan(
        &self,
        filter: &EventFilter,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let mut query = QueryBuilder::new(SELECT_EVENTS);
        push_where(&mut query, filter.predicates());
        push_order_and_page(&mut query, order, limit, offset);
        debug!(sql = query.sql(), "scanning events");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        events_from_rows(&rows)
    }

    async fn top_n(&self, key: &LatestKey, limit: usize) -> Result<Vec<Event>, StoreError> {
        let mut query = QueryBuilder::new(SELECT_EVENTS);
        push_where(&mut query, &latest_predicates(key));
        push_order_and_page(&mut query, SortOrder::Descending, limit, 0);

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        events_from_rows(&rows)
    }

    #[instrument(skip(self, event), fields(event_id = %event.id, entity = %event.entity_id))]
    async fn insert_if_absent(&self, event: Event) -> Result<Option<Event>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let lock_key = format!(
            "{}:{}:{}",
            event.tenant_id, event.entity_id.entity_type, event.entity_id.id
        );
        sqlx::query(LOCK_ENTITY)
            .bind(lock_key)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;

        if entity_exists(&mut *tx, event.tenant_id, &event.entity_id)
            .await
            .map_err(storage_error)?
        {
            tx.commit().await.map_err(storage_error)?;
            return Ok(None);
        }

        write_event(&mut *tx, &event)
            .await
            .map_err(storage_error)?;
        tx.commit().await.map_err(storage_error)?;
        Ok(Some(event))
    }
}
