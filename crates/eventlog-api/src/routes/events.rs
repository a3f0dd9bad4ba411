//! Routes for storing and querying events.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use eventlog_core::event::{EntityId, Event, NewEvent, TenantId};
use eventlog_core::id::EventId;
use eventlog_core::page::TimePageLink;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

/// Response body for an accepted asynchronous save.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// Identifier assigned to the event.
    pub id: EventId,
}

/// Query string for GET /events.
#[derive(Debug, Deserialize)]
pub struct FindEventsQuery {
    /// Restrict to one tenant.
    pub tenant_id: Option<Uuid>,
    /// Entity type; must be given together with `entity_id`.
    pub entity_type: Option<String>,
    /// Entity id; must be given together with `entity_type`.
    pub entity_id: Option<Uuid>,
    /// Restrict to one event type.
    pub event_type: Option<String>,
    /// Inclusive lower bound on creation time.
    pub start_time: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time.
    pub end_time: Option<DateTime<Utc>>,
    /// Page size.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Oldest first when set.
    #[serde(default)]
    pub asc_order: bool,
    /// Last id of the previous page.
    pub id_offset: Option<EventId>,
}

impl FindEventsQuery {
    fn entity(&self) -> Result<Option<EntityId>, ApiError> {
        match (&self.entity_type, self.entity_id) {
            (Some(entity_type), Some(id)) => Ok(Some(EntityId::new(entity_type.clone(), id))),
            (None, None) => Ok(None),
            _ => Err(ApiError::BadRequest(
                "entity_type and entity_id must be supplied together".into(),
            )),
        }
    }

    fn page_link(&self) -> TimePageLink {
        TimePageLink {
            limit: self.limit,
            start_time: self.start_time,
            end_time: self.end_time,
            asc_order: self.asc_order,
            id_offset: self.id_offset,
        }
    }
}

/// Query string for GET .../events/latest.
#[derive(Debug, Deserialize)]
pub struct LatestEventsQuery {
    /// Event type to select.
    pub event_type: String,
    /// Number of events.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// POST /events
#[instrument(skip(state, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
async fn save_event(
    State(state): State<AppState>,
    Json(event): Json<NewEvent>,
) -> Result<Json<Event>, ApiError> {
    let saved = state.event_store.save(event).await?;
    info!(event_id = %saved.id, "event saved");
    Ok(Json(saved))
}

/// POST /events/async
#[instrument(skip(state, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
async fn save_event_async(
    State(state): State<AppState>,
    Json(event): Json<NewEvent>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let pending = state.event_store.save_async(event);
    let id = pending.event_id();
    info!(event_id = %id, "event save dispatched");
    (StatusCode::ACCEPTED, Json(AcceptedResponse { id }))
}

/// POST /events/if-absent
#[instrument(skip(state, event), fields(entity = %event.entity_id, event_type = %event.event_type))]
async fn save_event_if_absent(
    State(state): State<AppState>,
    Json(event): Json<NewEvent>,
) -> Result<Response, ApiError> {
    match state.event_store.save_if_not_exists(event).await? {
        Some(saved) => {
            info!(event_id = %saved.id, "event saved");
            Ok((StatusCode::CREATED, Json(saved)).into_response())
        }
        None => {
            info!("entity already has an event; nothing saved");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

/// GET /events
#[instrument(skip(state))]
async fn find_events(
    State(state): State<AppState>,
    Query(query): Query<FindEventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let entity_id = query.entity()?;
    let events = state
        .event_store
        .find_events(
            query.tenant_id.map(TenantId::from_uuid),
            entity_id.as_ref(),
            query.event_type.as_deref(),
            &query.page_link(),
        )
        .await?;
    Ok(Json(events))
}

/// GET /tenants/{tenant_id}/entities/{entity_type}/{entity_id}/events/latest
#[instrument(skip(state))]
async fn find_latest_events(
    State(state): State<AppState>,
    Path((tenant_id, entity_type, entity_id)): Path<(Uuid, String, Uuid)>,
    Query(query): Query<LatestEventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = state
        .event_store
        .find_latest_events(
            TenantId::from_uuid(tenant_id),
            &EntityId::new(entity_type, entity_id),
            &query.event_type,
            query.limit,
        )
        .await?;
    Ok(Json(events))
}

/// GET /tenants/{tenant_id}/entities/{entity_type}/{entity_id}/events/{event_type}/{event_uid}
#[instrument(skip(state))]
async fn find_event(
    State(state): State<AppState>,
    Path((tenant_id, entity_type, entity_id, event_type, event_uid)): Path<(
        Uuid,
        String,
        Uuid,
        String,
        String,
    )>,
) -> Result<Json<Event>, ApiError> {
    state
        .event_store
        .find_event(
            TenantId::from_uuid(tenant_id),
            &EntityId::new(entity_type, entity_id),
            &event_type,
            &event_uid,
        )
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("event {event_type}/{event_uid}")))
}

/// Returns the router for event storage and queries.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(save_event).get(find_events))
        .route("/events/async", post(save_event_async))
        .route("/events/if-absent", post(save_event_if_absent))
        .route(
            "/tenants/{tenant_id}/entities/{entity_type}/{entity_id}/events/latest",
            get(find_latest_events),
        )
        .route(
            "/tenants/{tenant_id}/entities/{entity_type}/{entity_id}/events/{event_type}/{event_uid}",
            get(find_event),
        )
}
