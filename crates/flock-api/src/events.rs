//! Handlers for `/events` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Duration;
use flock_core::{
  event::{Event, EventInput},
  store::RosterStore,
};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  now,
};

/// How long after its start an event still counts as upcoming.
pub const UPCOMING_GRACE: Duration = Duration::hours(1);

fn not_found() -> ApiError { ApiError::NotFound("Event not found".into()) }

/// `GET /events`: newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Event>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_events().await.map_err(ApiError::store)?))
}

/// `GET /events/upcoming`
pub async fn upcoming<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Event>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let events = state
    .store
    .events_since(now() - UPCOMING_GRACE, None)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

/// `GET /events/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Event>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(event))
}

/// `POST /events`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(input): Json<EventInput>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .create_event(input.normalize()?)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(event_id = event.id, title = %event.title, "event created");
  Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /events/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
  Json(input): Json<EventInput>,
) -> ApiResult<Json<Event>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .update_event(id, input.normalize()?)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(not_found)?;
  Ok(Json(event))
}

/// `DELETE /events/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  if !state.store.delete_event(id).await.map_err(ApiError::store)? {
    return Err(not_found());
  }
  Ok(Json(json!({ "message": "Event deleted successfully" })))
}
