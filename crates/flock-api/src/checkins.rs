//! Handlers for staff-side `/checkins` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use flock_core::{
  checkin::{CheckInDetail, CheckInListing},
  person::PersonRef,
  store::RosterStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  now,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBody {
  /// A bare id or a person ref such as `elder-3`.
  pub user_id:  Option<PersonRef>,
  pub elder_id: Option<i64>,
  pub event_id: Option<i64>,
}

impl CreateBody {
  fn person(&self) -> Option<PersonRef> {
    self.elder_id.map(PersonRef::elder).or(self.user_id)
  }
}

/// `POST /checkins`: one check-in per person and event; a repeat is 409.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(body): Json<CreateBody>,
) -> ApiResult<Response>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (Some(person), Some(event_id)) = (body.person(), body.event_id) else {
    return Err(ApiError::BadRequest("Missing required fields.".into()));
  };

  match state.store.check_in(person, event_id, now()).await.map_err(ApiError::store) {
    Ok(checkin) => {
      tracing::info!(%person, event_id, "checked in");
      let body = json!({ "message": "Checked in successfully", "checkin": checkin });
      Ok((StatusCode::CREATED, Json(body)).into_response())
    }
    Err(ApiError::Conflict(message)) => {
      let (user_id, elder_id) = if person.is_elder() {
        (None, Some(person.id))
      } else {
        (Some(person.id), None)
      };
      let body = json!({
        "message":   message,
        "duplicate": true,
        "user_id":   user_id,
        "elder_id":  elder_id,
      });
      Ok((StatusCode::CONFLICT, Json(body)).into_response())
    }
    Err(e) => Err(e),
  }
}

/// `DELETE /checkins/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  if !state.store.delete_checkin(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound("Check-in not found".into()));
  }
  Ok(Json(json!({ "message": "Check-in deleted successfully" })))
}

/// `GET /checkins/all`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<CheckInListing>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_checkins().await.map_err(ApiError::store)?))
}

/// `GET /checkins/event/{id}/detailed`
pub async fn for_event<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(event_id): Path<i64>,
) -> ApiResult<Json<Vec<CheckInDetail>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.event_checkins(event_id).await.map_err(ApiError::store)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkCheckoutBody {
  pub ids: Option<Vec<i64>>,
}

/// `POST /checkins/bulk-checkout`: delete check-ins by id.
pub async fn bulk_checkout<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(body): Json<BulkCheckoutBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let ids = body
    .ids
    .filter(|ids| !ids.is_empty())
    .ok_or_else(|| ApiError::BadRequest("Invalid ids array.".into()))?;
  let removed = state.store.delete_checkins(ids).await.map_err(ApiError::store)?;
  tracing::info!(removed, "bulk check-out");
  Ok(Json(json!({ "success": true, "message": "Bulk check-out complete." })))
}
