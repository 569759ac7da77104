//! Handlers for `/elders` endpoints. Elders live in their own table; ids here
//! are bare integers.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use flock_core::{
  person::{Person, PersonRef},
  store::RosterStore,
};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  people::{ActiveBody, CreateBody, apply_active, insert},
};

/// `GET /elders`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Person>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_elders().await.map_err(ApiError::store)?))
}

/// `POST /elders`: same body as `POST /users`; the role, when given, must be
/// `elder`.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(mut body): Json<CreateBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  match body.role.as_deref().map(str::trim) {
    None | Some("") => body.role = Some("elder".into()),
    Some(r) if r.eq_ignore_ascii_case("elder") => {}
    Some(_) => return Err(ApiError::BadRequest("Role must be 'elder'".into())),
  }
  let (person, ministry_ids) = body.into_new_person()?;
  let created = insert(&state, person, ministry_ids).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /elders/{id}/details`
pub async fn details<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let details = state
    .store
    .person_details(PersonRef::elder(id))
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Elder not found".into()))?;
  Ok(Json(json!({ "user": details.user, "ministries": details.ministries })))
}

/// `PATCH /elders/{id}/active`
pub async fn set_active<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(id): Path<i64>,
  Json(body): Json<ActiveBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  apply_active(&state, PersonRef::elder(id), body.active, "Elder not found").await
}

/// `DELETE /elders/{id}`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let deleted = state
    .store
    .delete_person(PersonRef::elder(id))
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound("Elder not found".into()));
  }
  tracing::info!(elder_id = id, "elder deleted");
  Ok(Json(json!({ "message": "Elder deleted successfully" })))
}
