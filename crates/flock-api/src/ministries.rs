//! Handlers for `/ministries`. Mutations are admin-only.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use flock_core::{
  ministry::{Ministry, MinistryInput},
  store::RosterStore,
};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
};

const DUPLICATE: &str = "Ministry name already exists.";

fn name_of(input: &MinistryInput) -> ApiResult<String> {
  input
    .trimmed_name()
    .map(str::to_owned)
    .ok_or_else(|| ApiError::BadRequest("Name is required.".into()))
}

/// `GET /ministries`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Ministry>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_ministries(false).await.map_err(ApiError::store)?))
}

/// `POST /ministries`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Json(input): Json<MinistryInput>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let ministry = state
    .store
    .create_ministry(name_of(&input)?, input.active)
    .await
    .map_err(|e| ApiError::store(e).on_conflict(DUPLICATE))?;
  tracing::info!(ministry_id = ministry.id, name = %ministry.name, "ministry created");
  Ok((StatusCode::CREATED, Json(ministry)))
}

/// `PUT /ministries/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(id): Path<i64>,
  Json(input): Json<MinistryInput>,
) -> ApiResult<Json<Ministry>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let ministry = state
    .store
    .update_ministry(id, name_of(&input)?, input.active)
    .await
    .map_err(|e| ApiError::store(e).on_conflict(DUPLICATE))?
    .ok_or_else(|| ApiError::NotFound("Ministry not found.".into()))?;
  Ok(Json(ministry))
}

/// `DELETE /ministries/{id}`: refused with 409 while people still belong to it.
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
    .delete_ministry(id)
    .await
    .map_err(|e| ApiError::store(e).on_conflict("Ministry is in use and cannot be deleted."))?;
  if !deleted {
    return Err(ApiError::NotFound("Ministry not found.".into()));
  }
  Ok(Json(json!({ "ok": true })))
}
