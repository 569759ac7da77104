//! Handlers for `/admins`.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use flock_core::{
  account::{NewAdmin, ROLE_ADMIN},
  person::normalize_email,
  store::RosterStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{Staff, hash_password},
  error::{ApiError, ApiResult},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateAdminBody {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub username:   Option<String>,
  pub password:   Option<String>,
}

fn required(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

/// `POST /admins`: any signed-in staff member may add an admin.
pub async fn create_admin<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Json(body): Json<CreateAdminBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let missing = || ApiError::BadRequest("Missing required fields".into());
  let first_name = required(body.first_name).ok_or_else(missing)?;
  let last_name = required(body.last_name).ok_or_else(missing)?;
  let username = required(body.username).ok_or_else(missing)?.to_lowercase();
  let password = body.password.filter(|p| !p.is_empty()).ok_or_else(missing)?;

  let admin = state
    .store
    .create_admin(NewAdmin {
      first_name,
      last_name,
      email: body.email.as_deref().and_then(normalize_email),
      phone: required(body.phone),
      username,
      password_hash: hash_password(&password)?,
      role: ROLE_ADMIN.to_owned(),
    })
    .await
    .map_err(|e| ApiError::store(e).on_conflict("Username already exists"))?;

  tracing::info!(admin_id = admin.id, created_by = staff.id, "admin created");
  Ok((StatusCode::CREATED, Json(admin)))
}
