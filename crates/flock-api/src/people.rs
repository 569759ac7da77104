//! Handlers for `/users` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/users` | Members and elders; optional `?search=` |
//! | `GET`    | `/users/all` | One row per user/ministry link |
//! | `GET`    | `/users/elders` | |
//! | `GET`    | `/users/lookup` | `?phone=` digits match |
//! | `GET`    | `/users/masterlist` | Everyone with their ministries |
//! | `GET`    | `/users/{ref}/details` | 404 if not found |
//! | `POST`   | `/users` | Role decides the table |
//! | `PUT`    | `/users/{ref}` | Admin; may move the row between tables |
//! | `PATCH`  | `/users/{ref}/active` | Admin |
//! | `DELETE` | `/users/{ref}?role=` | Admin |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use flock_core::{
  person::{
    MasterlistEntry, NewPerson, Person, PersonDetails, PersonKind, PersonRef, PersonSummary,
    PersonUpdate, Role, UserMinistryRow, digits_only, normalize_email,
  },
  store::RosterStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
};

pub(crate) fn parse_ref(raw: &str) -> ApiResult<PersonRef> {
  raw.parse().map_err(|_| ApiError::BadRequest("Invalid id".into()))
}

pub(crate) fn trimmed(v: Option<String>) -> Option<String> {
  v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

// ─── Reads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub search: Option<String>,
}

/// `GET /users[?search=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<PersonSummary>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let people = state
    .store
    .list_people(trimmed(params.search))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(people))
}

/// `GET /users/all`
pub async fn with_ministries<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<UserMinistryRow>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.users_with_ministries().await.map_err(ApiError::store)?))
}

/// `GET /users/elders`
pub async fn elders<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Person>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_elders().await.map_err(ApiError::store)?))
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
  pub phone: Option<String>,
}

/// `GET /users/lookup?phone=`
pub async fn lookup<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<LookupParams>,
) -> ApiResult<Json<Vec<Person>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let digits = params.phone.as_deref().map(digits_only).unwrap_or_default();
  if digits.is_empty() {
    return Ok(Json(Vec::new()));
  }
  let people = state
    .store
    .lookup_users_by_phone(digits)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(people))
}

/// `GET /users/masterlist`
pub async fn masterlist<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<MasterlistEntry>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.masterlist().await.map_err(ApiError::store)?))
}

/// `GET /users/{ref}/details`
pub async fn details<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(raw): Path<String>,
) -> ApiResult<Json<PersonDetails>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let person = parse_ref(&raw)?;
  let details = state
    .store
    .person_details(person)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
  Ok(Json(details))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBody {
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub alt_phone:    Option<String>,
  pub role:         Option<String>,
  pub gender:       Option<String>,
  pub avatar:       Option<String>,
  pub family_id:    Option<i64>,
  pub active:       Option<bool>,
  pub ministry_ids: Vec<i64>,
}

impl CreateBody {
  /// Validate names and role, producing the row to insert.
  pub(crate) fn into_new_person(self) -> ApiResult<(NewPerson, Vec<i64>)> {
    let (Some(first_name), Some(last_name), Some(role)) =
      (trimmed(self.first_name), trimmed(self.last_name), trimmed(self.role))
    else {
      return Err(ApiError::BadRequest("Missing required fields.".into()));
    };
    let role = Role::parse(&role)?;

    let mut person = NewPerson::new(first_name, last_name, role);
    person.email = self.email.as_deref().and_then(normalize_email);
    person.phone = trimmed(self.phone);
    person.alt_phone = trimmed(self.alt_phone);
    person.gender = trimmed(self.gender);
    person.avatar = trimmed(self.avatar);
    person.family_id = self.family_id;
    person.active = self.active.unwrap_or(true);
    Ok((person, self.ministry_ids))
  }
}

pub(crate) async fn insert<S>(
  state: &AppState<S>,
  person: NewPerson,
  ministry_ids: Vec<i64>,
) -> ApiResult<Person>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let created = state
    .store
    .create_person(person)
    .await
    .map_err(|e| ApiError::store(e).on_conflict("Email already exists."))?;
  for ministry_id in ministry_ids {
    state
      .store
      .attach_ministry(created.person_ref(), ministry_id)
      .await
      .map_err(ApiError::store)?;
  }
  tracing::info!(person = %created.person_ref(), "person created");
  Ok(created)
}

/// `POST /users`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(body): Json<CreateBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (person, ministry_ids) = body.into_new_person()?;
  let created = insert(&state, person, ministry_ids).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// `PUT /users/{ref}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(raw): Path<String>,
  Json(mut update): Json<PersonUpdate>,
) -> ApiResult<Json<Person>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let person = parse_ref(&raw)?;
  if let Some(role) = update.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
    Role::parse(role)?;
  }
  update.email = update.email.map(|e| e.trim().to_lowercase());

  let updated = state
    .store
    .update_person(person, update)
    .await
    .map_err(|e| match ApiError::store(e) {
      ApiError::NotFound(_) => ApiError::NotFound("User not found".into()),
      other => other.on_conflict("Email already exists."),
    })?;

  if updated.person_ref() != person {
    tracing::info!(from = %person, to = %updated.person_ref(), "person moved between tables");
  }
  Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  #[serde(alias = "is_active")]
  pub active: bool,
}

pub(crate) async fn apply_active<S>(
  state: &AppState<S>,
  person: PersonRef,
  active: bool,
  not_found: &str,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let found = state
    .store
    .set_active(person, active)
    .await
    .map_err(ApiError::store)?;
  if !found {
    return Err(ApiError::NotFound(not_found.to_owned()));
  }
  Ok(Json(json!({ "success": true })))
}

/// `PATCH /users/{ref}/active`
pub async fn set_active<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(raw): Path<String>,
  Json(body): Json<ActiveBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  apply_active(&state, parse_ref(&raw)?, body.active, "User not found").await
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  pub role: Option<String>,
}

/// `DELETE /users/{ref}[?role=elder]`
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  staff: Staff,
  Path(raw): Path<String>,
  Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let mut person = parse_ref(&raw)?;
  if params.role.as_deref().is_some_and(|r| r.trim().eq_ignore_ascii_case("elder")) {
    person = PersonRef::elder(person.id);
  }

  let deleted = state
    .store
    .delete_person(person)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::NotFound("Record not found".into()));
  }

  let label = match person.kind {
    PersonKind::User => "User",
    PersonKind::Elder => "Elder",
  };
  tracing::info!(%person, "person deleted");
  Ok(Json(json!({ "message": format!("{label} deleted successfully") })))
}
