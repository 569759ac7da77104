//! Handlers for `/families` and `/familySearch`.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use flock_core::{
  family::{Family, FamilyMember, FamilySearch},
  store::RosterStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  people::trimmed,
};

/// `GET /families`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Family>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_families().await.map_err(ApiError::store)?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBody {
  pub family_name: Option<String>,
}

/// `POST /families`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Json(body): Json<CreateBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let name = trimmed(body.family_name)
    .ok_or_else(|| ApiError::BadRequest("Family name required".into()))?;
  let family = state.store.create_family(name).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(family)))
}

/// `GET /families/{id}/members`
pub async fn members<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(id): Path<i64>,
) -> ApiResult<Json<Vec<FamilyMember>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.family_members(id).await.map_err(ApiError::store)?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub name:      Option<String>,
  pub family_id: Option<String>,
}

impl SearchParams {
  /// `family_id` wins over `name`.
  fn mode(self) -> ApiResult<FamilySearch> {
    if let Some(raw) = trimmed(self.family_id) {
      return raw
        .parse()
        .map(FamilySearch::ById)
        .map_err(|_| ApiError::BadRequest("Invalid family_id.".into()));
    }
    trimmed(self.name)
      .map(FamilySearch::ByName)
      .ok_or_else(|| ApiError::BadRequest("Missing search parameters.".into()))
  }
}

/// `GET /familySearch?family_id=` or `?name=`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<FamilyMember>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let found = state
    .store
    .search_families(params.mode()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(found))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn params(name: Option<&str>, family_id: Option<&str>) -> SearchParams {
    SearchParams { name: name.map(Into::into), family_id: family_id.map(Into::into) }
  }

  #[test]
  fn family_id_takes_precedence() {
    assert_eq!(params(Some("Lee"), Some("3")).mode().unwrap(), FamilySearch::ById(3));
    assert_eq!(params(Some(" Lee "), None).mode().unwrap(), FamilySearch::ByName("Lee".into()));
  }

  #[test]
  fn empty_search_is_rejected() {
    assert!(matches!(params(None, Some(" ")).mode(), Err(ApiError::BadRequest(_))));
    assert!(matches!(params(None, Some("x")).mode(), Err(ApiError::BadRequest(_))));
  }
}
