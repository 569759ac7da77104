//! Handlers for `/dashboard` and `/reports/*`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/dashboard` | Counts, next events, every check-in |
//! | `GET`  | `/reports/attendees` | |
//! | `GET`  | `/reports/ministries` | |
//! | `GET`  | `/reports/ministry-attendance/{ministry}` | Optional `?event_id=` |
//! | `GET`  | `/reports/ministry-absent/{event}` | Optional `?ministry_id=` |
//! | `GET`  | `/reports/elder/{elder}` | Optional `?event_id=` |
//! | `GET`  | `/reports/elder-absent/{elder}/{event}` | |
//! | `GET`  | `/reports/roster/{ministry}` | |
//! | `GET`  | `/reports/users-without-ministry` | `?active=` defaults to true |
//! | `GET`  | `/reports/no-active-ministry` | `?active_only=` defaults to false |
//! | `GET`  | `/reports/inactive-members` | |
//! | `POST` | `/reports/generate-all` | ZIP of per-ministry CSVs |

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State},
  http::header,
  response::IntoResponse,
};
use flock_core::{
  ministry::Ministry,
  report::{
    AbsentMember, Attendee, Dashboard, ElderAbsentRow, ElderReportRow, InactiveMember,
    MemberStatus, MinistryAttendance, RosterRow,
  },
  store::RosterStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  events::UPCOMING_GRACE,
  export::{BUNDLE_NAME, absent_csv, attendance_csv, safe_name, zip_files},
  now,
  optional_body,
};

/// Query flags arrive as `true`/`false` or `1`/`0`.
fn flag(raw: Option<&str>, default: bool) -> bool {
  match raw.map(|v| v.trim().to_lowercase()) {
    Some(v) if v == "true" || v == "1" => true,
    Some(v) if v == "false" || v == "0" => false,
    _ => default,
  }
}

#[derive(Debug, Deserialize)]
pub struct EventFilter {
  pub event_id: Option<i64>,
}

// ─── Dashboard ────────────────────────────────────────────────────────────────

/// `GET /dashboard`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Dashboard>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let now = now();
  let dashboard = state
    .store
    .dashboard(now.date(), now - UPCOMING_GRACE)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(dashboard))
}

// ─── Attendance ───────────────────────────────────────────────────────────────

/// `GET /reports/attendees`
pub async fn attendees<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Attendee>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.attendees().await.map_err(ApiError::store)?))
}

/// `GET /reports/ministries`
pub async fn ministries<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<Ministry>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.list_ministries(false).await.map_err(ApiError::store)?))
}

/// `GET /reports/ministry-attendance/{ministry}[?event_id=]`
pub async fn ministry_attendance<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(ministry_id): Path<i64>,
  Query(filter): Query<EventFilter>,
) -> ApiResult<Json<Vec<MinistryAttendance>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .ministry_attendance(ministry_id, filter.event_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct MinistryFilter {
  pub ministry_id: Option<i64>,
}

/// `GET /reports/ministry-absent/{event}[?ministry_id=]`
pub async fn ministry_absent<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(event_id): Path<i64>,
  Query(filter): Query<MinistryFilter>,
) -> ApiResult<Json<Vec<AbsentMember>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .ministry_absent(filter.ministry_id, Some(event_id))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/elder/{elder}[?event_id=]`
pub async fn elder<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(elder_id): Path<i64>,
  Query(filter): Query<EventFilter>,
) -> ApiResult<Json<Vec<ElderReportRow>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .elder_report(elder_id, filter.event_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/elder-absent/{elder}/{event}`
pub async fn elder_absent<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path((elder_id, event_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Vec<ElderAbsentRow>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .elder_absent(elder_id, event_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/roster/{ministry}`
pub async fn roster<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Path(ministry_id): Path<i64>,
) -> ApiResult<Json<Vec<RosterRow>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.roster(ministry_id).await.map_err(ApiError::store)?))
}

// ─── Membership gaps ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActiveParams {
  pub active:      Option<String>,
  pub active_only: Option<String>,
}

/// `GET /reports/users-without-ministry[?active=]`
pub async fn users_without_ministry<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<ActiveParams>,
) -> ApiResult<Json<Vec<MemberStatus>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .members_without_active_ministry(flag(params.active.as_deref(), true))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/no-active-ministry[?active_only=]`
pub async fn no_active_ministry<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  Query(params): Query<ActiveParams>,
) -> ApiResult<Json<Vec<MemberStatus>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let rows = state
    .store
    .members_without_active_ministry(flag(params.active_only.as_deref(), false))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

/// `GET /reports/inactive-members`
pub async fn inactive_members<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
) -> ApiResult<Json<Vec<InactiveMember>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(state.store.inactive_members().await.map_err(ApiError::store)?))
}

// ─── Bundle ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateBody {
  pub event_id: Option<i64>,
}

/// `POST /reports/generate-all`: one attendance and one absence CSV per active
/// ministry, zipped. The body (`{event_id}`) is optional.
pub async fn generate_all<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  body: Bytes,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let GenerateBody { event_id } = optional_body(&body)?;

  let ministries = state.store.list_ministries(true).await.map_err(ApiError::store)?;
  let mut files = Vec::with_capacity(ministries.len() * 2);
  for ministry in &ministries {
    let stem = safe_name(&ministry.name, ministry.id);
    let present = state
      .store
      .ministry_attendance(ministry.id, event_id)
      .await
      .map_err(ApiError::store)?;
    let absent = state
      .store
      .ministry_absent(Some(ministry.id), event_id)
      .await
      .map_err(ApiError::store)?;
    files.push((format!("attendance_{stem}.csv"), attendance_csv(&present)?));
    files.push((format!("absent_{stem}.csv"), absent_csv(&absent)?));
  }

  let archive = zip_files(files)?;
  tracing::info!(ministries = ministries.len(), ?event_id, bytes = archive.len(), "report bundle built");
  Ok((
    [
      (header::CONTENT_TYPE, "application/zip".to_owned()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{BUNDLE_NAME}\"")),
    ],
    archive,
  ))
}

#[cfg(test)]
mod tests {
  use super::flag;

  #[test]
  fn flags_accept_words_and_digits() {
    assert!(flag(Some("1"), false));
    assert!(flag(Some("TRUE"), false));
    assert!(!flag(Some("0"), true));
    assert!(flag(None, true));
    assert!(!flag(Some("maybe"), false));
  }
}
