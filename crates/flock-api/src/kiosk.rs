//! Handlers for the unattended check-in terminal (`/kiosk/*`).
//!
//! A session starts with an optional kiosk code and yields a short-lived
//! kiosk token; every other route requires that token. Entity ids are person
//! refs (`user-12`, `elder-3`, or a bare number).

use axum::{
  Json,
  body::Bytes,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Duration;
use flock_core::{
  checkin::{KioskFamily, KioskQuery, KioskSearchMode, group_by_family},
  event::Event,
  person::PersonRef,
  store::RosterStore,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::KioskSession,
  error::{ApiError, ApiResult},
  now,
  optional_body,
};

/// How far back a kiosk still offers an event.
pub const EVENT_WINDOW: Duration = Duration::hours(12);
pub const EVENT_LIMIT: usize = 200;

async fn kiosk_events<S>(state: &AppState<S>) -> ApiResult<Vec<Event>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .events_since(now() - EVENT_WINDOW, Some(EVENT_LIMIT))
    .await
    .map_err(ApiError::store)
}

/// An integer sent either as a JSON number or as a numeric string.
fn int_of(v: &Value) -> Option<i64> {
  match v {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn person_of(v: &Value) -> Option<PersonRef> {
  match v {
    Value::Number(n) => n.as_i64().map(PersonRef::user),
    Value::String(s) => s.parse().ok(),
    _ => None,
  }
}

// ─── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartBody {
  pub kiosk_code: Option<String>,
}

/// `POST /kiosk/session/start`
pub async fn start_session<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let StartBody { kiosk_code } = optional_body(&body)?;

  let kiosk_id = match kiosk_code.map(|c| c.trim().to_owned()).filter(|c| !c.is_empty()) {
    Some(code) => {
      let kiosk = state
        .store
        .find_active_kiosk(code)
        .await
        .map_err(ApiError::store)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid kiosk code".into()))?;
      Some(kiosk.id)
    }
    None => None,
  };

  let token = state.auth.issue_kiosk_token(kiosk_id)?;
  let events = kiosk_events(&state).await?;
  let kiosk = match kiosk_id {
    Some(id) => json!({ "id": id }),
    None => json!({ "id": null, "anonymous": true }),
  };
  tracing::info!(?kiosk_id, "kiosk session started");

  Ok(Json(json!({ "token": token, "kiosk": kiosk, "events": events })))
}

/// `GET /kiosk/events`
pub async fn events<S>(
  State(state): State<AppState<S>>,
  _kiosk: KioskSession,
) -> ApiResult<Json<Vec<Event>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Ok(Json(kiosk_events(&state).await?))
}

// ─── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub q:        Option<String>,
  pub mode:     Option<String>,
  pub event_id: Option<String>,
  pub limit:    Option<String>,
}

impl SearchParams {
  fn into_query(self) -> Option<KioskQuery> {
    let text = self.q.map(|q| q.trim().to_owned()).filter(|q| !q.is_empty())?;
    Some(KioskQuery {
      text,
      mode: self.mode.as_deref().map(KioskSearchMode::parse).unwrap_or_default(),
      event_id: self.event_id.and_then(|e| e.trim().parse().ok()),
      limit: KioskQuery::clamp_limit(self.limit.and_then(|l| l.trim().parse().ok())),
    })
  }
}

/// `GET /kiosk/search?q=&mode=name|phone&event_id=&limit=`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  _kiosk: KioskSession,
  Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<KioskFamily>>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let Some(query) = params.into_query() else {
    return Ok(Json(Vec::new()));
  };
  let matches = state.store.kiosk_search(query).await.map_err(ApiError::store)?;
  Ok(Json(group_by_family(matches)))
}

// ─── Check-in / check-out ─────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CheckInBody {
  pub event_id:  Value,
  pub entity_id: Value,
}

/// `POST /kiosk/checkins`: insert unless already checked in.
pub async fn check_in<S>(
  State(state): State<AppState<S>>,
  _kiosk: KioskSession,
  Json(body): Json<CheckInBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (Some(event_id), Some(person)) = (int_of(&body.event_id), person_of(&body.entity_id)) else {
    return Err(ApiError::BadRequest("Missing event_id or entity_id".into()));
  };

  let inserted = state
    .store
    .check_in_if_absent(person, event_id, now())
    .await
    .map_err(ApiError::store)?;

  let checkin = match inserted {
    Some(checkin) => {
      let event = state.store.get_event(event_id).await.map_err(ApiError::store)?;
      tracing::info!(%person, event_id, "kiosk check-in");
      json!({
        "id":           checkin.id,
        "event_id":     checkin.event_id,
        "entity_id":    person.id,
        "checkin_time": checkin.checkin_time,
        "location":     event.as_ref().and_then(|e| e.location.clone()),
        "event_title":  event.as_ref().map(|e| e.title.clone()),
        "event":        event,
      })
    }
    None => Value::Null,
  };

  Ok((StatusCode::CREATED, Json(json!({ "ok": true, "checkin": checkin }))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BulkBody {
  pub event_id:   Value,
  pub entity_ids: Vec<Value>,
}

impl BulkBody {
  /// The event and every parseable person; the raw id count is kept so
  /// unparseable ids count as skipped.
  fn parts(&self) -> ApiResult<(i64, Vec<PersonRef>)> {
    match int_of(&self.event_id) {
      Some(event_id) if !self.entity_ids.is_empty() => {
        Ok((event_id, self.entity_ids.iter().filter_map(person_of).collect()))
      }
      _ => Err(ApiError::BadRequest("Missing event_id or entity_ids".into())),
    }
  }
}

/// `POST /kiosk/checkins/bulk`
pub async fn bulk_check_in<S>(
  State(state): State<AppState<S>>,
  _kiosk: KioskSession,
  Json(body): Json<BulkBody>,
) -> ApiResult<impl IntoResponse>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (event_id, people) = body.parts()?;
  let outcome = state
    .store
    .bulk_check_in(event_id, people, now())
    .await
    .map_err(ApiError::store)?;
  let skipped = body.entity_ids.len() - outcome.inserted;
  tracing::info!(event_id, inserted = outcome.inserted, skipped, "kiosk bulk check-in");

  Ok((
    StatusCode::CREATED,
    Json(json!({ "ok": true, "inserted": outcome.inserted, "skipped": skipped })),
  ))
}

/// `POST /kiosk/checkouts/bulk`: remove each person's latest check-in.
pub async fn bulk_check_out<S>(
  State(state): State<AppState<S>>,
  _kiosk: KioskSession,
  Json(body): Json<BulkBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (event_id, people) = body.parts()?;
  let affected = state
    .store
    .bulk_check_out(event_id, people)
    .await
    .map_err(ApiError::store)?;
  tracing::info!(event_id, affected, "kiosk bulk check-out");
  Ok(Json(json!({ "ok": true, "affected": affected })))
}
