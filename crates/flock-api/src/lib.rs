//! JSON REST API for Flock.
//!
//! Exposes an axum [`Router`] backed by any [`RosterStore`]. Staff routes
//! expect a bearer token from `/api/auth/login`; kiosk routes expect one from
//! `/api/kiosk/session/start`; webhook routes check a shared secret.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, flock_api::app(state)).await?;
//! ```

pub mod accounts;
pub mod auth;
pub mod checkins;
pub mod cognito;
pub mod dedup;
pub mod elders;
pub mod email;
pub mod error;
pub mod events;
pub mod export;
pub mod families;
pub mod import;
pub mod kiosk;
pub mod ministries;
pub mod people;
pub mod reports;
pub mod uploads;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  http::StatusCode,
  response::IntoResponse,
  routing::{delete, get, patch, post, put},
};
use chrono::{Local, NaiveDateTime};
use flock_core::store::RosterStore;
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::trace::TraceLayer;

pub use auth::AuthConfig;
pub use dedup::DedupCache;
pub use error::{ApiError, ApiResult};

/// Largest request body accepted anywhere (CSV imports included).
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared secret for the Cognito webhooks. `None` rejects every delivery.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
  pub secret: Option<String>,
}

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: RosterStore> {
  pub store:       Arc<S>,
  pub auth:        Arc<AuthConfig>,
  pub webhooks:    Arc<WebhookConfig>,
  pub dedup:       Arc<DedupCache>,
  pub uploads_dir: Arc<PathBuf>,
}

impl<S: RosterStore> AppState<S> {
  pub fn new(
    store: S,
    auth: AuthConfig,
    webhooks: WebhookConfig,
    dedup_ttl: Duration,
    uploads_dir: PathBuf,
  ) -> Self {
    Self {
      store:       Arc::new(store),
      auth:        Arc::new(auth),
      webhooks:    Arc::new(webhooks),
      dedup:       Arc::new(DedupCache::new(dedup_ttl)),
      uploads_dir: Arc::new(uploads_dir),
    }
  }
}

/// Local wall-clock time; events and check-ins carry no timezone.
pub(crate) fn now() -> NaiveDateTime { Local::now().naive_local() }

/// Decode a JSON body that clients may omit entirely.
pub(crate) fn optional_body<T: DeserializeOwned + Default>(body: &[u8]) -> ApiResult<T> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(T::default());
  }
  serde_json::from_slice(body)
    .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The complete application: health probes, the `/api` tree, the JSON 404
/// fallback, request tracing and the body limit.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(health))
    .nest("/api", api_router(state))
    .fallback(not_found)
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .layer(TraceLayer::new_for_http())
}

/// Build the `/api` router for `state`.
pub fn api_router<S>(state: AppState<S>) -> Router
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Auth and accounts
    .route("/auth/login", post(auth::login::<S>))
    .route("/admins", post(accounts::create_admin::<S>))
    // Users
    .route("/users", get(people::list::<S>).post(people::create::<S>))
    .route("/users/all", get(people::with_ministries::<S>))
    .route("/users/elders", get(people::elders::<S>))
    .route("/users/lookup", get(people::lookup::<S>))
    .route("/users/masterlist", get(people::masterlist::<S>))
    .route("/users/{person}", put(people::update::<S>).delete(people::remove::<S>))
    .route("/users/{person}/details", get(people::details::<S>))
    .route("/users/{person}/active", patch(people::set_active::<S>))
    // Elders
    .route("/elders", get(elders::list::<S>).post(elders::create::<S>))
    .route("/elders/{id}", delete(elders::remove::<S>))
    .route("/elders/{id}/details", get(elders::details::<S>))
    .route("/elders/{id}/active", patch(elders::set_active::<S>))
    // Families
    .route("/families", get(families::list::<S>).post(families::create::<S>))
    .route("/families/{id}/members", get(families::members::<S>))
    .route("/familySearch", get(families::search::<S>))
    // Ministries
    .route("/ministries", get(ministries::list::<S>).post(ministries::create::<S>))
    .route("/ministries/{id}", put(ministries::update::<S>).delete(ministries::remove::<S>))
    // Events
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route("/events/upcoming", get(events::upcoming::<S>))
    .route(
      "/events/{id}",
      get(events::get_one::<S>).put(events::update::<S>).delete(events::remove::<S>),
    )
    // Check-ins
    .route("/checkins", post(checkins::create::<S>))
    .route("/checkins/all", get(checkins::list::<S>))
    .route("/checkins/bulk-checkout", post(checkins::bulk_checkout::<S>))
    .route("/checkins/event/{id}/detailed", get(checkins::for_event::<S>))
    .route("/checkins/{id}", delete(checkins::remove::<S>))
    // Dashboard and reports
    .route("/dashboard", get(reports::dashboard::<S>))
    .route("/reports/attendees", get(reports::attendees::<S>))
    .route("/reports/ministries", get(reports::ministries::<S>))
    .route("/reports/ministry-attendance/{ministry}", get(reports::ministry_attendance::<S>))
    .route("/reports/ministry-absent/{event}", get(reports::ministry_absent::<S>))
    .route("/reports/elder/{elder}", get(reports::elder::<S>))
    .route("/reports/elder-absent/{elder}/{event}", get(reports::elder_absent::<S>))
    .route("/reports/roster/{ministry}", get(reports::roster::<S>))
    .route("/reports/users-without-ministry", get(reports::users_without_ministry::<S>))
    .route("/reports/no-active-ministry", get(reports::no_active_ministry::<S>))
    .route("/reports/inactive-members", get(reports::inactive_members::<S>))
    .route("/reports/generate-all", post(reports::generate_all::<S>))
    // Import, uploads, email
    .route("/import/users", post(import::users::<S>))
    .route("/uploads/avatar", post(uploads::avatar::<S>))
    .route("/email/send-reports", post(email::send_reports::<S>))
    // Kiosk
    .route("/kiosk/session/start", post(kiosk::start_session::<S>))
    .route("/kiosk/events", get(kiosk::events::<S>))
    .route("/kiosk/search", get(kiosk::search::<S>))
    .route("/kiosk/checkins", post(kiosk::check_in::<S>))
    .route("/kiosk/checkins/bulk", post(kiosk::bulk_check_in::<S>))
    .route("/kiosk/checkouts/bulk", post(kiosk::bulk_check_out::<S>))
    // Cognito webhooks
    .route("/integrations/cognito/volunteer-ministry/add", post(cognito::volunteer_add::<S>))
    .route(
      "/integrations/cognito/volunteer-ministry/remove",
      post(cognito::volunteer_remove::<S>),
    )
    .route("/integrations/cognito/helps-member/submit", post(cognito::helps_submit::<S>))
    .route("/integrations/cognito/helps-member/update", post(cognito::helps_update::<S>))
    .route("/integrations/cognito/helps-member/delete", post(cognito::helps_delete::<S>))
    .route("/integrations/cognito/helps-member/change", post(cognito::helps_change::<S>))
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> { Json(json!({ "ok": true })) }

async fn not_found() -> impl IntoResponse {
  (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" })))
}
