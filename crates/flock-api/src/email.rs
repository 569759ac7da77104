//! `POST /email/send-reports`: accepts a report mailing request.
//!
//! No mail is sent; the request is validated, logged and acknowledged.

use axum::{Json, extract::State};
use flock_core::store::RosterStore;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendReportsBody {
  pub event_id:    Option<i64>,
  pub ministries:  Vec<i64>,
  pub template_id: Option<String>,
  pub attach:      bool,
}

pub async fn send_reports<S>(
  State(_state): State<AppState<S>>,
  staff: Staff,
  Json(body): Json<SendReportsBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  staff.require_manager()?;
  let event_id = body
    .event_id
    .ok_or_else(|| ApiError::BadRequest("event_id required".into()))?;

  tracing::info!(
    event_id,
    ministries = ?body.ministries,
    template = ?body.template_id,
    attach = body.attach,
    requested_by = staff.id,
    "report email queued"
  );
  Ok(Json(json!({
    "ok":          true,
    "queued":      true,
    "event_id":    event_id,
    "ministries":  body.ministries,
    "template_id": body.template_id,
    "attach":      body.attach,
  })))
}
