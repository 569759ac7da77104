//! Cognito form webhooks (`/integrations/cognito/*`).
//!
//! Every route checks the shared secret first. The legacy volunteer-ministry
//! routes do their work inline and answer with the outcome. The helps-member
//! submit/update/change routes validate what they can without the database,
//! acknowledge at once, and finish in a spawned task; retried deliveries of
//! the same entry are dropped by the [`DedupCache`](crate::DedupCache).
//!
//! Responses here use `{ok, ...}` bodies rather than the `{message}` shape of
//! the staff API.

use std::collections::HashMap;

use axum::{
  Json,
  body::Bytes,
  extract::{FromRequestParts, Query, State},
  http::{StatusCode, request::Parts},
  response::{IntoResponse, Response},
};
use flock_core::{
  intake::{
    AttachRequest, IntakeError, change_request, entry_id, helps_member, mask_secret, top_keys,
    unwrap_payload, volunteer_addition, volunteer_removal,
  },
  person::{NewPerson, Person, PersonRef, Role},
  store::RosterStore,
};
use serde_json::{Value, json};

use crate::AppState;

pub const SECRET_HEADER: &str = "x-nlm-webhook-secret";

// ─── Replies ──────────────────────────────────────────────────────────────────

/// A webhook response: status plus JSON body.
#[derive(Debug)]
pub struct Reply(pub StatusCode, pub Value);

impl Reply {
  fn ok(body: Value) -> Self { Self(StatusCode::OK, body) }

  fn fail(status: StatusCode, message: impl Into<String>) -> Self {
    Self(status, json!({ "ok": false, "message": message.into() }))
  }

  fn rejected(e: &IntakeError) -> Self {
    let status = match e {
      IntakeError::UnknownPerson => StatusCode::NOT_FOUND,
      IntakeError::MissingIdentifier | IntakeError::MissingMinistry | IntakeError::MissingNames => {
        StatusCode::BAD_REQUEST
      }
    };
    Self::fail(status, e.to_string())
  }
}

impl IntoResponse for Reply {
  fn into_response(self) -> Response { (self.0, Json(self.1)).into_response() }
}

// ─── Secret ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
  Header,
  Query,
}

impl SecretSource {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Header => "header:x-nlm-webhook-secret",
      Self::Query => "query:secret",
    }
  }
}

/// Proof that the request carried the configured webhook secret.
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth {
  pub source: SecretSource,
}

impl<S> FromRequestParts<AppState<S>> for WebhookAuth
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  type Rejection = Reply;

  async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self, Reply> {
    let Some(expected) = state.webhooks.secret.as_deref().map(str::trim).filter(|s| !s.is_empty())
    else {
      return Err(Reply::fail(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Webhook secret is not set (webhook endpoints are disabled).",
      ));
    };

    let header = parts
      .headers
      .get(SECRET_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(str::to_owned);
    let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
      .ok()
      .and_then(|Query(q)| q.get("secret").map(|s| s.trim().to_owned()))
      .filter(|s| !s.is_empty());

    let (source, got) = match (header, query) {
      (Some(h), _) => (Some(SecretSource::Header), h),
      (None, Some(q)) => (Some(SecretSource::Query), q),
      (None, None) => (None, String::new()),
    };

    match source {
      Some(source) if got == expected => Ok(WebhookAuth { source }),
      _ => {
        tracing::warn!(
          endpoint = %parts.uri.path(),
          source = source.map_or("none", SecretSource::as_str),
          got = %mask_secret(&got),
          expected = %mask_secret(expected),
          "invalid webhook secret"
        );
        Err(Reply::fail(StatusCode::UNAUTHORIZED, "Invalid webhook secret"))
      }
    }
  }
}

fn parse_body(endpoint: &str, auth: WebhookAuth, body: &[u8]) -> Result<Value, Reply> {
  let value = if body.iter().all(u8::is_ascii_whitespace) {
    json!({})
  } else {
    serde_json::from_slice(body)
      .map_err(|_| Reply::fail(StatusCode::BAD_REQUEST, "Invalid JSON body"))?
  };
  tracing::info!(
    endpoint,
    source = auth.source.as_str(),
    body_keys = ?top_keys(&value),
    unwrapped_keys = ?top_keys(unwrap_payload(&value)),
    "cognito webhook hit"
  );
  Ok(value)
}

// ─── Intake operations ────────────────────────────────────────────────────────

/// Outcome of a successful attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
  pub user_id:       i64,
  pub ministry_id:   i64,
  pub ministry_name: String,
  pub created_user:  bool,
}

#[derive(Debug)]
pub enum IntakeFailure {
  Rejected(IntakeError),
  Store(String),
}

impl IntakeFailure {
  fn reply(&self) -> Reply {
    match self {
      Self::Rejected(e) => Reply::rejected(e),
      Self::Store(e) => {
        tracing::error!(error = %e, "webhook store failure");
        Reply::fail(StatusCode::INTERNAL_SERVER_ERROR, "Webhook failed")
      }
    }
  }
}

fn store_failure<E: std::fmt::Display>(e: E) -> IntakeFailure { IntakeFailure::Store(e.to_string()) }

async fn resolve_user<S: RosterStore>(
  store: &S,
  req: &AttachRequest,
) -> Result<Option<Person>, IntakeFailure> {
  store
    .find_user(req.identity.email_key(), req.identity.phone_key())
    .await
    .map_err(store_failure)
}

/// Find or (when allowed) create the person, then link them to the ministry,
/// creating the ministry if needed.
pub async fn attach<S: RosterStore>(store: &S, req: &AttachRequest) -> Result<Attached, IntakeFailure> {
  let ministry_name = req.validate().map_err(IntakeFailure::Rejected)?.to_owned();

  let (user, created_user) = match resolve_user(store, req).await? {
    Some(user) => (user, false),
    None if !req.allow_create => return Err(IntakeFailure::Rejected(IntakeError::UnknownPerson)),
    None => {
      let (first, last) = req.identity.names().map_err(IntakeFailure::Rejected)?;
      let mut person = NewPerson::new(first, last, Role::Volunteer);
      person.email = req.identity.email_key();
      person.phone = req.identity.phone.clone();
      (store.create_person(person).await.map_err(store_failure)?, true)
    }
  };

  let ministry = store.ensure_ministry(ministry_name).await.map_err(store_failure)?;
  store
    .attach_ministry(PersonRef::user(user.id), ministry.id)
    .await
    .map_err(store_failure)?;

  Ok(Attached {
    user_id: user.id,
    ministry_id: ministry.id,
    ministry_name: ministry.name,
    created_user,
  })
}

fn attached_body(a: &Attached) -> Value {
  json!({
    "ok":            true,
    "action":        "attached",
    "user_id":       a.user_id,
    "ministry_id":   a.ministry_id,
    "ministry_name": a.ministry_name,
    "created_user":  a.created_user,
  })
}

// ─── Legacy volunteer-ministry routes ─────────────────────────────────────────

/// `POST /integrations/cognito/volunteer-ministry/add`
pub async fn volunteer_add<S>(
  State(state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let body = match parse_body("volunteer-ministry/add", auth, &body) {
    Ok(body) => body,
    Err(reply) => return reply,
  };
  let req = volunteer_addition(&body);
  tracing::info!(payload = ?req, "volunteer addition mapped");

  match attach(state.store.as_ref(), &req).await {
    Ok(attached) => {
      tracing::info!(user_id = attached.user_id, ministry = %attached.ministry_name, "volunteer attached");
      Reply::ok(attached_body(&attached))
    }
    Err(failure) => failure.reply(),
  }
}

/// `POST /integrations/cognito/volunteer-ministry/remove`: detaching never
/// creates the ministry; unknown people or ministries are a no-op.
pub async fn volunteer_remove<S>(
  State(state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let body = match parse_body("volunteer-ministry/remove", auth, &body) {
    Ok(body) => body,
    Err(reply) => return reply,
  };
  let removal = volunteer_removal(&body);
  tracing::info!(payload = ?removal, "volunteer removal mapped");

  let ministry_name = match removal.validate() {
    Ok(name) => name.to_owned(),
    Err(e) => return Reply::rejected(&e),
  };

  let outcome: Result<Reply, IntakeFailure> = async {
    let store = state.store.as_ref();
    let user = store
      .find_user(removal.identity.email_key(), removal.identity.phone_key())
      .await
      .map_err(store_failure)?;
    let Some(user) = user else {
      tracing::warn!("volunteer removal for unknown user");
      return Ok(Reply::ok(json!({ "ok": true, "action": "noop", "message": "User not found" })));
    };
    let Some(ministry) = store.find_ministry(ministry_name.clone()).await.map_err(store_failure)?
    else {
      tracing::warn!(ministry = %ministry_name, "volunteer removal for unknown ministry");
      return Ok(Reply::ok(json!({
        "ok":      true,
        "action":  "noop",
        "message": "Ministry not found",
        "user_id": user.id,
      })));
    };
    store
      .detach_ministry(PersonRef::user(user.id), ministry.id)
      .await
      .map_err(store_failure)?;
    tracing::info!(user_id = user.id, ministry = %ministry.name, "volunteer removed");
    Ok(Reply::ok(json!({
      "ok":            true,
      "action":        "removed",
      "user_id":       user.id,
      "ministry_id":   ministry.id,
      "ministry_name": ministry.name,
    })))
  }
  .await;

  outcome.unwrap_or_else(|failure| failure.reply())
}

// ─── Helps-member routes ──────────────────────────────────────────────────────

fn ack(queued: bool, deduped: bool, entry_id: Option<&str>) -> Reply {
  Reply::ok(json!({ "ok": true, "queued": queued, "deduped": deduped, "entry_id": entry_id }))
}

/// Validate, dedupe, acknowledge, then attach in the background.
async fn helps_attach<S>(endpoint: &'static str, state: AppState<S>, auth: WebhookAuth, body: Bytes) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let body = match parse_body(endpoint, auth, &body) {
    Ok(body) => body,
    Err(reply) => return reply,
  };
  let form = helps_member(&body);
  tracing::info!(
    endpoint,
    form_id = ?form.form_id,
    form_internal = ?form.form_internal,
    is_new = ?form.raw_is_new,
    allow_create = form.request.allow_create,
    "helps member mapped"
  );

  if let Err(e) = form.request.validate() {
    return Reply::rejected(&e);
  }

  let entry = entry_id(&body);
  if !state.dedup.check(endpoint, entry.as_deref()) {
    tracing::info!(endpoint, entry_id = ?entry, "duplicate delivery dropped");
    return ack(false, true, entry.as_deref());
  }

  let store = state.store.clone();
  let request = form.request;
  let task_entry = entry.clone();
  tokio::spawn(async move {
    match attach(store.as_ref(), &request).await {
      Ok(a) => tracing::info!(
        endpoint,
        entry_id = ?task_entry,
        user_id = a.user_id,
        ministry = %a.ministry_name,
        created_user = a.created_user,
        "helps member attached"
      ),
      Err(IntakeFailure::Rejected(e)) => {
        tracing::error!(endpoint, entry_id = ?task_entry, error = %e, "helps member rejected after ack")
      }
      Err(IntakeFailure::Store(e)) => {
        tracing::error!(endpoint, entry_id = ?task_entry, error = %e, "helps member failed after ack")
      }
    }
  });

  ack(true, false, entry.as_deref())
}

/// `POST /integrations/cognito/helps-member/submit`
pub async fn helps_submit<S>(
  State(state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  helps_attach("helps-member/submit", state, auth, body).await
}

/// `POST /integrations/cognito/helps-member/update`: same as submit; contact
/// details of an existing person are not changed.
pub async fn helps_update<S>(
  State(state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  helps_attach("helps-member/update", state, auth, body).await
}

/// `POST /integrations/cognito/helps-member/delete`: logged only.
pub async fn helps_delete<S>(
  State(_state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let body = match parse_body("helps-member/delete", auth, &body) {
    Ok(body) => body,
    Err(reply) => return reply,
  };
  let form = helps_member(&body);
  tracing::info!(form_id = ?form.form_id, entry_id = ?entry_id(&body), "helps member entry deleted; no changes made");
  Reply::ok(json!({
    "ok":      true,
    "action":  "noop",
    "message": "Delete endpoint received. No DB changes performed.",
    "debug":   {
      "form_id":       form.form_id,
      "form_internal": form.form_internal,
      "secretSource":  auth.source.as_str(),
    },
  }))
}

/// `POST /integrations/cognito/helps-member/change`: only membership removals
/// act; everything else is acknowledged and logged.
pub async fn helps_change<S>(
  State(state): State<AppState<S>>,
  auth: WebhookAuth,
  body: Bytes,
) -> Reply
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  const ENDPOINT: &str = "helps-member/change";
  let body = match parse_body(ENDPOINT, auth, &body) {
    Ok(body) => body,
    Err(reply) => return reply,
  };
  let change = change_request(&body);
  let entry = entry_id(&body);

  if !change.is_removal() {
    tracing::info!(
      change_types = ?change.change_types,
      action = ?change.membership_action,
      "change request is not a membership removal; ignored"
    );
    let mut reply = ack(false, false, entry.as_deref());
    reply.1["action"] = json!("noop");
    return reply;
  }

  let names = match change.validate() {
    Ok(names) => names.to_vec(),
    Err(e) => return Reply::rejected(&e),
  };

  if !state.dedup.check(ENDPOINT, entry.as_deref()) {
    tracing::info!(endpoint = ENDPOINT, entry_id = ?entry, "duplicate delivery dropped");
    return ack(false, true, entry.as_deref());
  }

  let store = state.store.clone();
  let identity = change.identity;
  let task_entry = entry.clone();
  tokio::spawn(async move {
    let user = match store.find_user(identity.email_key(), identity.phone_key()).await {
      Ok(Some(user)) => user,
      Ok(None) => {
        tracing::warn!(entry_id = ?task_entry, "removal request for unknown user; nothing removed");
        return;
      }
      Err(e) => {
        tracing::error!(entry_id = ?task_entry, error = %e, "removal lookup failed after ack");
        return;
      }
    };
    match store.detach_ministries(user.id, names).await {
      Ok(report) => {
        if !report.not_found.is_empty() {
          tracing::warn!(not_found = ?report.not_found, "removal named unknown ministries");
        }
        tracing::info!(
          entry_id = ?task_entry,
          user_id = user.id,
          found = ?report.found,
          removed = report.removed,
          "ministries detached"
        );
      }
      Err(e) => tracing::error!(entry_id = ?task_entry, error = %e, "removal failed after ack"),
    }
  });

  ack(true, false, entry.as_deref())
}
