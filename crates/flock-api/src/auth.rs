//! Bearer-token authentication for staff and kiosks.
//!
//! Both token kinds are HS256 JWTs signed with the same secret. Staff tokens
//! carry the account id and role and live for a day; kiosk tokens carry
//! `role = "kiosk"` and live for twelve hours.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use flock_core::{
  account::{Admin, can_manage},
  person::PersonRef,
  store::RosterStore,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::OsRng;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
  AppState,
  error::{ApiError, ApiResult},
};

pub const STAFF_TOKEN_TTL: Duration = Duration::days(1);
pub const KIOSK_TOKEN_TTL: Duration = Duration::hours(12);
pub const KIOSK_ROLE: &str = "kiosk";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Signing material for both token kinds.
#[derive(Clone)]
pub struct AuthConfig {
  pub jwt_secret: String,
}

impl AuthConfig {
  fn sign<C: Serialize>(&self, claims: &C) -> ApiResult<String> {
    encode(
      &Header::new(Algorithm::HS256),
      claims,
      &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
  }

  fn verify<C: DeserializeOwned>(&self, token: &str) -> Option<C> {
    decode::<C>(
      token,
      &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
      &Validation::new(Algorithm::HS256),
    )
    .ok()
    .map(|data| data.claims)
  }

  pub fn issue_staff_token(&self, admin: &Admin) -> ApiResult<String> {
    let role = if admin.role.is_empty() { "staff".to_owned() } else { admin.role.clone() };
    self.sign(&StaffClaims {
      sub: format!("admin:{}", admin.id),
      id: admin.id,
      email: Some(admin.username.clone()),
      role,
      exp: (Utc::now() + STAFF_TOKEN_TTL).timestamp(),
    })
  }

  pub fn issue_kiosk_token(&self, kiosk_id: Option<i64>) -> ApiResult<String> {
    self.sign(&KioskClaims {
      sub:  kiosk_id.map_or_else(|| "kiosk:anon".to_owned(), |id| format!("kiosk:{id}")),
      role: KIOSK_ROLE.to_owned(),
      exp:  (Utc::now() + KIOSK_TOKEN_TTL).timestamp(),
    })
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StaffClaims {
  pub sub:   String,
  pub id:    i64,
  pub email: Option<String>,
  pub role:  String,
  pub exp:   i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KioskClaims {
  /// `kiosk:<id>` or `kiosk:anon`.
  pub sub:  String,
  pub role: String,
  pub exp:  i64,
}

// ─── Passwords ───────────────────────────────────────────────────────────────

pub fn hash_password(password: &str) -> ApiResult<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    .unwrap_or(false)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// An authenticated staff member: an admin account, or a roster user holding
/// a token for their id.
#[derive(Debug, Clone)]
pub struct Staff {
  pub id:    i64,
  pub role:  String,
  pub email: Option<String>,
}

impl Staff {
  /// Admin-only operations answer 403 to everyone else.
  pub fn require_manager(&self) -> ApiResult<()> {
    if can_manage(&self.role) {
      Ok(())
    } else {
      Err(ApiError::Forbidden("Unauthorized".into()))
    }
  }
}

impl<S> FromRequestParts<AppState<S>> for Staff
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self, ApiError> {
    let token = bearer(&parts.headers)
      .ok_or_else(|| ApiError::Unauthorized("Missing or invalid token".into()))?;
    let claims: StaffClaims = state
      .auth
      .verify(token)
      .ok_or_else(|| ApiError::Unauthorized("Invalid token".into()))?;

    if let Some(admin) = state.store.get_admin(claims.id).await.map_err(ApiError::store)? {
      return Ok(Staff { id: admin.id, role: admin.role, email: admin.email });
    }

    let user = state
      .store
      .get_person(PersonRef::user(claims.id))
      .await
      .map_err(ApiError::store)?;
    match user {
      Some(user) => Ok(Staff {
        id:    user.id,
        role:  user.role.unwrap_or_else(|| "member".to_owned()),
        email: user.email,
      }),
      None => Err(ApiError::Unauthorized("User not found".into())),
    }
  }
}

/// A request carrying a valid kiosk token.
#[derive(Debug, Clone)]
pub struct KioskSession {
  pub subject: String,
}

impl<S> FromRequestParts<AppState<S>> for KioskSession
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self, ApiError> {
    let token = bearer(&parts.headers)
      .ok_or_else(|| ApiError::Unauthorized("Missing kiosk token".into()))?;
    let claims: KioskClaims = state
      .auth
      .verify(token)
      .ok_or_else(|| ApiError::Unauthorized("Invalid kiosk token".into()))?;
    if claims.role != KIOSK_ROLE {
      return Err(ApiError::Forbidden("Not a kiosk token".into()));
    }
    Ok(KioskSession { subject: claims.sub })
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /api/auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let invalid = || ApiError::Unauthorized("Invalid credentials".into());

  let username = body.username.trim().to_lowercase();
  let credentials = state
    .store
    .find_admin_by_username(username)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(invalid)?;

  if !verify_password(&body.password, &credentials.password_hash) {
    tracing::warn!(username = %credentials.admin.username, "failed login");
    return Err(invalid());
  }

  let admin = credentials.admin;
  let token = state.auth.issue_staff_token(&admin)?;
  tracing::info!(admin_id = admin.id, "staff login");

  Ok(Json(json!({
    "token": token,
    "user": {
      "id":    admin.id,
      "name":  admin.full_name(),
      "role":  admin.role,
      "email": admin.username,
    },
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AuthConfig { AuthConfig { jwt_secret: "test-secret".into() } }

  #[test]
  fn kiosk_token_round_trips_subject() {
    let cfg = config();
    let token = cfg.issue_kiosk_token(Some(4)).unwrap();
    let claims: KioskClaims = cfg.verify(&token).unwrap();
    assert_eq!(claims.sub, "kiosk:4");
    assert_eq!(claims.role, KIOSK_ROLE);

    let anon: KioskClaims = cfg.verify(&cfg.issue_kiosk_token(None).unwrap()).unwrap();
    assert_eq!(anon.sub, "kiosk:anon");
  }

  #[test]
  fn tokens_from_other_secrets_are_rejected() {
    let token = config().issue_kiosk_token(None).unwrap();
    let other = AuthConfig { jwt_secret: "different".into() };
    assert!(other.verify::<KioskClaims>(&token).is_none());
  }

  #[test]
  fn kiosk_tokens_are_not_staff_tokens() {
    let cfg = config();
    let token = cfg.issue_kiosk_token(None).unwrap();
    assert!(cfg.verify::<StaffClaims>(&token).is_none());
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("hunter2").unwrap();
    assert!(verify_password("hunter2", &hash));
    assert!(!verify_password("hunter3", &hash));
    assert!(!verify_password("hunter2", "not-a-phc-string"));
  }

  #[test]
  fn manager_roles() {
    let staff = |role: &str| Staff { id: 1, role: role.into(), email: None };
    assert!(staff("admin").require_manager().is_ok());
    assert!(staff("super_admin").require_manager().is_ok());
    assert!(matches!(staff("staff").require_manager(), Err(ApiError::Forbidden(_))));
  }
}
