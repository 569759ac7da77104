//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use flock_core::store::{ErrorKind, StoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as
/// `{"message": ...}` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  /// Map a store failure onto a status by its category.
  pub fn store<E: StoreError>(e: E) -> Self {
    match e.kind() {
      ErrorKind::NotFound => Self::NotFound(e.to_string()),
      ErrorKind::Conflict => Self::Conflict(e.to_string()),
      ErrorKind::Invalid => Self::BadRequest(e.to_string()),
      ErrorKind::Internal => Self::Store(Box::new(e)),
    }
  }

  /// Replace the message of a conflict with a client-facing one.
  pub fn on_conflict(self, message: &str) -> Self {
    match self {
      Self::Conflict(_) => Self::Conflict(message.to_owned()),
      other => other,
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<flock_core::Error> for ApiError {
  fn from(e: flock_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      Self::Store(e) => {
        tracing::error!(error = %e, "store failure");
        "Internal Server Error".to_owned()
      }
      Self::Internal(m) => {
        tracing::error!(error = %m, "internal failure");
        m.clone()
      }
      other => other.to_string(),
    };
    (status, Json(json!({ "message": message }))).into_response()
  }
}

/// Shorthand for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
