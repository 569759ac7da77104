//! `POST /uploads/avatar`: store a profile picture and return its URL.
//!
//! Files are written to the configured uploads directory under a random name.
//! Serving them back is left to whatever fronts the API.

use axum::{
  Json,
  extract::{Multipart, State},
};
use flock_core::store::RosterStore;
use serde_json::json;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
  import::file_field,
};

pub const MAX_AVATAR_BYTES: usize = 2 * 1024 * 1024;

/// File extension for an accepted image content type.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
  match content_type.trim().to_lowercase().as_str() {
    "image/jpeg" | "image/jpg" => Some("jpg"),
    "image/png" => Some("png"),
    "image/webp" => Some("webp"),
    _ => None,
  }
}

pub async fn avatar<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  mut multipart: Multipart,
) -> ApiResult<Json<serde_json::Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (content_type, data) = file_field(&mut multipart, "avatar")
    .await?
    .ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;

  let ext = content_type
    .as_deref()
    .and_then(extension_for)
    .ok_or_else(|| ApiError::BadRequest("Only JPEG, PNG or WEBP images are allowed".into()))?;
  if data.len() > MAX_AVATAR_BYTES {
    return Err(ApiError::BadRequest("File too large (max 2 MB)".into()));
  }

  let file_name = format!("{}.{ext}", Uuid::new_v4());
  let dir = state.uploads_dir.as_path();
  tokio::fs::create_dir_all(dir)
    .await
    .map_err(|e| ApiError::Internal(format!("cannot create uploads directory: {e}")))?;
  tokio::fs::write(dir.join(&file_name), &data)
    .await
    .map_err(|e| ApiError::Internal(format!("cannot write upload: {e}")))?;

  tracing::info!(file = %file_name, bytes = data.len(), "avatar stored");
  Ok(Json(json!({ "url": format!("/uploads/{file_name}") })))
}

#[cfg(test)]
mod tests {
  use super::extension_for;

  #[test]
  fn accepts_only_web_images() {
    assert_eq!(extension_for("image/jpeg"), Some("jpg"));
    assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
    assert_eq!(extension_for("image/webp"), Some("webp"));
    assert_eq!(extension_for("image/gif"), None);
    assert_eq!(extension_for("text/plain"), None);
  }
}
