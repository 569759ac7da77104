//! `POST /import/users`: roster import from a CSV upload.

use axum::{
  Json,
  body::Bytes,
  extract::{Multipart, State},
};
use flock_core::{import::ImportRow, store::RosterStore};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::Staff,
  error::{ApiError, ApiResult},
};

#[derive(Debug, Serialize)]
pub struct RowError {
  pub user:  String,
  pub phone: Option<String>,
  pub error: String,
}

/// Pull the named file part out of a multipart body.
pub(crate) async fn file_field(
  multipart: &mut Multipart,
  name: &str,
) -> ApiResult<Option<(Option<String>, Bytes)>> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() == Some(name) {
      let content_type = field.content_type().map(str::to_owned);
      let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
      return Ok(Some((content_type, bytes)));
    }
  }
  Ok(None)
}

/// Parse CSV rows, matching header names case-insensitively.
pub fn parse_rows(data: &[u8]) -> Result<Vec<ImportRow>, csv::Error> {
  let mut reader = csv::ReaderBuilder::new()
    .trim(csv::Trim::All)
    .flexible(true)
    .from_reader(data);
  let headers: csv::StringRecord = reader
    .headers()?
    .iter()
    .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
    .collect();
  reader.set_headers(headers);
  reader.deserialize().collect()
}

/// `POST /import/users` (multipart field `file`)
pub async fn users<S>(
  State(state): State<AppState<S>>,
  _staff: Staff,
  mut multipart: Multipart,
) -> ApiResult<Json<Value>>
where
  S: RosterStore + Clone + Send + Sync + 'static,
{
  let (_, data) = file_field(&mut multipart, "file")
    .await?
    .ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;
  let rows = parse_rows(&data).map_err(|e| ApiError::BadRequest(format!("Invalid CSV: {e}")))?;

  if !rows.iter().all(ImportRow::has_names) {
    return Err(ApiError::BadRequest(
      "Missing required user fields in CSV (first_name, last_name)".into(),
    ));
  }

  let mut imported = 0usize;
  let mut errors = Vec::new();
  for row in rows {
    let user = row.display_name();
    let phone = row.phone.clone();
    let outcome = match row.normalize() {
      Ok(record) => state.store.import_person(record).await.map_err(|e| e.to_string()),
      Err(e) => Err(e.to_string()),
    };
    match outcome {
      Ok(_) => imported += 1,
      Err(error) => {
        tracing::warn!(%user, %error, "import row skipped");
        errors.push(RowError { user, phone, error });
      }
    }
  }

  tracing::info!(imported, skipped = errors.len(), "roster import finished");
  Ok(Json(json!({
    "message":  "Import complete",
    "imported": imported,
    "skipped":  errors.len(),
    "errors":   errors,
  })))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn headers_are_case_insensitive_and_extra_columns_ignored() {
    let csv = "\u{feff}First_Name,LAST_NAME,Email,Notes\n Ann , Lee ,ann@example.com,hi\n";
    let rows = parse_rows(csv.as_bytes()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].first_name.as_deref(), Some("Ann"));
    assert_eq!(rows[0].last_name.as_deref(), Some("Lee"));
    assert_eq!(rows[0].email.as_deref(), Some("ann@example.com"));
  }

  #[test]
  fn short_rows_leave_fields_empty() {
    let rows = parse_rows(b"first_name,last_name,phone\nBo,Diddley\n").unwrap();
    assert!(rows[0].has_names());
    assert_eq!(rows[0].phone, None);
  }
}
