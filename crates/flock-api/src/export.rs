//! CSV rendering of ministry reports and the per-ministry ZIP bundle.

use std::io::{Cursor, Write};

use flock_core::{
  checkin::CHECKIN_TIME_FORMAT,
  event::DATE_FORMAT,
  report::{AbsentMember, MinistryAttendance},
};
use serde::Serialize;
use thiserror::Error;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::error::ApiError;

pub const BUNDLE_NAME: &str = "all-ministries-reports.zip";

const ATTENDANCE_HEADER: [&str; 7] =
  ["first_name", "last_name", "email", "phone", "event_title", "event_date", "checkin_time"];
const ABSENT_HEADER: [&str; 4] = ["first_name", "last_name", "email", "phone"];

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<ExportError> for ApiError {
  fn from(e: ExportError) -> Self { ApiError::Internal(format!("report export failed: {e}")) }
}

#[derive(Serialize)]
struct AttendanceRecord<'a> {
  first_name:   &'a str,
  last_name:    &'a str,
  email:        Option<&'a str>,
  phone:        Option<&'a str>,
  event_title:  &'a str,
  event_date:   String,
  checkin_time: String,
}

#[derive(Serialize)]
struct AbsentRecord<'a> {
  first_name: &'a str,
  last_name:  &'a str,
  email:      Option<&'a str>,
  phone:      Option<&'a str>,
}

fn write_csv<R: Serialize>(
  header: &[&str],
  rows: impl IntoIterator<Item = R>,
) -> Result<Vec<u8>, ExportError> {
  let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
  wtr.write_record(header)?;
  for row in rows {
    wtr.serialize(row)?;
  }
  wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

pub fn attendance_csv(rows: &[MinistryAttendance]) -> Result<Vec<u8>, ExportError> {
  write_csv(
    &ATTENDANCE_HEADER,
    rows.iter().map(|r| AttendanceRecord {
      first_name:   &r.first_name,
      last_name:    &r.last_name,
      email:        r.email.as_deref(),
      phone:        r.phone.as_deref(),
      event_title:  &r.event_title,
      event_date:   r.event_date.format(DATE_FORMAT).to_string(),
      checkin_time: r.checkin_time.format(CHECKIN_TIME_FORMAT).to_string(),
    }),
  )
}

pub fn absent_csv(rows: &[AbsentMember]) -> Result<Vec<u8>, ExportError> {
  write_csv(
    &ABSENT_HEADER,
    rows.iter().map(|r| AbsentRecord {
      first_name: &r.first_name,
      last_name:  &r.last_name,
      email:      r.email.as_deref(),
      phone:      r.phone.as_deref(),
    }),
  )
}

/// File-name stem for a ministry: runs of non-word characters become `_`.
pub fn safe_name(name: &str, id: i64) -> String {
  let mut out = String::with_capacity(name.len());
  for c in name.chars() {
    if c.is_ascii_alphanumeric() || c == '_' {
      out.push(c);
    } else if !out.ends_with('_') {
      out.push('_');
    }
  }
  if out.trim_matches('_').is_empty() { format!("ministry_{id}") } else { out }
}

/// Pack `(file name, contents)` pairs into a deflated ZIP archive.
pub fn zip_files(files: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, ExportError> {
  let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
  for (name, contents) in files {
    zip.start_file(name, options)?;
    zip.write_all(&contents)?;
  }
  Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
  use std::io::Read;

  use chrono::NaiveDate;

  use super::*;

  #[test]
  fn safe_names() {
    assert_eq!(safe_name("Youth & Kids", 3), "Youth_Kids");
    assert_eq!(safe_name("Choir", 1), "Choir");
    assert_eq!(safe_name("!!!", 9), "ministry_9");
  }

  #[test]
  fn empty_reports_still_have_headers() {
    let csv = String::from_utf8(absent_csv(&[]).unwrap()).unwrap();
    assert_eq!(csv, "first_name,last_name,email,phone\n");
  }

  #[test]
  fn attendance_rows_are_formatted() {
    let date = NaiveDate::from_ymd_opt(2025, 4, 6).unwrap();
    let rows = [MinistryAttendance {
      checkin_id:   1,
      user_id:      2,
      first_name:   "Ann".into(),
      last_name:    "Lee".into(),
      email:        None,
      phone:        Some("555".into()),
      role:         None,
      event_title:  "Service, Main".into(),
      event_date:   date,
      checkin_time: date.and_hms_opt(9, 30, 0).unwrap(),
    }];
    let csv = String::from_utf8(attendance_csv(&rows).unwrap()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some(ATTENDANCE_HEADER.join(",").as_str()));
    assert_eq!(lines.next(), Some("Ann,Lee,,555,\"Service, Main\",2025-04-06,2025-04-06 09:30:00"));
  }

  #[test]
  fn zip_contains_every_file() {
    let bytes = zip_files(vec![
      ("attendance_Choir.csv".into(), b"a".to_vec()),
      ("absent_Choir.csv".into(), b"b".to_vec()),
    ])
    .unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(archive.len(), 2);
    let mut contents = String::new();
    archive.by_name("absent_Choir.csv").unwrap().read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "b");
  }
}
