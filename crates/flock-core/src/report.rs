//! Read models for the dashboard and the attendance reports.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::{event::Event, person::PersonKind};

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
  pub id:          i64,
  pub first_name:  String,
  pub last_name:   String,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub event_title: String,
  pub event_date:  NaiveDate,
  #[serde(rename = "type")]
  pub kind:        PersonKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct MinistryAttendance {
  pub checkin_id:   i64,
  pub user_id:      i64,
  pub first_name:   String,
  pub last_name:    String,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub role:         Option<String>,
  pub event_title:  String,
  pub event_date:   NaiveDate,
  pub checkin_time: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbsentMember {
  pub user_id:    i64,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElderReportRow {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         Option<String>,
  pub event_title:   String,
  pub event_date:    NaiveDate,
  pub ministry_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ElderAbsentRow {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         Option<String>,
  pub ministry_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterRow {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub ministry:   String,
}

/// A member with their active flag; used by the "no active ministry" reports.
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub active:     bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InactiveMember {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub active:     bool,
  /// Active ministry names, sorted, joined with `", "`.
  pub ministries: String,
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
  pub check_ins_today:   u64,
  pub total_users:       u64,
  pub total_elders:      u64,
  pub active_ministries: u64,
  pub upcoming_events:   u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardCheckIn {
  pub id:           i64,
  pub checkin_time: NaiveDateTime,
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  /// One ministry of the person, if any.
  pub ministry:     Option<String>,
  /// `"User"` or `"Elder"`.
  #[serde(rename = "type")]
  pub kind:         &'static str,
  pub event_id:     i64,
  pub event_title:  Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
  pub stats:           DashboardStats,
  pub upcoming_events: Vec<Event>,
  pub all_checkins:    Vec<DashboardCheckIn>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dashboard_uses_camel_case_keys() {
    let dashboard = Dashboard {
      stats:           DashboardStats { check_ins_today: 2, ..Default::default() },
      upcoming_events: vec![],
      all_checkins:    vec![],
    };
    let json = serde_json::to_value(&dashboard).unwrap();
    assert_eq!(json["stats"]["checkInsToday"], 2);
    assert!(json["upcomingEvents"].is_array());
    assert!(json["allCheckins"].is_array());
  }
}
