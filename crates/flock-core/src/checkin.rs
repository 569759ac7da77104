//! Check-ins: one row per (person, event) attendance, plus the kiosk search
//! read model.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::{
  event::hh_mm,
  person::{PersonKind, PersonRef},
};

/// Storage format of `check_ins.checkin_time` (local wall clock).
pub const CHECKIN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
  pub id:           i64,
  pub event_id:     i64,
  pub user_id:      Option<i64>,
  pub elder_id:     Option<i64>,
  pub checkin_time: NaiveDateTime,
  pub is_elder:     bool,
}

impl CheckIn {
  pub fn person_ref(&self) -> Option<PersonRef> {
    match (self.user_id, self.elder_id) {
      (Some(id), None) => Some(PersonRef::user(id)),
      (None, Some(id)) => Some(PersonRef::elder(id)),
      _ => None,
    }
  }
}

/// A check-in joined with its person and event, for `GET /checkins/all`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInListing {
  pub id:           i64,
  pub checkin_time: NaiveDateTime,
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub avatar:       Option<String>,
  pub role:         Option<String>,
  pub event_title:  Option<String>,
  pub user_id:      Option<i64>,
  pub elder_id:     Option<i64>,
  pub event_id:     i64,
}

/// A check-in for one event with person and event detail.
#[derive(Debug, Clone, Serialize)]
pub struct CheckInDetail {
  pub checkin_id:     i64,
  pub checkin_time:   NaiveDateTime,
  pub user_id:        Option<i64>,
  pub elder_id:       Option<i64>,
  pub first_name:     Option<String>,
  pub last_name:      Option<String>,
  pub avatar:         Option<String>,
  pub role:           Option<String>,
  pub event_title:    Option<String>,
  pub event_location: Option<String>,
  #[serde(with = "hh_mm")]
  pub event_time:     Option<NaiveTime>,
}

/// Inserted/skipped counts from a bulk kiosk check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
  pub inserted: usize,
  pub skipped:  usize,
}

// ─── Kiosk search ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KioskSearchMode {
  #[default]
  Name,
  Phone,
}

impl KioskSearchMode {
  pub fn parse(s: &str) -> Self {
    if s.trim().eq_ignore_ascii_case("phone") { Self::Phone } else { Self::Name }
  }
}

#[derive(Debug, Clone)]
pub struct KioskQuery {
  pub text:     String,
  pub mode:     KioskSearchMode,
  /// Restrict the "last check-in" lookup to this event.
  pub event_id: Option<i64>,
  pub limit:    usize,
}

impl KioskQuery {
  pub const DEFAULT_LIMIT: usize = 50;
  pub const MAX_LIMIT: usize = 100;

  pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
  }
}

/// The most recent check-in of a kiosk search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCheckIn {
  pub time:           NaiveDateTime,
  pub event_id:       i64,
  pub event_title:    Option<String>,
  pub event_location: Option<String>,
}

/// One person matched by a kiosk search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskMatch {
  pub person:       PersonRef,
  pub first_name:   String,
  pub last_name:    String,
  pub phone:        Option<String>,
  pub family_id:    Option<i64>,
  pub family_name:  Option<String>,
  pub last_checkin: Option<LastCheckIn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskEventRef {
  pub id:       i64,
  pub title:    Option<String>,
  pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskLastCheckIn {
  pub checked_in:   bool,
  pub time_iso:     NaiveDateTime,
  pub time_display: String,
  pub event_id:     i64,
  pub event_title:  Option<String>,
  pub event:        KioskEventRef,
  pub location:     Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskMember {
  pub id:           PersonRef,
  #[serde(rename = "type")]
  pub kind:         &'static str,
  pub first_name:   String,
  pub last_name:    String,
  pub phone:        Option<String>,
  /// `0` when the person has no family.
  pub family_id:    i64,
  pub last_checkin: Option<KioskLastCheckIn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskFamily {
  pub family_id: i64,
  pub label:     String,
  pub members:   Vec<KioskMember>,
}

impl From<KioskMatch> for KioskMember {
  fn from(m: KioskMatch) -> Self {
    let last_checkin = m.last_checkin.map(|lc| KioskLastCheckIn {
      checked_in:   true,
      time_iso:     lc.time,
      time_display: lc.time.format("%H:%M").to_string(),
      event_id:     lc.event_id,
      event_title:  lc.event_title.clone(),
      event:        KioskEventRef {
        id:       lc.event_id,
        title:    lc.event_title,
        location: lc.event_location.clone(),
      },
      location:     lc.event_location,
    });
    Self {
      id: m.person,
      kind: match m.person.kind {
        PersonKind::User => "member",
        PersonKind::Elder => "elder",
      },
      first_name: m.first_name,
      last_name: m.last_name,
      phone: m.phone,
      family_id: m.family_id.unwrap_or(0),
      last_checkin,
    }
  }
}

/// Group kiosk hits into households.
///
/// Families with an id come first (by id), the "No Family Record" bucket
/// last; members within a family are ordered by last then first name.
pub fn group_by_family(matches: Vec<KioskMatch>) -> Vec<KioskFamily> {
  let mut families: BTreeMap<i64, KioskFamily> = BTreeMap::new();
  for m in matches {
    let family_id = m.family_id.unwrap_or(0);
    let family = families.entry(family_id).or_insert_with(|| KioskFamily {
      family_id,
      label: match (family_id, m.family_name.as_deref()) {
        (0, _) => "No Family Record".to_owned(),
        (_, Some(name)) if !name.is_empty() => name.to_owned(),
        (id, _) => format!("Family #{id}"),
      },
      members: Vec::new(),
    });
    family.members.push(m.into());
  }

  let mut out: Vec<KioskFamily> = families
    .into_values()
    .map(|mut f| {
      f.members.sort_by(|a, b| {
        (a.last_name.to_lowercase(), a.first_name.to_lowercase())
          .cmp(&(b.last_name.to_lowercase(), b.first_name.to_lowercase()))
      });
      f
    })
    .collect();
  // BTreeMap puts 0 first; the unassigned bucket belongs at the end.
  if out.first().is_some_and(|f| f.family_id == 0) {
    out.rotate_left(1);
  }
  out
}
