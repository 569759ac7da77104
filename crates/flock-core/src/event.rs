//! Events. Dates and times are wall-clock values with no timezone, written to
//! clients exactly as `YYYY-MM-DD` and `HH:MM`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:          i64,
  pub title:       String,
  pub event_date:  NaiveDate,
  #[serde(with = "hh_mm", default)]
  pub event_time:  Option<NaiveTime>,
  pub location:    Option<String>,
  pub description: Option<String>,
}

impl Event {
  /// Wall-clock start; an event without a time starts at midnight.
  pub fn starts_at(&self) -> NaiveDateTime {
    self.event_date.and_time(self.event_time.unwrap_or(NaiveTime::MIN))
  }
}

/// Raw event body as clients send it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventInput {
  pub title:       Option<String>,
  pub event_date:  Option<String>,
  pub event_time:  Option<String>,
  pub location:    Option<String>,
  pub description: Option<String>,
}

/// A validated event ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
  pub title:       String,
  pub event_date:  NaiveDate,
  pub event_time:  Option<NaiveTime>,
  pub location:    Option<String>,
  pub description: Option<String>,
}

impl EventInput {
  /// Validate and normalise. Dates may arrive as full ISO timestamps; only the
  /// leading `YYYY-MM-DD` is kept. Times keep the leading `HH:MM`.
  pub fn normalize(self) -> Result<NewEvent> {
    let title = self
      .title
      .map(|t| t.trim().to_owned())
      .filter(|t| !t.is_empty())
      .ok_or(Error::MissingField("title"))?;
    let raw_date = self
      .event_date
      .filter(|d| !d.trim().is_empty())
      .ok_or(Error::MissingField("event_date"))?;
    let event_date = parse_date(&raw_date)?;
    let event_time = match self.event_time.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(t) => Some(parse_time(t)?),
    };
    Ok(NewEvent {
      title,
      event_date,
      event_time,
      location: self.location.filter(|s| !s.trim().is_empty()),
      description: self.description.filter(|s| !s.trim().is_empty()),
    })
  }
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
  let head: String = s.trim().chars().take(10).collect();
  NaiveDate::parse_from_str(&head, DATE_FORMAT).map_err(|_| Error::InvalidDate(s.to_owned()))
}

pub fn parse_time(s: &str) -> Result<NaiveTime> {
  let head: String = s.trim().chars().take(5).collect();
  NaiveTime::parse_from_str(&head, TIME_FORMAT).map_err(|_| Error::InvalidTime(s.to_owned()))
}

/// Serde adapter writing `Option<NaiveTime>` as `"HH:MM"` or `null`.
pub mod hh_mm {
  use chrono::NaiveTime;
  use serde::{Deserialize, Deserializer, Serializer};

  pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
    match time {
      Some(t) => s.collect_str(&t.format(super::TIME_FORMAT)),
      None => s.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    Option::<String>::deserialize(d)?
      .map(|t| super::parse_time(&t).map_err(serde::de::Error::custom))
      .transpose()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalize_trims_iso_timestamps() {
    let input = EventInput {
      title: Some(" Sunday Service ".into()),
      event_date: Some("2025-03-09T00:00:00.000Z".into()),
      event_time: Some("10:30:00".into()),
      ..Default::default()
    };
    let event = input.normalize().unwrap();
    assert_eq!(event.title, "Sunday Service");
    assert_eq!(event.event_date, NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    assert_eq!(event.event_time, NaiveTime::from_hms_opt(10, 30, 0));
  }

  #[test]
  fn normalize_requires_title_and_date() {
    let missing_title = EventInput { event_date: Some("2025-01-01".into()), ..Default::default() };
    assert!(matches!(missing_title.normalize(), Err(Error::MissingField("title"))));
    let bad_date = EventInput {
      title: Some("x".into()),
      event_date: Some("tomorrow".into()),
      ..Default::default()
    };
    assert!(matches!(bad_date.normalize(), Err(Error::InvalidDate(_))));
  }

  #[test]
  fn event_serializes_wall_clock_strings() {
    let event = Event {
      id:          1,
      title:       "Prayer".into(),
      event_date:  NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
      event_time:  NaiveTime::from_hms_opt(18, 5, 0),
      location:    None,
      description: None,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event_date"], "2025-06-01");
    assert_eq!(json["event_time"], "18:05");
  }
}
