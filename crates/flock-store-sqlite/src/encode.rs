//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates and times are wall-clock text with no timezone: `YYYY-MM-DD`,
//! `HH:MM` and `YYYY-MM-DD HH:MM:SS`. Booleans are stored as integers.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use flock_core::{
  account::Admin,
  checkin::CHECKIN_TIME_FORMAT,
  event::{DATE_FORMAT, Event, TIME_FORMAT},
  family::FamilyMember,
  person::{Person, PersonKind, PersonRef, digits_only},
};
use rusqlite::{Row, functions::FunctionFlags, types::Type};

// ─── Tables ──────────────────────────────────────────────────────────────────

/// Table and column names for one person kind.
#[derive(Debug, Clone, Copy)]
pub struct Tables {
  pub people: &'static str,
  pub links:  &'static str,
  /// Person column in both the link table and `check_ins`.
  pub column: &'static str,
}

impl Tables {
  pub fn of(kind: PersonKind) -> Self {
    match kind {
      PersonKind::User => Self { people: "users", links: "user_ministries", column: "user_id" },
      PersonKind::Elder => Self { people: "elders", links: "elder_ministries", column: "elder_id" },
    }
  }
}

pub fn decode_kind(row: &Row<'_>, idx: usize) -> rusqlite::Result<PersonKind> {
  let s: String = row.get(idx)?;
  match s.as_str() {
    "user" => Ok(PersonKind::User),
    "elder" => Ok(PersonKind::Elder),
    other => Err(rusqlite::Error::InvalidColumnType(idx, other.to_owned(), Type::Text)),
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn encode_time(t: NaiveTime) -> String { t.format(TIME_FORMAT).to_string() }

pub fn encode_datetime(dt: NaiveDateTime) -> String {
  dt.format(CHECKIN_TIME_FORMAT).to_string()
}

/// The `YYYY-MM-DD HH:MM` form compared against event starts.
pub fn encode_event_cutoff(dt: NaiveDateTime) -> String { dt.format("%Y-%m-%d %H:%M").to_string() }

fn conversion(idx: usize, e: chrono::ParseError) -> rusqlite::Error {
  rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

pub fn date_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
  let s: String = row.get(idx)?;
  NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion(idx, e))
}

pub fn time_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveTime>> {
  let s: Option<String> = row.get(idx)?;
  s.map(|s| NaiveTime::parse_from_str(&s, TIME_FORMAT).map_err(|e| conversion(idx, e)))
    .transpose()
}

pub fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
  let s: String = row.get(idx)?;
  NaiveDateTime::parse_from_str(&s, CHECKIN_TIME_FORMAT).map_err(|e| conversion(idx, e))
}

pub fn opt_datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
  let s: Option<String> = row.get(idx)?;
  s.map(|s| NaiveDateTime::parse_from_str(&s, CHECKIN_TIME_FORMAT).map_err(|e| conversion(idx, e)))
    .transpose()
}

// ─── Rows ────────────────────────────────────────────────────────────────────

/// Column list matching [`decode_person`].
pub const PERSON_COLUMNS: &str =
  "id, first_name, last_name, email, phone, alt_phone, role, gender, avatar, family_id, active";

pub fn decode_person(row: &Row<'_>, kind: PersonKind) -> rusqlite::Result<Person> {
  Ok(Person {
    id: row.get(0)?,
    kind,
    first_name: row.get(1)?,
    last_name: row.get(2)?,
    email: row.get(3)?,
    phone: row.get(4)?,
    alt_phone: row.get(5)?,
    role: row.get(6)?,
    gender: row.get(7)?,
    avatar: row.get(8)?,
    family_id: row.get(9)?,
    active: row.get(10)?,
  })
}

/// Column list matching [`decode_event`].
pub const EVENT_COLUMNS: &str = "id, title, event_date, event_time, location, description";

pub fn decode_event(row: &Row<'_>) -> rusqlite::Result<Event> {
  Ok(Event {
    id:          row.get(0)?,
    title:       row.get(1)?,
    event_date:  date_at(row, 2)?,
    event_time:  time_at(row, 3)?,
    location:    row.get(4)?,
    description: row.get(5)?,
  })
}

/// Column list matching [`decode_admin`].
pub const ADMIN_COLUMNS: &str = "id, first_name, last_name, email, phone, username, role";

pub fn decode_admin(row: &Row<'_>) -> rusqlite::Result<Admin> {
  Ok(Admin {
    id:         row.get(0)?,
    first_name: row.get(1)?,
    last_name:  row.get(2)?,
    email:      row.get(3)?,
    phone:      row.get(4)?,
    username:   row.get(5)?,
    role:       row.get(6)?,
  })
}

/// Expects `kind, id, first_name, last_name, phone, role, avatar, family_id,
/// family_name`.
pub fn decode_family_member(row: &Row<'_>) -> rusqlite::Result<FamilyMember> {
  Ok(FamilyMember {
    id:          PersonRef { kind: decode_kind(row, 0)?, id: row.get(1)? },
    first_name:  row.get(2)?,
    last_name:   row.get(3)?,
    phone:       row.get(4)?,
    role:        row.get(5)?,
    avatar:      row.get(6)?,
    family_id:   row.get(7)?,
    family_name: row.get(8)?,
  })
}

// ─── SQL functions ───────────────────────────────────────────────────────────

/// `?, ?, ...` with `n` placeholders.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

/// Register `digits(text)`, which strips everything but ASCII digits.
pub fn register_functions(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "digits",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let s: Option<String> = ctx.get(0)?;
      Ok(s.map(|v| digits_only(&v)))
    },
  )
}
