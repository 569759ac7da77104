//! People: members (the `users` table) and elders (the `elders` table).
//!
//! The two tables are parallel; a [`PersonRef`] names a row in either of them.
//! A person lives in exactly one table at a time, and changing role between
//! member and elder moves the row.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

// ─── Kind and reference ──────────────────────────────────────────────────────

/// Which table a person lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
  User,
  Elder,
}

impl PersonKind {
  pub fn prefix(self) -> &'static str {
    match self {
      Self::User => "user",
      Self::Elder => "elder",
    }
  }
}

/// A typed pointer at a person row, written `user-12` or `elder-3`.
///
/// Parsing is lenient the way clients send ids: `member-12`, `user-12` and a
/// bare `12` all name the users table; only an `elder-` prefix selects elders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersonRef {
  pub kind: PersonKind,
  pub id:   i64,
}

impl PersonRef {
  pub fn user(id: i64) -> Self { Self { kind: PersonKind::User, id } }

  pub fn elder(id: i64) -> Self { Self { kind: PersonKind::Elder, id } }

  pub fn is_elder(&self) -> bool { self.kind == PersonKind::Elder }
}

impl fmt::Display for PersonRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.kind.prefix(), self.id)
  }
}

impl FromStr for PersonRef {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let trimmed = s.trim();
    let kind = if trimmed.starts_with("elder-") {
      PersonKind::Elder
    } else {
      PersonKind::User
    };
    let digits = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
      return Err(Error::InvalidPersonRef(s.to_owned()));
    }
    let id = digits
      .parse()
      .map_err(|_| Error::InvalidPersonRef(s.to_owned()))?;
    Ok(Self { kind, id })
  }
}

impl Serialize for PersonRef {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for PersonRef {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Text(String),
      Number(i64),
    }

    match Raw::deserialize(deserializer)? {
      Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
      Raw::Number(id) => Ok(PersonRef::user(id)),
    }
  }
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// Roles accepted when a person is created through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Member,
  Elder,
  Volunteer,
  Staff,
}

impl Role {
  /// Case-insensitive parse of the role names clients send.
  pub fn parse(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "member" | "user" => Ok(Self::Member),
      "elder" => Ok(Self::Elder),
      "volunteer" => Ok(Self::Volunteer),
      "staff" => Ok(Self::Staff),
      _ => Err(Error::InvalidRole(s.to_owned())),
    }
  }

  /// The tag written to the `role` column. Members are stored as `user`.
  pub fn stored(self) -> &'static str {
    match self {
      Self::Member => "user",
      Self::Elder => "elder",
      Self::Volunteer => "volunteer",
      Self::Staff => "staff",
    }
  }

  pub fn kind(self) -> PersonKind {
    match self {
      Self::Elder => PersonKind::Elder,
      _ => PersonKind::User,
    }
  }
}

/// The role label shown to clients: the stored `user` tag reads as `member`.
pub fn display_role(stored: &str) -> &str {
  if stored == "user" { "member" } else { stored }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Strip everything but ASCII digits.
pub fn digits_only(s: &str) -> String {
  s.chars().filter(char::is_ascii_digit).collect()
}

/// Lower-case and trim an email address; `None` when blank.
pub fn normalize_email(s: &str) -> Option<String> {
  let e = s.trim().to_lowercase();
  (!e.is_empty()).then_some(e)
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A full person row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:         i64,
  pub kind:       PersonKind,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub alt_phone:  Option<String>,
  pub role:       Option<String>,
  pub gender:     Option<String>,
  pub avatar:     Option<String>,
  pub family_id:  Option<i64>,
  pub active:     bool,
}

impl Person {
  pub fn person_ref(&self) -> PersonRef { PersonRef { kind: self.kind, id: self.id } }

  pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }
}

/// Input for inserting a person row.
#[derive(Debug, Clone, Default)]
pub struct NewPerson {
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub alt_phone:  Option<String>,
  /// Stored role tag; also decides the table (`elder` goes to elders).
  pub role:       Option<String>,
  pub gender:     Option<String>,
  pub avatar:     Option<String>,
  pub family_id:  Option<i64>,
  pub active:     bool,
}

impl NewPerson {
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, role: Role) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      role: Some(role.stored().to_owned()),
      active: true,
      ..Default::default()
    }
  }

  pub fn kind(&self) -> PersonKind {
    match self.role.as_deref() {
      Some(r) if r.eq_ignore_ascii_case("elder") => PersonKind::Elder,
      _ => PersonKind::User,
    }
  }
}

/// Changes applied by `PUT /users/:id`.
///
/// Absent fields keep their current value. A `role` that crosses the
/// member/elder boundary moves the row to the other table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonUpdate {
  pub first_name:   Option<String>,
  pub last_name:    Option<String>,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub alt_phone:    Option<String>,
  pub role:         Option<String>,
  pub family_id:    Option<i64>,
  pub avatar:       Option<String>,
  pub gender:       Option<String>,
  pub active:       Option<bool>,
  /// Replacement ministry set; `None` keeps the current links.
  pub ministry_ids: Option<Vec<i64>>,
}

impl PersonUpdate {
  /// The table the person should live in after this update.
  pub fn target_kind(&self, current: PersonKind) -> PersonKind {
    match self.role.as_deref() {
      Some(r) if r.trim().eq_ignore_ascii_case("elder") => PersonKind::Elder,
      Some(r) if r.trim().is_empty() => current,
      Some(_) => PersonKind::User,
      None => current,
    }
  }

  /// The role tag to store, mapping `member` to `user`.
  pub fn stored_role(&self) -> Option<String> {
    self.role.as_deref().map(str::trim).filter(|r| !r.is_empty()).map(|r| {
      let lower = r.to_lowercase();
      if lower == "member" { "user".to_owned() } else { lower }
    })
  }
}

/// One row of the combined users/elders listing.
#[derive(Debug, Clone, Serialize)]
pub struct PersonSummary {
  pub id:          PersonRef,
  pub first_name:  String,
  pub last_name:   String,
  pub phone:       Option<String>,
  pub alt_phone:   Option<String>,
  pub role:        Option<String>,
  pub avatar:      Option<String>,
  pub family_id:   Option<i64>,
  pub family_name: Option<String>,
}

/// A person with the names and ids of every ministry they belong to.
#[derive(Debug, Clone, Serialize)]
pub struct MasterlistEntry {
  pub id:           PersonRef,
  pub first_name:   String,
  pub last_name:    String,
  pub email:        Option<String>,
  pub phone:        Option<String>,
  pub alt_phone:    Option<String>,
  pub role:         Option<String>,
  pub avatar:       Option<String>,
  pub active:       bool,
  pub gender:       Option<String>,
  pub ministries:   Vec<String>,
  pub ministry_ids: Vec<i64>,
}

/// `GET /users/:id/details` payload.
#[derive(Debug, Clone, Serialize)]
pub struct PersonDetails {
  pub user:       Person,
  pub ministries: Vec<String>,
  /// Full names of elders overseeing any of this member's ministries.
  /// Always empty for elders.
  pub elders:     Vec<String>,
}

/// A user joined with one of their ministries (one row per link).
#[derive(Debug, Clone, Serialize)]
pub struct UserMinistryRow {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
  pub ministry:   Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_prefixed_refs() {
    assert_eq!("user-12".parse::<PersonRef>().unwrap(), PersonRef::user(12));
    assert_eq!("member-7".parse::<PersonRef>().unwrap(), PersonRef::user(7));
    assert_eq!("elder-3".parse::<PersonRef>().unwrap(), PersonRef::elder(3));
    assert_eq!("42".parse::<PersonRef>().unwrap(), PersonRef::user(42));
  }

  #[test]
  fn rejects_refs_without_digits() {
    assert!("NaN".parse::<PersonRef>().is_err());
    assert!("user-".parse::<PersonRef>().is_err());
    assert!("user-12x".parse::<PersonRef>().is_err());
  }

  #[test]
  fn ref_serializes_as_string() {
    let json = serde_json::to_string(&PersonRef::elder(5)).unwrap();
    assert_eq!(json, "\"elder-5\"");
    let back: PersonRef = serde_json::from_str("17").unwrap();
    assert_eq!(back, PersonRef::user(17));
  }

  #[test]
  fn role_parse_maps_member_to_user() {
    assert_eq!(Role::parse("Member").unwrap().stored(), "user");
    assert_eq!(Role::parse("ELDER").unwrap().kind(), PersonKind::Elder);
    assert!(Role::parse("pastor").is_err());
  }

  #[test]
  fn update_target_kind() {
    let mut update = PersonUpdate::default();
    assert_eq!(update.target_kind(PersonKind::Elder), PersonKind::Elder);
    update.role = Some("Elder".into());
    assert_eq!(update.target_kind(PersonKind::User), PersonKind::Elder);
    update.role = Some("member".into());
    assert_eq!(update.target_kind(PersonKind::Elder), PersonKind::User);
    assert_eq!(update.stored_role().as_deref(), Some("user"));
  }

  #[test]
  fn digits_and_email_normalisation() {
    assert_eq!(digits_only("(555) 123-4567"), "5551234567");
    assert_eq!(normalize_email("  Jane@Example.COM "), Some("jane@example.com".into()));
    assert_eq!(normalize_email("   "), None);
  }
}
