//! Normalisation of rows from the CSV roster import.

use serde::Deserialize;

use crate::{
  Error, Result,
  person::{NewPerson, normalize_email},
};

/// One CSV row as read from the upload. Unknown columns are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRow {
  pub first_name:  Option<String>,
  pub last_name:   Option<String>,
  pub email:       Option<String>,
  pub phone:       Option<String>,
  pub role:        Option<String>,
  pub family_name: Option<String>,
  pub gender:      Option<String>,
  pub status:      Option<String>,
}

/// A validated import row: the person to upsert plus the family to attach.
#[derive(Debug, Clone)]
pub struct ImportRecord {
  pub person:      NewPerson,
  pub family_name: Option<String>,
}

impl ImportRow {
  pub fn has_names(&self) -> bool {
    present(&self.first_name).is_some() && present(&self.last_name).is_some()
  }

  pub fn display_name(&self) -> String {
    format!(
      "{} {}",
      self.first_name.as_deref().unwrap_or_default(),
      self.last_name.as_deref().unwrap_or_default()
    )
  }

  pub fn normalize(self) -> Result<ImportRecord> {
    let first_name = present(&self.first_name).ok_or(Error::MissingField("first_name"))?;
    let last_name = present(&self.last_name).ok_or(Error::MissingField("last_name"))?;
    let role = present(&self.role).map(|r| {
      let r = r.to_lowercase();
      if r == "member" { "user".to_owned() } else { r }
    });

    Ok(ImportRecord {
      person:      NewPerson {
        first_name,
        last_name,
        email: self.email.as_deref().and_then(normalize_email),
        phone: present(&self.phone),
        alt_phone: None,
        role,
        gender: self.gender.as_deref().and_then(normalize_gender),
        avatar: None,
        family_id: None,
        active: normalize_status(self.status.as_deref()),
      },
      family_name: present(&self.family_name),
    })
  }
}

fn present(v: &Option<String>) -> Option<String> {
  v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned)
}

/// Map free-form gender text onto the stored vocabulary.
pub fn normalize_gender(s: &str) -> Option<String> {
  let g = match s.trim().to_lowercase().as_str() {
    "male" | "m" => "male",
    "female" | "f" => "female",
    "other" | "o" => "other",
    "prefer not to say" | "prefer_not_to_say" | "prefer-not-to-say" | "n/a" => "prefer_not_to_say",
    _ => return None,
  };
  Some(g.to_owned())
}

/// Blank means active; `inactive`, `false`, `0` and `no` mean inactive.
pub fn normalize_status(s: Option<&str>) -> bool {
  match s.map(|v| v.trim().to_lowercase()) {
    None => true,
    Some(v) if v.is_empty() => true,
    Some(v) => !matches!(v.as_str(), "inactive" | "false" | "0" | "no"),
  }
}

#[cfg(test)]
mod tests {
  use crate::person::PersonKind;

  use super::*;

  #[test]
  fn gender_variants() {
    assert_eq!(normalize_gender("M").as_deref(), Some("male"));
    assert_eq!(normalize_gender(" female ").as_deref(), Some("female"));
    assert_eq!(normalize_gender("Prefer Not To Say").as_deref(), Some("prefer_not_to_say"));
    assert_eq!(normalize_gender("n/a").as_deref(), Some("prefer_not_to_say"));
    assert_eq!(normalize_gender("unknown"), None);
  }

  #[test]
  fn status_defaults_active() {
    assert!(normalize_status(None));
    assert!(normalize_status(Some("")));
    assert!(normalize_status(Some("Active")));
    assert!(!normalize_status(Some("INACTIVE")));
    assert!(!normalize_status(Some("0")));
    assert!(!normalize_status(Some("no")));
  }

  #[test]
  fn normalize_row() {
    let row = ImportRow {
      first_name: Some(" Ada ".into()),
      last_name: Some("Lovelace".into()),
      email: Some("ADA@Example.org".into()),
      phone: Some("   ".into()),
      role: Some("Elder".into()),
      family_name: Some("Lovelace".into()),
      ..Default::default()
    };
    let record = row.normalize().unwrap();
    assert_eq!(record.person.first_name, "Ada");
    assert_eq!(record.person.email.as_deref(), Some("ada@example.org"));
    assert_eq!(record.person.phone, None);
    assert_eq!(record.person.kind(), PersonKind::Elder);
    assert!(record.person.active);
    assert_eq!(record.family_name.as_deref(), Some("Lovelace"));
  }

  #[test]
  fn rows_without_names_are_rejected() {
    let row = ImportRow { first_name: Some("Only".into()), ..Default::default() };
    assert!(!row.has_names());
    assert!(matches!(row.normalize(), Err(Error::MissingField("last_name"))));
  }
}
