//! Ministries and the link tables that attach people to them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ministry {
  pub id:     i64,
  pub name:   String,
  pub active: bool,
}

/// Body of `POST /ministries` and `PUT /ministries/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct MinistryInput {
  #[serde(default)]
  pub name:   String,
  #[serde(default = "default_active", alias = "is_active")]
  pub active: bool,
}

impl MinistryInput {
  pub fn trimmed_name(&self) -> Option<&str> {
    let name = self.name.trim();
    (!name.is_empty()).then_some(name)
  }
}

fn default_active() -> bool { true }

/// Outcome of detaching a person from a batch of ministry names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetachReport {
  /// Names that resolved to an existing ministry.
  pub found:     Vec<String>,
  /// Names with no matching ministry; nothing is created for these.
  pub not_found: Vec<String>,
  /// Link rows actually deleted.
  pub removed:   usize,
}

/// Trim, drop blanks and case-insensitive duplicates, keeping first spelling.
pub fn dedup_names<I, S>(names: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let mut seen = std::collections::HashSet::new();
  names
    .into_iter()
    .map(|n| n.as_ref().trim().to_owned())
    .filter(|n| !n.is_empty() && seen.insert(n.to_lowercase()))
    .collect()
}
