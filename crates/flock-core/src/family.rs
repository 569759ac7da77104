//! Families group people under a shared household name.

use serde::{Deserialize, Serialize};

use crate::person::PersonRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
  pub id:          i64,
  pub family_name: String,
}

/// A member surfaced by the family search endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyMember {
  pub id:          PersonRef,
  pub first_name:  String,
  pub last_name:   String,
  pub phone:       Option<String>,
  pub role:        Option<String>,
  pub avatar:      Option<String>,
  pub family_id:   Option<i64>,
  pub family_name: Option<String>,
}

/// `GET /familySearch` modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilySearch {
  /// Everyone, members and elders, in one household.
  ById(i64),
  /// Case-insensitive substring over "first last".
  ByName(String),
}
