//! Staff accounts and registered kiosks.

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";
pub const ROLE_STAFF: &str = "staff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
  pub id:         i64,
  pub first_name: String,
  pub last_name:  String,
  pub email:      Option<String>,
  pub phone:      Option<String>,
  pub username:   String,
  pub role:       String,
}

impl Admin {
  pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }
}

/// An admin row together with its stored argon2 PHC string.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
  pub admin:         Admin,
  pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
  pub first_name:    String,
  pub last_name:     String,
  pub email:         Option<String>,
  pub phone:         Option<String>,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
}

/// Whether a staff role may perform administrative mutations.
pub fn can_manage(role: &str) -> bool {
  role.eq_ignore_ascii_case(ROLE_ADMIN) || role.eq_ignore_ascii_case(ROLE_SUPER_ADMIN)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kiosk {
  pub id:        i64,
  pub code:      String,
  pub is_active: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_admins_manage() {
    assert!(can_manage("admin"));
    assert!(can_manage("SUPER_ADMIN"));
    assert!(!can_manage("staff"));
    assert!(!can_manage("member"));
  }
}
