//! Server configuration, read from `config.toml` and `FLOCK_*` variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_database_path() -> PathBuf { PathBuf::from("flock.db") }
fn default_uploads_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_dedup_ttl_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                          String,
  #[serde(default = "default_port")]
  pub port:                          u16,
  #[serde(default = "default_database_path")]
  pub database_path:                 PathBuf,
  /// HS256 key for staff and kiosk tokens.
  pub jwt_secret:                    String,
  /// Shared secret for the Cognito webhooks; unset disables them.
  #[serde(default)]
  pub webhook_secret:                Option<String>,
  #[serde(default = "default_uploads_dir")]
  pub uploads_dir:                   PathBuf,
  #[serde(default = "default_dedup_ttl_secs")]
  pub dedup_ttl_secs:                u64,
  /// Seeded as a `super_admin` when no admin exists yet.
  #[serde(default)]
  pub bootstrap_admin_username:      Option<String>,
  /// Argon2 PHC string; see `--hash-password`.
  #[serde(default)]
  pub bootstrap_admin_password_hash: Option<String>,
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_fill_missing_fields() {
    let cfg: ServerConfig = ::config::Config::builder()
      .set_override("jwt_secret", "abc")
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.address(), "0.0.0.0:5000");
    assert_eq!(cfg.dedup_ttl_secs, 300);
    assert!(cfg.webhook_secret.is_none());
    assert_eq!(cfg.database_path, PathBuf::from("flock.db"));
  }

  #[test]
  fn tilde_expands_only_as_prefix() {
    assert_eq!(expand_tilde(Path::new("data/flock.db")), PathBuf::from("data/flock.db"));
  }
}
