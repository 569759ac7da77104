//! Error types for `flock-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid person reference: {0:?}")]
  InvalidPersonRef(String),

  #[error("Role must be one of: member, elder, volunteer, or staff.")]
  InvalidRole(String),

  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("invalid time: {0:?}")]
  InvalidTime(String),

  #[error("{0} is required")]
  MissingField(&'static str),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
