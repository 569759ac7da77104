//! Error type for `flock-store-sqlite`.

use flock_core::store::{ErrorKind, StoreError};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] flock_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  /// A referenced row (person, event) does not exist.
  #[error("{0}")]
  Invalid(String),
}

impl Error {
  fn is_constraint(&self) -> bool {
    matches!(
      self,
      Self::Database(tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)))
        if e.code == ErrorCode::ConstraintViolation
    )
  }
}

impl StoreError for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Invalid(_) | Self::Core(_) => ErrorKind::Invalid,
      e if e.is_constraint() => ErrorKind::Conflict,
      Self::Database(_) => ErrorKind::Internal,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
