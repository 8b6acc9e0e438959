//! Error type for `wrench-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain outcome (validation, not found, conflict, ...).
  #[error(transparent)]
  Core(#[from] wrench_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for wrench_core::Error {
  /// Domain outcomes pass through; every database or decoding failure is
  /// reported as storage unavailability.
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      other => wrench_core::Error::StorageUnavailable(other.to_string()),
    }
  }
}
