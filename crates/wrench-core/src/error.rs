//! Error taxonomy shared by storage backends and the API layer.

use thiserror::Error;

use crate::{derived::DerivedWrite, guard::Resource};

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range input. Never retried automatically.
  #[error("invalid {field}: {message}")]
  Validation {
    field:   &'static str,
    message: String,
  },

  #[error("{0} not found")]
  NotFound(Resource),

  /// Only produced under [`AccessPolicy::Distinguish`](crate::AccessPolicy).
  #[error("{0} belongs to another user")]
  Forbidden(Resource),

  #[error("{field} already in use: {message}")]
  Conflict {
    field:   &'static str,
    message: String,
  },

  /// A derived-state write failed after its primary write committed. Logged
  /// and retried by the backend; never returned for the operation the caller
  /// requested.
  #[error("derived state not updated: {0}")]
  DegradedConsistency(DerivedWrite),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),
}

impl Error {
  pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
    Self::Validation { field, message: message.into() }
  }

  pub fn conflict(field: &'static str, message: impl Into<String>) -> Self {
    Self::Conflict { field, message: message.into() }
  }

  /// The stable outcome code for this error.
  pub fn code(&self) -> ErrorCode {
    match self {
      Self::Validation { .. } => ErrorCode::ValidationError,
      Self::NotFound(_) => ErrorCode::NotFound,
      Self::Forbidden(_) => ErrorCode::Forbidden,
      Self::Conflict { .. } => ErrorCode::Conflict,
      Self::DegradedConsistency(_) => ErrorCode::DegradedConsistency,
      Self::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
    }
  }

  /// The offending input field, for validation and conflict errors.
  pub fn field(&self) -> Option<&'static str> {
    match self {
      Self::Validation { field, .. } | Self::Conflict { field, .. } => Some(field),
      _ => None,
    }
  }
}

/// Stable, machine-readable outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
  ValidationError,
  NotFound,
  Forbidden,
  Conflict,
  DegradedConsistency,
  StorageUnavailable,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
